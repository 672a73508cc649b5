use std::io::Write;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::loader::{ensure_index, BatchLoader, LoadReport, RetryPolicy, Wait};
use crate::store::{Document, IndexSettings, Store};
use crate::text;

pub const LARGE_DATASET: &str = "large_dataset";
pub const SMALL_DATASET: &str = "small_dataset";
pub const LARGE_DATASET_SIZE: u64 = 100_000;
pub const SMALL_DATASET_SIZE: u64 = 100;

pub const LARGE_TEXT_DATASET: &str = "large_text_dataset";
pub const SMALL_TEXT_DATASET: &str = "small_text_dataset";
pub const HIGH_DUPLICATION_DATASET: &str = "high_duplication_dataset";
pub const LOW_DUPLICATION_DATASET: &str = "low_duplication_dataset";

/// Something to do against the cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Tops `large_dataset` up to 100 000 records in batches, then writes 100 records to
    /// `small_dataset` in one request.
    CreateCompareDataset,
    /// Tops an arbitrary index up to `count` records.
    Load(LoadArgs),
    /// Creates an index with one shard, one replica and a `content` text mapping.
    CreateIndex { index: String },
    /// One long and one short document, each in its own index.
    GenerateCompareTextDataset,
    /// One repetitive and one varied document, each in its own index.
    GenerateDoubleTextDataset,
    /// Deletes `large_dataset` and `small_dataset`.
    Deletes,
    /// Prints the counts of `large_dataset` and `small_dataset`.
    Counts,
    /// Prints match-all results for `large_dataset` and `small_dataset`.
    Search,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadArgs {
    pub index: String,
    pub count: u64,
    pub batch_size: usize,
    pub retry: RetryPolicy,
    /// Create a missing index with [`IndexSettings::default`] rather than cluster defaults.
    pub explicit_settings: bool,
}

impl Command {
    /// Runs the command, writing anything meant for the user to `out`. Waits between batch
    /// attempts go through `wait`.
    pub fn run<S: Store, W: Wait>(
        &self,
        store: &mut S,
        wait: W,
        out: &mut impl Write,
    ) -> Result<()> {
        info!(command = ?self, "Running");
        match self {
            Self::CreateCompareDataset => create_compare_dataset(store, wait),
            Self::Load(args) => load(store, wait, args, out),
            Self::CreateIndex { index } => create_index(store, index, out),
            Self::GenerateCompareTextDataset => generate_compare_text_dataset(store),
            Self::GenerateDoubleTextDataset => generate_double_text_dataset(store),
            Self::Deletes => deletes(store),
            Self::Counts => counts(store, out),
            Self::Search => search(store, out),
        }
    }
}

fn create_compare_dataset<W: Wait>(store: &mut impl Store, wait: W) -> Result<()> {
    let report = BatchLoader::with_wait(wait)
        .load(store, LARGE_DATASET, LARGE_DATASET_SIZE)
        .with_context(|| format!("Loading {LARGE_DATASET}"))?;
    warn_abandoned(LARGE_DATASET, &report);
    generate_dataset(store, SMALL_DATASET, SMALL_DATASET_SIZE)
}

/// Writes `count` numbered records in a single bulk request, whatever the index already holds.
fn generate_dataset(store: &mut impl Store, index: &str, count: u64) -> Result<()> {
    ensure_index(store, index, None)?;
    let mut rng = rand::thread_rng();
    let docs = (0..count)
        .map(|i| text::numbered_record(&mut rng, i))
        .collect::<Vec<_>>();
    let outcome = store.bulk(index, &docs)?;
    if !outcome.is_success() {
        bail!(
            "{} document(s) failed to index into {index}: {:?}",
            outcome.failures.len(),
            outcome.failures
        );
    }
    info!(index, count, "Indexed documents");
    Ok(())
}

fn load<W: Wait>(
    store: &mut impl Store,
    wait: W,
    args: &LoadArgs,
    out: &mut impl Write,
) -> Result<()> {
    let mut loader = BatchLoader::with_wait(wait)
        .batch_size(args.batch_size)
        .retry_policy(args.retry);
    if args.explicit_settings {
        loader = loader.create_with(IndexSettings::default());
    }
    let report = loader
        .load(store, &args.index, args.count)
        .with_context(|| format!("Loading {}", args.index))?;
    warn_abandoned(&args.index, &report);

    match &report {
        LoadReport::AlreadySatisfied { current } => writeln!(
            out,
            "The index '{}' already contains {} or more documents ({current}).",
            args.index, args.count
        )?,
        LoadReport::Loaded { batches } => {
            let abandoned = report.abandoned().count();
            writeln!(
                out,
                "Loaded '{}' in {} batch(es), {} abandoned.",
                args.index,
                batches.len(),
                abandoned
            )?;
            for batch in report.abandoned() {
                writeln!(
                    out,
                    "Failed to index batch from {} to {} after {} attempts",
                    batch.start, batch.end, batch.attempts
                )?;
            }
        }
    }
    Ok(())
}

fn warn_abandoned(index: &str, report: &LoadReport) {
    let abandoned = report.abandoned().count();
    if abandoned > 0 {
        warn!(index, abandoned, "Some batches were not indexed");
    }
}

fn create_index(store: &mut impl Store, index: &str, out: &mut impl Write) -> Result<()> {
    if ensure_index(store, index, Some(&IndexSettings::default()))? {
        writeln!(out, "Index '{index}' created.")?;
    } else {
        writeln!(out, "Index '{index}' already exists.")?;
    }
    Ok(())
}

fn generate_compare_text_dataset(store: &mut impl Store) -> Result<()> {
    store.index_document(LARGE_TEXT_DATASET, &Document::new(text::large_text()))?;
    store.index_document(SMALL_TEXT_DATASET, &Document::new(text::small_text()))?;
    Ok(())
}

fn generate_double_text_dataset(store: &mut impl Store) -> Result<()> {
    store.index_document(
        HIGH_DUPLICATION_DATASET,
        &Document::new(text::high_duplication_text()),
    )?;
    store.index_document(
        LOW_DUPLICATION_DATASET,
        &Document::new(text::low_duplication_text()),
    )?;
    Ok(())
}

fn deletes(store: &mut impl Store) -> Result<()> {
    for index in [LARGE_DATASET, SMALL_DATASET] {
        store
            .delete(index)
            .with_context(|| format!("Deleting {index}"))?;
    }
    Ok(())
}

fn counts(store: &mut impl Store, out: &mut impl Write) -> Result<()> {
    for index in [LARGE_DATASET, SMALL_DATASET] {
        let count = store
            .count(index)
            .with_context(|| format!("Counting {index}"))?;
        writeln!(out, "{count}")?;
    }
    Ok(())
}

fn search(store: &mut impl Store, out: &mut impl Write) -> Result<()> {
    let large = store.search_all(LARGE_DATASET)?;
    let small = store.search_all(SMALL_DATASET)?;
    writeln!(out, "{LARGE_DATASET} Got {} hits", large.total)?;
    writeln!(out, "{SMALL_DATASET} Got {} hits", small.total)?;
    for hit in small.hits.iter().chain(&large.hits) {
        writeln!(out, "ID: {}, Content: {}", hit.id, hit.content)?;
    }
    Ok(())
}
