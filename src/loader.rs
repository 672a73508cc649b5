//! Loading generated records into an index in fixed-size batches.
//!
//! A batch whose bulk write comes back with refused documents is resubmitted unchanged after a
//! fixed delay, up to a bounded number of attempts. A batch that runs out of attempts is
//! reported and skipped; the load carries on with the next one. Anything other than refused
//! documents (connection loss, the request as a whole being rejected) ends the load.

use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};

use crate::store::{Document, IndexSettings, Store};
use crate::{text, LoadError, StoreError};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// How long to block between attempts of a batch.
pub trait Wait {
    fn wait(&mut self, delay: Duration);
}

/// Blocks the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleep;

impl Wait for ThreadSleep {
    fn wait(&mut self, delay: Duration) {
        thread::sleep(delay);
    }
}

/// Fixed-delay retry. No backoff, no jitter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total submissions of a batch before it's abandoned. 0 behaves like 1.
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(2),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchStatus {
    Indexed,
    Abandoned,
}

/// What happened to the records `start..end`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchReport {
    pub start: u64,
    pub end: u64,
    pub attempts: u32,
    pub status: BatchStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadReport {
    /// The index already held at least the requested number of records. Nothing was written.
    AlreadySatisfied { current: u64 },
    Loaded { batches: Vec<BatchReport> },
}

impl LoadReport {
    pub fn batches(&self) -> &[BatchReport] {
        match self {
            Self::AlreadySatisfied { .. } => &[],
            Self::Loaded { batches } => batches,
        }
    }

    pub fn abandoned(&self) -> impl Iterator<Item = &BatchReport> {
        self.batches()
            .iter()
            .filter(|b| b.status == BatchStatus::Abandoned)
    }
}

/// Creates `index` unless it already exists. Returns whether it was created.
pub fn ensure_index(
    store: &mut impl Store,
    index: &str,
    settings: Option<&IndexSettings>,
) -> Result<bool, StoreError> {
    if store.exists(index)? {
        return Ok(false);
    }
    store.create(index, settings)?;
    info!(index, ?settings, "Created index");
    Ok(true)
}

/// Tops an index up to a requested number of generated records.
pub struct BatchLoader<W = ThreadSleep> {
    batch_size: usize,
    retry: RetryPolicy,
    create_with: Option<IndexSettings>,
    rng: StdRng,
    wait: W,
}

impl BatchLoader<ThreadSleep> {
    pub fn new() -> Self {
        Self::with_wait(ThreadSleep)
    }
}

impl Default for BatchLoader<ThreadSleep> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Wait> BatchLoader<W> {
    pub fn with_wait(wait: W) -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
            create_with: None,
            rng: StdRng::from_entropy(),
            wait,
        }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Create a missing index with these settings instead of the cluster's defaults.
    pub fn create_with(mut self, settings: IndexSettings) -> Self {
        self.create_with = Some(settings);
        self
    }

    /// Makes the random suffixes reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Adds records to `index` until it holds `target` of them. Records are numbered from the
    /// index's current count, so a second run only writes what the first one didn't.
    pub fn load(
        &mut self,
        store: &mut impl Store,
        index: &str,
        target: u64,
    ) -> Result<LoadReport, LoadError> {
        if self.batch_size == 0 {
            return Err(LoadError::InvalidBatchSize);
        }

        ensure_index(store, index, self.create_with.as_ref())?;
        let current = store.count(index)?;
        if target <= current {
            info!(index, current, target, "Index already contains enough documents");
            return Ok(LoadReport::AlreadySatisfied { current });
        }
        debug!(index, current, target, batch_size = self.batch_size, "Loading");

        let mut batches = Vec::new();
        let mut start = current;
        while start < target {
            let end = start.saturating_add(self.batch_size as u64).min(target);
            let docs = (start..end)
                .map(|i| text::numbered_record(&mut self.rng, i))
                .collect::<Vec<_>>();
            batches.push(self.load_batch(store, index, start, end, &docs)?);
            start = end;
        }

        Ok(LoadReport::Loaded { batches })
    }

    fn load_batch(
        &mut self,
        store: &mut impl Store,
        index: &str,
        start: u64,
        end: u64,
        docs: &[Document],
    ) -> Result<BatchReport, StoreError> {
        let max_attempts = self.retry.max_retries.max(1);
        let mut attempts = 0;
        loop {
            attempts += 1;
            let outcome = store.bulk(index, docs)?;
            if outcome.is_success() {
                info!(index, start, end, "Indexed documents");
                return Ok(BatchReport {
                    start,
                    end,
                    attempts,
                    status: BatchStatus::Indexed,
                });
            }

            warn!(
                index,
                failed = outcome.failures.len(),
                "Bulk indexing error: documents failed to index"
            );
            for failure in &outcome.failures {
                warn!(?failure, "Document failed to index");
            }
            if outcome.failures.iter().any(|f| f.is_overload()) {
                warn!(index, "Disk usage exceeded flood-stage watermark, clearing write block");
                store.set_write_block(index, false)?;
            }

            if attempts >= max_attempts {
                error!(index, start, end, attempts, "Failed to index batch, giving up on it");
                return Ok(BatchReport {
                    start,
                    end,
                    attempts,
                    status: BatchStatus::Abandoned,
                });
            }
            info!(
                index,
                start,
                end,
                attempt = attempts,
                max_attempts,
                "Retrying batch"
            );
            self.wait.wait(self.retry.delay);
        }
    }
}
