use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{debug, info};

use esload::loader::DEFAULT_BATCH_SIZE;
use esload::{ElasticClient, LoadArgs, RetryPolicy, ThreadSleep};

#[derive(Parser)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Base URL of the search cluster.
    #[clap(
        long,
        env = "ESLOAD_URL",
        default_value = "http://localhost:9200",
        global = true
    )]
    url: String,

    /// Seconds to wait on any single request to the cluster.
    #[clap(long, env = "ESLOAD_TIMEOUT", default_value_t = 60, global = true)]
    timeout: u64,

    /// Log more. Repeat for even more. `RUST_LOG` overrides this.
    #[clap(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Top large_dataset up to 100000 documents, then add 100 to small_dataset.
    CreateCompareDataset,
    /// Top an index up to COUNT documents.
    Load {
        index: String,
        count: u64,

        #[clap(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Submissions of a batch before it's abandoned.
        #[clap(long, default_value_t = 3)]
        max_retries: u32,

        /// Seconds between submissions of a refused batch.
        #[clap(long, default_value_t = 2)]
        retry_delay: u64,

        /// Create a missing index with 1 shard, 1 replica and a text mapping.
        #[clap(long)]
        explicit_settings: bool,
    },
    /// Create an index with 1 shard, 1 replica and a text mapping.
    CreateIndex { index: String },
    /// Index one long and one short document.
    GenerateCompareTextDataset,
    /// Index one repetitive and one varied document.
    GenerateDoubleTextDataset,
    /// Delete large_dataset and small_dataset.
    Deletes,
    /// Print the counts of large_dataset and small_dataset.
    Counts,
    /// Print match-all results for large_dataset and small_dataset.
    Search,
}

impl From<Command> for esload::Command {
    fn from(command: Command) -> Self {
        match command {
            Command::CreateCompareDataset => Self::CreateCompareDataset,
            Command::Load {
                index,
                count,
                batch_size,
                max_retries,
                retry_delay,
                explicit_settings,
            } => Self::Load(LoadArgs {
                index,
                count,
                batch_size,
                retry: RetryPolicy {
                    max_retries,
                    delay: Duration::from_secs(retry_delay),
                },
                explicit_settings,
            }),
            Command::CreateIndex { index } => Self::CreateIndex { index },
            Command::GenerateCompareTextDataset => Self::GenerateCompareTextDataset,
            Command::GenerateDoubleTextDataset => Self::GenerateDoubleTextDataset,
            Command::Deletes => Self::Deletes,
            Command::Counts => Self::Counts,
            Command::Search => Self::Search,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::configure(logging::level_for(args.verbose));

    info!(
        url = %args.url,
        timeout = args.timeout,
        version = env!("CARGO_PKG_VERSION"),
        "Starting"
    );
    let mut client = ElasticClient::new(&args.url, Duration::from_secs(args.timeout))
        .context("Failed to build HTTP client")?;

    let command = esload::Command::from(args.command);
    command.run(&mut client, ThreadSleep, &mut std::io::stdout().lock())?;

    debug!("Done");
    Ok(())
}
