//! Seeds and inspects a search cluster with synthetic datasets for benchmarking.
//!
//! The interesting part is [`BatchLoader`], which tops an index up to a requested number of
//! records in fixed-size bulk batches and retries refused batches a bounded number of times.
//! Everything goes through the [`Store`] trait; [`ElasticClient`] implements it over HTTP.

pub mod command;
mod error;
pub mod loader;
pub mod store;
pub mod text;

pub use command::{Command, LoadArgs};
pub use error::{LoadError, Result, StoreError};
pub use loader::{
    BatchLoader, BatchReport, BatchStatus, LoadReport, RetryPolicy, ThreadSleep, Wait,
};
pub use store::{Document, ElasticClient, IndexSettings, Store};
