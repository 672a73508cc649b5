use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::Result;

mod elastic;
#[cfg(test)]
pub(crate) mod memory;

pub use elastic::ElasticClient;

/// Status a cluster reports for a document it refused because a resource watermark (usually
/// disk) was exceeded. The index stays write-blocked until the block is cleared.
pub const OVERLOAD_STATUS: u16 = 429;

/// A search cluster that indices can be created in, bulk loaded, counted, and searched.
pub trait Store {
    fn exists(&mut self, index: &str) -> Result<bool>;
    /// Creates `index`. `None` leaves shard/replica counts and mappings to the cluster.
    fn create(&mut self, index: &str, settings: Option<&IndexSettings>) -> Result<()>;
    fn count(&mut self, index: &str) -> Result<u64>;
    /// Writes every document in one request. Documents the cluster refused are listed in the
    /// returned [`BulkOutcome`]; only failures of the request as a whole are `Err`.
    fn bulk(&mut self, index: &str, docs: &[Document]) -> Result<BulkOutcome>;
    /// Writes a single document and returns the id the cluster assigned to it.
    fn index_document(&mut self, index: &str, doc: &Document) -> Result<String>;
    fn set_write_block(&mut self, index: &str, blocked: bool) -> Result<()>;
    fn delete(&mut self, index: &str) -> Result<()>;
    fn search_all(&mut self, index: &str) -> Result<SearchHits>;
}

/// A record. The only field is free text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Settings for the explicit-create path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexSettings {
    pub shards: u32,
    pub replicas: u32,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            shards: 1,
            replicas: 1,
        }
    }
}

impl IndexSettings {
    /// Request body for index creation, including the `content: text` mapping.
    pub fn to_body(&self) -> Value {
        json!({
            "settings": {
                "number_of_shards": self.shards,
                "number_of_replicas": self.replicas,
            },
            "mappings": {
                "properties": {
                    "content": { "type": "text" }
                }
            }
        })
    }
}

/// One document of a bulk write the cluster did not accept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkFailure {
    /// Position of the document within the submitted batch.
    pub position: usize,
    pub status: u16,
    pub kind: Option<String>,
    pub reason: Option<String>,
}

impl BulkFailure {
    pub fn is_overload(&self) -> bool {
        self.status == OVERLOAD_STATUS
    }
}

/// Per-document result of a bulk write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub failures: Vec<BulkFailure>,
}

impl BulkOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hit {
    pub id: String,
    pub content: String,
}

/// Result of a match-all search: the total number of matches and the first page of them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchHits {
    pub total: u64,
    pub hits: Vec<Hit>,
}
