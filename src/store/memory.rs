use std::collections::{BTreeMap, VecDeque};

use super::{BulkFailure, BulkOutcome, Document, Hit, IndexSettings, SearchHits, Store};
use crate::{Result, StoreError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    Exists(String),
    Create(String, Option<IndexSettings>),
    Count(String),
    Bulk(String, Vec<Document>),
    IndexDocument(String, Document),
    SetWriteBlock(String, bool),
    Delete(String),
    SearchAll(String),
}

/// What the next bulk request does.
#[derive(Clone, Debug)]
pub(crate) enum BulkScript {
    /// Refuse the first documents of the batch with these statuses. Nothing is written.
    Refuse(Vec<u16>),
    /// Fail the whole request, as if the connection dropped.
    Break,
}

#[derive(Default)]
pub(crate) struct Index {
    pub(crate) docs: Vec<(String, Document)>,
    pub(crate) settings: Option<IndexSettings>,
    pub(crate) write_blocked: bool,
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    pub(crate) indices: BTreeMap<String, Index>,
    pub(crate) calls: Vec<Call>,
    bulk_script: VecDeque<BulkScript>,
    next_id: u64,
}

impl MemoryStore {
    /// A store with `index` already holding `count` documents.
    pub(crate) fn with_docs(index: &str, count: usize) -> Self {
        let mut store = Self::default();
        let docs = (0..count)
            .map(|i| Document::new(format!("existing {i}")))
            .collect::<Vec<_>>();
        store.insert(index, &docs);
        store
    }

    /// Queues behaviour for upcoming bulk requests. Once the queue is empty bulk requests succeed.
    pub(crate) fn script_bulk(&mut self, script: impl IntoIterator<Item = BulkScript>) {
        self.bulk_script.extend(script);
    }

    pub(crate) fn docs(&self, index: &str) -> &[(String, Document)] {
        self.indices.get(index).map_or(&[][..], |i| i.docs.as_slice())
    }

    pub(crate) fn bulk_calls(&self) -> Vec<&[Document]> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Bulk(_, docs) => Some(docs.as_slice()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn writes(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Bulk(..) | Call::IndexDocument(..)))
            .count()
    }

    fn insert(&mut self, index: &str, docs: &[Document]) {
        let entry = self.indices.entry(index.to_owned()).or_default();
        for doc in docs {
            self.next_id += 1;
            entry.docs.push((format!("id-{}", self.next_id), doc.clone()));
        }
    }

    fn missing(index: &str) -> StoreError {
        StoreError::Status {
            status: 404,
            body: format!("no such index [{index}]"),
        }
    }
}

impl Store for MemoryStore {
    fn exists(&mut self, index: &str) -> Result<bool> {
        self.calls.push(Call::Exists(index.to_owned()));
        Ok(self.indices.contains_key(index))
    }

    fn create(&mut self, index: &str, settings: Option<&IndexSettings>) -> Result<()> {
        self.calls
            .push(Call::Create(index.to_owned(), settings.copied()));
        if self.indices.contains_key(index) {
            return Err(StoreError::Status {
                status: 400,
                body: format!("index [{index}] already exists"),
            });
        }
        self.indices.insert(
            index.to_owned(),
            Index {
                settings: settings.copied(),
                ..Index::default()
            },
        );
        Ok(())
    }

    fn count(&mut self, index: &str) -> Result<u64> {
        self.calls.push(Call::Count(index.to_owned()));
        self.indices
            .get(index)
            .map(|i| i.docs.len() as u64)
            .ok_or_else(|| Self::missing(index))
    }

    fn bulk(&mut self, index: &str, docs: &[Document]) -> Result<BulkOutcome> {
        self.calls.push(Call::Bulk(index.to_owned(), docs.to_vec()));
        match self.bulk_script.pop_front() {
            Some(BulkScript::Break) => Err(StoreError::Status {
                status: 503,
                body: "connection lost".into(),
            }),
            Some(BulkScript::Refuse(statuses)) => Ok(BulkOutcome {
                failures: statuses
                    .into_iter()
                    .enumerate()
                    .map(|(position, status)| BulkFailure {
                        position,
                        status,
                        kind: None,
                        reason: Some("refused by test".into()),
                    })
                    .collect(),
            }),
            None => {
                self.insert(index, docs);
                Ok(BulkOutcome::default())
            }
        }
    }

    fn index_document(&mut self, index: &str, doc: &Document) -> Result<String> {
        self.calls
            .push(Call::IndexDocument(index.to_owned(), doc.clone()));
        self.insert(index, std::slice::from_ref(doc));
        Ok(format!("id-{}", self.next_id))
    }

    fn set_write_block(&mut self, index: &str, blocked: bool) -> Result<()> {
        self.calls.push(Call::SetWriteBlock(index.to_owned(), blocked));
        let entry = self
            .indices
            .get_mut(index)
            .ok_or_else(|| Self::missing(index))?;
        entry.write_blocked = blocked;
        Ok(())
    }

    fn delete(&mut self, index: &str) -> Result<()> {
        self.calls.push(Call::Delete(index.to_owned()));
        self.indices
            .remove(index)
            .map(|_| ())
            .ok_or_else(|| Self::missing(index))
    }

    fn search_all(&mut self, index: &str) -> Result<SearchHits> {
        self.calls.push(Call::SearchAll(index.to_owned()));
        let entry = self.indices.get(index).ok_or_else(|| Self::missing(index))?;
        Ok(SearchHits {
            total: entry.docs.len() as u64,
            // Clusters return the first page only.
            hits: entry
                .docs
                .iter()
                .take(10)
                .map(|(id, doc)| Hit {
                    id: id.clone(),
                    content: doc.content.clone(),
                })
                .collect(),
        })
    }
}
