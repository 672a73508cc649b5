use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, trace};

use super::{BulkFailure, BulkOutcome, Document, Hit, IndexSettings, SearchHits, Store};
use crate::{Result, StoreError};

/// A blocking HTTP client for one cluster. Construct it once and pass it to whatever needs it.
pub struct ElasticClient {
    /// Base URL of the cluster without a trailing slash, e.g. `http://localhost:9200`.
    base_url: String,
    http: Client,
}

impl ElasticClient {
    /// Creates a client for the cluster at `base_url`. `timeout` bounds both connecting and
    /// each whole request. No request is made until the first [`Store`] call.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .no_proxy()
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Sends the request and turns any non-2xx answer into [`StoreError::Status`].
    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send()?;
        let status = response.status();
        trace!(%status, url = %response.url(), "Cluster responded");
        if status.is_success() {
            Ok(response)
        } else {
            // The body is only there to make the error readable.
            let body = response.text().unwrap_or_else(|e| {
                debug!(?e, %status, "Failed to read error body");
                String::new()
            });
            Err(StoreError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let text = self.send(request)?.text()?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl Store for ElasticClient {
    fn exists(&mut self, index: &str) -> Result<bool> {
        debug!(index, "Checking index exists");
        let response = self.http.head(self.url(index)).send()?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(StoreError::Status {
                status: status.as_u16(),
                body: String::new(),
            }),
        }
    }

    fn create(&mut self, index: &str, settings: Option<&IndexSettings>) -> Result<()> {
        debug!(index, ?settings, "Creating index");
        let mut request = self.http.put(self.url(index));
        if let Some(settings) = settings {
            request = request.json(&settings.to_body());
        }
        self.send(request)?;
        Ok(())
    }

    fn count(&mut self, index: &str) -> Result<u64> {
        let request = self.http.get(self.url(&format!("{index}/_count")));
        let response: CountResponse = self.send_json(request)?;
        trace!(index, count = response.count, "Counted");
        Ok(response.count)
    }

    fn bulk(&mut self, index: &str, docs: &[Document]) -> Result<BulkOutcome> {
        if docs.is_empty() {
            return Ok(BulkOutcome::default());
        }
        debug!(index, docs = docs.len(), "Sending bulk request");
        let request = self
            .http
            .post(self.url(&format!("{index}/_bulk")))
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(bulk_body(docs)?);
        let response: BulkResponse = self.send_json(request)?;
        Ok(BulkOutcome {
            failures: response.failures(),
        })
    }

    fn index_document(&mut self, index: &str, doc: &Document) -> Result<String> {
        let request = self.http.post(self.url(&format!("{index}/_doc"))).json(doc);
        let response: IndexResponse = self.send_json(request)?;
        debug!(index, id = %response.id, "Indexed document");
        Ok(response.id)
    }

    fn set_write_block(&mut self, index: &str, blocked: bool) -> Result<()> {
        debug!(index, blocked, "Updating write block");
        let request = self
            .http
            .put(self.url(&format!("{index}/_settings")))
            .json(&json!({ "index.blocks.read_only_allow_delete": blocked }));
        self.send(request)?;
        Ok(())
    }

    fn delete(&mut self, index: &str) -> Result<()> {
        debug!(index, "Deleting index");
        self.send(self.http.delete(self.url(index)))?;
        Ok(())
    }

    fn search_all(&mut self, index: &str) -> Result<SearchHits> {
        let request = self
            .http
            .post(self.url(&format!("{index}/_search")))
            .json(&json!({ "query": { "match_all": {} } }));
        let response: SearchResponse = self.send_json(request)?;
        Ok(response.into_hits())
    }
}

/// NDJSON body of a bulk request: an `index` action line before every document.
fn bulk_body(docs: &[Document]) -> Result<String> {
    let mut body = String::new();
    for doc in docs {
        body.push_str("{\"index\":{}}\n");
        body.push_str(&serde_json::to_string(doc)?);
        body.push('\n');
    }
    Ok(body)
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Deserialize)]
struct IndexResponse {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Deserialize)]
struct BulkResponse {
    errors: bool,
    #[serde(default)]
    items: Vec<BTreeMap<String, BulkItem>>,
}

/// Each item is keyed by its action (`index` here), which we don't care about.
#[derive(Deserialize)]
struct BulkItem {
    status: u16,
    error: Option<ItemError>,
}

#[derive(Deserialize)]
struct ItemError {
    #[serde(rename = "type")]
    kind: Option<String>,
    reason: Option<String>,
}

impl BulkResponse {
    fn failures(self) -> Vec<BulkFailure> {
        if !self.errors {
            return Vec::new();
        }
        self.items
            .into_iter()
            .enumerate()
            .filter_map(|(position, item)| {
                let item = item.into_values().next()?;
                if (200..300).contains(&item.status) {
                    return None;
                }
                let (kind, reason) = item
                    .error
                    .map(|e| (e.kind, e.reason))
                    .unwrap_or_default();
                Some(BulkFailure {
                    position,
                    status: item.status,
                    kind,
                    reason,
                })
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Deserialize)]
struct HitsEnvelope {
    total: Total,
    #[serde(default)]
    hits: Vec<RawHit>,
}

/// Older clusters report the total as a bare number.
#[derive(Deserialize)]
#[serde(untagged)]
enum Total {
    Object { value: u64 },
    Plain(u64),
}

#[derive(Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: Option<RawSource>,
}

#[derive(Deserialize)]
struct RawSource {
    content: Option<String>,
}

impl SearchResponse {
    fn into_hits(self) -> SearchHits {
        let total = match self.hits.total {
            Total::Object { value } | Total::Plain(value) => value,
        };
        let hits = self
            .hits
            .hits
            .into_iter()
            .map(|hit| Hit {
                id: hit.id,
                content: hit.source.and_then(|s| s.content).unwrap_or_default(),
            })
            .collect();
        SearchHits { total, hits }
    }
}
