//! Source A: page number + page size indexer
//!
//! ```text
//! GET {base}/v1/address/{address}/inscriptions?page=1&page_size=60
//! { "total": 150, "page": 1,
//!   "results": [ { "id": "...i0", "number": 42, "address": "bc1p...",
//!                  "content_type": "image/png", "content_length": 512,
//!                  "timestamp": "2023-02-01T12:00:00Z", "genesis_tx_id": "..." } ] }
//! ```
//!
//! Paging stops on a short page or once the declared total is covered.
//! A failed request aborts the run: if page 1 fails the indexer is down.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::normalize::{self, non_empty};
use super::{FailurePolicy, InscriptionSource, PagingPolicy, SourceEndpoint, SourceError, SourcePage};
use crate::types::CanonicalRecord;

/// Configuration for a page-number indexer
#[derive(Debug, Clone)]
pub struct PagedSourceConfig {
    pub name: String,
    pub endpoint: SourceEndpoint,
    pub policy: PagingPolicy,
    pub page_param: String,
    pub size_param: String,
    /// Page number of the first page (1 for most APIs)
    pub first_page: u32,
}

impl PagedSourceConfig {
    pub fn new(endpoint: SourceEndpoint) -> Self {
        Self {
            name: "source-a".to_string(),
            endpoint,
            policy: PagingPolicy {
                page_size: 60,
                max_pages: 100,
                stop_on_short_page: true,
                on_failure: FailurePolicy::Abort,
                ..PagingPolicy::default()
            },
            page_param: "page".to_string(),
            size_param: "page_size".to_string(),
            first_page: 1,
        }
    }
}

#[derive(Deserialize)]
struct PagedResponse {
    #[serde(default)]
    total: Option<Value>,
    #[serde(default)]
    results: Vec<PagedItem>,
}

#[derive(Deserialize)]
struct PagedItem {
    id: Option<String>,
    number: Option<Value>,
    address: Option<String>,
    content_type: Option<String>,
    content_length: Option<Value>,
    timestamp: Option<Value>,
    genesis_tx_id: Option<String>,
}

pub struct PagedSource {
    config: PagedSourceConfig,
    client: reqwest::Client,
    content_host: String,
}

impl PagedSource {
    pub fn new(config: PagedSourceConfig, client: reqwest::Client, content_host: &str) -> Self {
        Self {
            config,
            client,
            content_host: content_host.to_string(),
        }
    }

    fn parse_page(&self, body: &[u8]) -> Result<SourcePage, SourceError> {
        let response: PagedResponse = serde_json::from_slice(body)?;
        let raw_len = response.results.len();
        let records = response
            .results
            .into_iter()
            .filter_map(|item| map_item(item, &self.content_host))
            .collect();

        Ok(SourcePage {
            records,
            raw_len,
            declared_total: response.total.as_ref().and_then(normalize::unsigned),
        })
    }
}

fn map_item(item: PagedItem, content_host: &str) -> Option<CanonicalRecord> {
    let id = non_empty(item.id.as_deref())?;
    let mut record = CanonicalRecord::new(id, content_host);

    record.sequence_number = item.number.as_ref().and_then(normalize::integer);
    record.owner_address = item.address.unwrap_or_default();
    record.media_type = item.content_type.unwrap_or_default();
    record.byte_length = item.content_length.as_ref().and_then(normalize::unsigned);
    record.created_at_millis = normalize::created_at(item.timestamp.as_ref(), id);
    record.origin_transaction_id = item
        .genesis_tx_id
        .or_else(|| normalize::txid_from_inscription_id(id).map(str::to_string))
        .unwrap_or_default();

    Some(record)
}

#[async_trait]
impl InscriptionSource for PagedSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn policy(&self) -> &PagingPolicy {
        &self.config.policy
    }

    async fn fetch_page(&self, address: &str, page: u32) -> Result<SourcePage, SourceError> {
        let query = [
            (
                self.config.page_param.as_str(),
                (self.config.first_page + page).to_string(),
            ),
            (
                self.config.size_param.as_str(),
                self.config.policy.page_size.to_string(),
            ),
        ];
        let body = self
            .config
            .endpoint
            .get(&self.client, address, &query)
            .await?;
        self.parse_page(&body)
    }
}
