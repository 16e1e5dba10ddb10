//! Source B: cursor + size indexer
//!
//! ```text
//! GET {base}/v1/indexer/address/{address}/inscription-data?cursor=0&size=100
//! { "code": 0, "msg": "ok",
//!   "data": { "cursor": 0, "total": 140,
//!             "inscription": [ { "inscriptionId": "...i0", "inscriptionNumber": 7,
//!                                "address": "bc1p...", "contentType": "text/plain",
//!                                "contentLength": 12, "timestamp": 1675252800,
//!                                "genesisTransaction": "..." } ] } }
//! ```
//!
//! The cursor is an item offset, so it advances by `size` per call. This
//! indexer intermittently answers a single page with a 5xx, so failed pages
//! are skipped rather than ending the run.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::normalize::{self, non_empty};
use super::{FailurePolicy, InscriptionSource, PagingPolicy, SourceEndpoint, SourceError, SourcePage};
use crate::types::CanonicalRecord;

/// Configuration for a cursor-paged indexer
#[derive(Debug, Clone)]
pub struct CursorSourceConfig {
    pub name: String,
    pub endpoint: SourceEndpoint,
    pub policy: PagingPolicy,
    pub cursor_param: String,
    pub size_param: String,
}

impl CursorSourceConfig {
    pub fn new(endpoint: SourceEndpoint) -> Self {
        Self {
            name: "source-b".to_string(),
            endpoint,
            policy: PagingPolicy {
                page_size: 100,
                max_pages: 100,
                on_failure: FailurePolicy::SkipPage,
                ..PagingPolicy::default()
            },
            cursor_param: "cursor".to_string(),
            size_param: "size".to_string(),
        }
    }

    /// Item offset for a zero-based page index
    pub fn cursor_for(&self, page: u32) -> u64 {
        u64::from(page) * u64::from(self.policy.page_size)
    }
}

#[derive(Deserialize)]
struct CursorResponse {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<CursorData>,
}

#[derive(Deserialize)]
struct CursorData {
    #[serde(default)]
    total: Option<Value>,
    #[serde(default)]
    inscription: Vec<CursorItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CursorItem {
    inscription_id: Option<String>,
    inscription_number: Option<Value>,
    address: Option<String>,
    content_type: Option<String>,
    content_length: Option<Value>,
    timestamp: Option<Value>,
    genesis_transaction: Option<String>,
}

pub struct CursorSource {
    config: CursorSourceConfig,
    client: reqwest::Client,
    content_host: String,
}

impl CursorSource {
    pub fn new(config: CursorSourceConfig, client: reqwest::Client, content_host: &str) -> Self {
        Self {
            config,
            client,
            content_host: content_host.to_string(),
        }
    }

    fn parse_page(&self, body: &[u8]) -> Result<SourcePage, SourceError> {
        let response: CursorResponse = serde_json::from_slice(body)?;

        normalize::api_status(response.code.as_ref(), response.msg)?;

        let Some(data) = response.data else {
            return Ok(SourcePage::default());
        };

        let raw_len = data.inscription.len();
        let records = data
            .inscription
            .into_iter()
            .filter_map(|item| map_item(item, &self.content_host))
            .collect();

        Ok(SourcePage {
            records,
            raw_len,
            declared_total: data.total.as_ref().and_then(normalize::unsigned),
        })
    }
}

fn map_item(item: CursorItem, content_host: &str) -> Option<CanonicalRecord> {
    let id = non_empty(item.inscription_id.as_deref())?;
    let mut record = CanonicalRecord::new(id, content_host);

    record.sequence_number = item.inscription_number.as_ref().and_then(normalize::integer);
    record.owner_address = item.address.unwrap_or_default();
    record.media_type = item.content_type.unwrap_or_default();
    record.byte_length = item.content_length.as_ref().and_then(normalize::unsigned);
    record.created_at_millis = normalize::created_at(item.timestamp.as_ref(), id);
    record.origin_transaction_id = item
        .genesis_transaction
        .or_else(|| normalize::txid_from_inscription_id(id).map(str::to_string))
        .unwrap_or_default();

    Some(record)
}

#[async_trait]
impl InscriptionSource for CursorSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn policy(&self) -> &PagingPolicy {
        &self.config.policy
    }

    async fn fetch_page(&self, address: &str, page: u32) -> Result<SourcePage, SourceError> {
        let query = [
            (
                self.config.cursor_param.as_str(),
                self.config.cursor_for(page).to_string(),
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
