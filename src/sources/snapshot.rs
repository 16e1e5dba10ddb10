//! Source C: single-call indexer
//!
//! ```text
//! GET {base}/v2/ord/btc/tokens?ownerAddress={address}&limit=100
//! { "total": 12,
//!   "tokens": [ { "id": "...i0", "inscriptionNumber": 5, "owner": "bc1p...",
//!                 "contentType": "image/webp", "contentLength": 2048,
//!                 "genesisTransaction": "...",
//!                 "genesisTransactionBlockTime": "2023-02-01T12:00:00Z" } ] }
//! ```
//!
//! The API offers no further pagination, so the run is capped at one page.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::normalize::{self, non_empty};
use super::{FailurePolicy, InscriptionSource, PagingPolicy, SourceEndpoint, SourceError, SourcePage};
use crate::types::CanonicalRecord;

/// Configuration for a single-page indexer
#[derive(Debug, Clone)]
pub struct SnapshotSourceConfig {
    pub name: String,
    pub endpoint: SourceEndpoint,
    pub policy: PagingPolicy,
    /// Query parameter carrying the address; `None` when the path template has it
    pub address_param: Option<String>,
    pub limit_param: String,
}

impl SnapshotSourceConfig {
    pub fn new(endpoint: SourceEndpoint) -> Self {
        Self {
            name: "source-c".to_string(),
            endpoint,
            policy: PagingPolicy {
                page_size: 100,
                max_pages: 1,
                on_failure: FailurePolicy::Abort,
                ..PagingPolicy::default()
            },
            address_param: Some("ownerAddress".to_string()),
            limit_param: "limit".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct SnapshotResponse {
    #[serde(default)]
    total: Option<Value>,
    #[serde(default)]
    tokens: Vec<SnapshotItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotItem {
    id: Option<String>,
    inscription_number: Option<Value>,
    owner: Option<String>,
    content_type: Option<String>,
    content_length: Option<Value>,
    genesis_transaction: Option<String>,
    genesis_transaction_block_time: Option<Value>,
}

pub struct SnapshotSource {
    config: SnapshotSourceConfig,
    client: reqwest::Client,
    content_host: String,
}

impl SnapshotSource {
    pub fn new(config: SnapshotSourceConfig, client: reqwest::Client, content_host: &str) -> Self {
        Self {
            config,
            client,
            content_host: content_host.to_string(),
        }
    }

    fn parse_page(&self, body: &[u8]) -> Result<SourcePage, SourceError> {
        let response: SnapshotResponse = serde_json::from_slice(body)?;
        let raw_len = response.tokens.len();
        let records = response
            .tokens
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

fn map_item(item: SnapshotItem, content_host: &str) -> Option<CanonicalRecord> {
    let id = non_empty(item.id.as_deref())?;
    let mut record = CanonicalRecord::new(id, content_host);

    record.sequence_number = item.inscription_number.as_ref().and_then(normalize::integer);
    record.owner_address = item.owner.unwrap_or_default();
    record.media_type = item.content_type.unwrap_or_default();
    record.byte_length = item.content_length.as_ref().and_then(normalize::unsigned);
    record.created_at_millis =
        normalize::created_at(item.genesis_transaction_block_time.as_ref(), id);
    record.origin_transaction_id = item
        .genesis_transaction
        .or_else(|| normalize::txid_from_inscription_id(id).map(str::to_string))
        .unwrap_or_default();

    Some(record)
}

#[async_trait]
impl InscriptionSource for SnapshotSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn policy(&self) -> &PagingPolicy {
        &self.config.policy
    }

    async fn fetch_page(&self, address: &str, _page: u32) -> Result<SourcePage, SourceError> {
        let mut query = vec![(
            self.config.limit_param.as_str(),
            self.config.policy.page_size.to_string(),
        )];
        if let Some(ref param) = self.config.address_param {
            query.push((param.as_str(), address.to_string()));
        }
        let body = self
            .config
            .endpoint
            .get(&self.client, address, &query)
            .await?;
        self.parse_page(&body)
    }
}
