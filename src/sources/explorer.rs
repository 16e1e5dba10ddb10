//! Source D: block explorer with page + limit
//!
//! Everything numeric in this API is string-encoded, including the total.
//!
//! ```text
//! GET {base}/api/v5/explorer/btc/inscriptions-list?address={address}&page=1&limit=50
//! { "code": "0", "msg": "",
//!   "data": [ { "page": "1", "limit": "50", "totalPage": "3",
//!               "totalInscription": "123",
//!               "inscriptionsList": [ { "inscriptionId": "...i0",
//!                                       "inscriptionNumber": "-5",
//!                                       "ownerAddress": "bc1p...",
//!                                       "contentType": "text/html",
//!                                       "contentSize": "931",
//!                                       "txId": "...", "time": "1675252800000" } ] } ] }
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::normalize::{self, non_empty};
use super::{FailurePolicy, InscriptionSource, PagingPolicy, SourceEndpoint, SourceError, SourcePage};
use crate::types::CanonicalRecord;

/// Configuration for the explorer indexer
#[derive(Debug, Clone)]
pub struct ExplorerSourceConfig {
    pub name: String,
    pub endpoint: SourceEndpoint,
    pub policy: PagingPolicy,
    /// Query parameter carrying the address; `None` when the path template has it
    pub address_param: Option<String>,
    pub page_param: String,
    pub limit_param: String,
}

impl ExplorerSourceConfig {
    pub fn new(endpoint: SourceEndpoint) -> Self {
        Self {
            name: "source-d".to_string(),
            endpoint,
            policy: PagingPolicy {
                page_size: 50,
                max_pages: 100,
                on_failure: FailurePolicy::SkipPage,
                ..PagingPolicy::default()
            },
            address_param: Some("address".to_string()),
            page_param: "page".to_string(),
            limit_param: "limit".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ExplorerResponse {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Vec<ExplorerData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExplorerData {
    #[serde(default)]
    total_inscription: Option<Value>,
    #[serde(default)]
    inscriptions_list: Vec<ExplorerItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExplorerItem {
    inscription_id: Option<String>,
    inscription_number: Option<Value>,
    owner_address: Option<String>,
    content_type: Option<String>,
    content_size: Option<Value>,
    tx_id: Option<String>,
    time: Option<Value>,
}

pub struct ExplorerSource {
    config: ExplorerSourceConfig,
    client: reqwest::Client,
    content_host: String,
}

impl ExplorerSource {
    pub fn new(config: ExplorerSourceConfig, client: reqwest::Client, content_host: &str) -> Self {
        Self {
            config,
            client,
            content_host: content_host.to_string(),
        }
    }

    fn parse_page(&self, body: &[u8]) -> Result<SourcePage, SourceError> {
        let response: ExplorerResponse = serde_json::from_slice(body)?;

        normalize::api_status(response.code.as_ref(), response.msg)?;

        let Some(data) = response.data.into_iter().next() else {
            return Ok(SourcePage::default());
        };

        let raw_len = data.inscriptions_list.len();
        let records = data
            .inscriptions_list
            .into_iter()
            .filter_map(|item| map_item(item, &self.content_host))
            .collect();

        Ok(SourcePage {
            records,
            raw_len,
            declared_total: data.total_inscription.as_ref().and_then(normalize::unsigned),
        })
    }
}

fn map_item(item: ExplorerItem, content_host: &str) -> Option<CanonicalRecord> {
    let id = non_empty(item.inscription_id.as_deref())?;
    let mut record = CanonicalRecord::new(id, content_host);

    record.sequence_number = item.inscription_number.as_ref().and_then(normalize::integer);
    record.owner_address = item.owner_address.unwrap_or_default();
    record.media_type = item.content_type.unwrap_or_default();
    record.byte_length = item.content_size.as_ref().and_then(normalize::unsigned);
    record.created_at_millis = normalize::created_at(item.time.as_ref(), id);
    record.origin_transaction_id = item
        .tx_id
        .or_else(|| normalize::txid_from_inscription_id(id).map(str::to_string))
        .unwrap_or_default();

    Some(record)
}

#[async_trait]
impl InscriptionSource for ExplorerSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn policy(&self) -> &PagingPolicy {
        &self.config.policy
    }

    async fn fetch_page(&self, address: &str, page: u32) -> Result<SourcePage, SourceError> {
        let mut query = vec![
            (self.config.page_param.as_str(), (page + 1).to_string()),
            (
                self.config.limit_param.as_str(),
                self.config.policy.page_size.to_string(),
            ),
        ];
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
