//! Shared HTTP plumbing for indexer sources
//!
//! Every adapter goes through `SourceEndpoint::get`, which applies the API
//! key header and checks the status. The per-call timeout lives on the
//! shared `reqwest::Client`.

use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use super::SourceError;

const USER_AGENT: &str = concat!("scribe/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by all sources
pub fn build_client(request_timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(request_timeout)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_default()
}

/// Where and how to reach one indexer
#[derive(Debug, Clone)]
pub struct SourceEndpoint {
    /// e.g. "https://indexer.example.com"
    pub base_url: String,
    /// Path template; `{address}` is replaced with the URL-encoded address
    pub path: String,
    pub api_key: Option<String>,
    /// Header that carries `api_key`
    pub api_key_header: String,
}

impl SourceEndpoint {
    pub fn new(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: path.into(),
            api_key: None,
            api_key_header: "x-api-key".to_string(),
        }
    }

    pub fn with_api_key(mut self, header: impl Into<String>, key: impl Into<String>) -> Self {
        self.api_key_header = header.into();
        self.api_key = Some(key.into());
        self
    }

    /// Full URL for `address`, without the query string
    pub fn url_for(&self, address: &str) -> String {
        let path = self
            .path
            .replace("{address}", &urlencoding::encode(address));
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// GET `address`'s resource with `query`, returning the raw body on 2xx
    pub async fn get(
        &self,
        client: &reqwest::Client,
        address: &str,
        query: &[(&str, String)],
    ) -> Result<Bytes, SourceError> {
        let url = self.url_for(address);
        debug!(url = %url, query = ?query, "Requesting indexer page");

        let mut request = client
            .get(&url)
            .query(query)
            .header("Accept", "application/json");
        if let Some(ref key) = self.api_key {
            request = request.header(self.api_key_header.as_str(), key.as_str());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        Ok(response.bytes().await?)
    }
}
