//! Configuration for Scribe
//!
//! CLI arguments and environment variable handling using clap. Indexer
//! credentials are only ever read from the environment (or `.env`).

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use uuid::Uuid;

use crate::sources::{PagingPolicy, SourceEndpoint, DEFAULT_MAX_EMPTY_PAGES};

/// Scribe - multi-source Ordinals inscription aggregator
#[derive(Parser, Debug, Clone)]
#[command(name = "scribe")]
#[command(about = "Aggregates Ordinals inscriptions for an address across several indexers")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Timeout for a single indexer request in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "15000")]
    pub request_timeout_ms: u64,

    /// Deadline for a whole aggregation in milliseconds
    #[arg(long, env = "AGGREGATE_TIMEOUT_MS", default_value = "45000")]
    pub aggregate_timeout_ms: u64,

    /// Host used to build `{host}/content/{id}` URLs
    #[arg(long, env = "CONTENT_HOST", default_value = "https://ordinals.com")]
    pub content_host: String,

    /// Override the page ceiling of the paginated sources
    #[arg(long, env = "MAX_PAGES")]
    pub max_pages: Option<u32>,

    /// Consecutive empty pages tolerated before a source is treated as exhausted
    #[arg(long, env = "MAX_EMPTY_PAGES", default_value_t = DEFAULT_MAX_EMPTY_PAGES)]
    pub max_empty_pages: u32,

    /// Indexer endpoints
    #[command(flatten)]
    pub sources: SourceArgs,
}

/// Endpoint settings for the four indexers
///
/// A source without a base URL is disabled.
#[derive(Parser, Debug, Clone)]
pub struct SourceArgs {
    #[arg(long, env = "SOURCE_A_BASE_URL")]
    pub source_a_base_url: Option<String>,

    #[arg(long, env = "SOURCE_A_API_KEY", hide_env_values = true)]
    pub source_a_api_key: Option<String>,

    #[arg(long, env = "SOURCE_A_API_KEY_HEADER", default_value = "x-api-key")]
    pub source_a_api_key_header: String,

    #[arg(long, env = "SOURCE_A_PATH", default_value = "/v1/address/{address}/inscriptions")]
    pub source_a_path: String,

    #[arg(long, env = "SOURCE_B_BASE_URL")]
    pub source_b_base_url: Option<String>,

    #[arg(long, env = "SOURCE_B_API_KEY", hide_env_values = true)]
    pub source_b_api_key: Option<String>,

    #[arg(long, env = "SOURCE_B_API_KEY_HEADER", default_value = "Authorization")]
    pub source_b_api_key_header: String,

    #[arg(
        long,
        env = "SOURCE_B_PATH",
        default_value = "/v1/indexer/address/{address}/inscription-data"
    )]
    pub source_b_path: String,

    #[arg(long, env = "SOURCE_C_BASE_URL")]
    pub source_c_base_url: Option<String>,

    #[arg(long, env = "SOURCE_C_API_KEY", hide_env_values = true)]
    pub source_c_api_key: Option<String>,

    #[arg(long, env = "SOURCE_C_API_KEY_HEADER", default_value = "x-api-key")]
    pub source_c_api_key_header: String,

    #[arg(long, env = "SOURCE_C_PATH", default_value = "/v2/ord/btc/tokens")]
    pub source_c_path: String,

    #[arg(long, env = "SOURCE_D_BASE_URL")]
    pub source_d_base_url: Option<String>,

    #[arg(long, env = "SOURCE_D_API_KEY", hide_env_values = true)]
    pub source_d_api_key: Option<String>,

    #[arg(long, env = "SOURCE_D_API_KEY_HEADER", default_value = "Ok-Access-Key")]
    pub source_d_api_key_header: String,

    #[arg(
        long,
        env = "SOURCE_D_PATH",
        default_value = "/api/v5/explorer/btc/inscriptions-list"
    )]
    pub source_d_path: String,
}

fn endpoint(
    base_url: &Option<String>,
    path: &str,
    api_key: &Option<String>,
    api_key_header: &str,
) -> Option<SourceEndpoint> {
    let base_url = base_url.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
    let endpoint = SourceEndpoint::new(base_url, path);
    Some(match api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => endpoint.with_api_key(api_key_header, key),
        None => endpoint,
    })
}

impl SourceArgs {
    pub fn source_a(&self) -> Option<SourceEndpoint> {
        endpoint(
            &self.source_a_base_url,
            &self.source_a_path,
            &self.source_a_api_key,
            &self.source_a_api_key_header,
        )
    }

    pub fn source_b(&self) -> Option<SourceEndpoint> {
        endpoint(
            &self.source_b_base_url,
            &self.source_b_path,
            &self.source_b_api_key,
            &self.source_b_api_key_header,
        )
    }

    pub fn source_c(&self) -> Option<SourceEndpoint> {
        endpoint(
            &self.source_c_base_url,
            &self.source_c_path,
            &self.source_c_api_key,
            &self.source_c_api_key_header,
        )
    }

    pub fn source_d(&self) -> Option<SourceEndpoint> {
        endpoint(
            &self.source_d_base_url,
            &self.source_d_path,
            &self.source_d_api_key,
            &self.source_d_api_key_header,
        )
    }

    fn base_urls(&self) -> [(&'static str, &Option<String>); 4] {
        [
            ("SOURCE_A_BASE_URL", &self.source_a_base_url),
            ("SOURCE_B_BASE_URL", &self.source_b_base_url),
            ("SOURCE_C_BASE_URL", &self.source_c_base_url),
            ("SOURCE_D_BASE_URL", &self.source_d_base_url),
        ]
    }
}

impl Args {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn aggregate_timeout(&self) -> Duration {
        Duration::from_millis(self.aggregate_timeout_ms)
    }

    /// Apply the global paging overrides to a multi-page source
    pub fn tune_paging(&self, policy: &mut PagingPolicy) {
        policy.max_empty_pages = self.max_empty_pages;
        if let Some(max_pages) = self.max_pages {
            policy.max_pages = max_pages;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        if self.aggregate_timeout_ms < self.request_timeout_ms {
            return Err(
                "AGGREGATE_TIMEOUT_MS must be at least REQUEST_TIMEOUT_MS".to_string(),
            );
        }

        if self.max_empty_pages == 0 {
            return Err("MAX_EMPTY_PAGES must be at least 1".to_string());
        }

        if self.max_pages == Some(0) {
            return Err("MAX_PAGES must be at least 1".to_string());
        }

        if !is_http_url(&self.content_host) {
            return Err("CONTENT_HOST must be an http(s) URL".to_string());
        }

        for (name, url) in self.sources.base_urls() {
            if let Some(url) = url.as_deref().filter(|u| !u.trim().is_empty()) {
                if !is_http_url(url) {
                    return Err(format!("{} must be an http(s) URL", name));
                }
            }
        }

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["scribe"]);
        assert_eq!(args.listen.port(), 8080);
        assert_eq!(args.request_timeout(), Duration::from_secs(15));
        assert_eq!(args.aggregate_timeout(), Duration::from_secs(45));
        assert_eq!(args.max_empty_pages, DEFAULT_MAX_EMPTY_PAGES);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_source_without_base_url_is_disabled() {
        let args = Args::parse_from(["scribe", "--source-a-base-url", "https://a.example.com"]);
        assert!(args.sources.source_a().is_some());
        assert!(args.sources.source_b().is_none());
        assert!(args.sources.source_c().is_none());
        assert!(args.sources.source_d().is_none());
    }

    #[test]
    fn test_api_key_and_header_reach_endpoint() {
        let args = Args::parse_from([
            "scribe",
            "--source-d-base-url",
            "https://d.example.com",
            "--source-d-api-key",
            "secret",
        ]);
        let endpoint = args.sources.source_d().unwrap();
        assert_eq!(endpoint.api_key.as_deref(), Some("secret"));
        assert_eq!(endpoint.api_key_header, "Ok-Access-Key");
        assert_eq!(endpoint.path, "/api/v5/explorer/btc/inscriptions-list");
    }

    #[test]
    fn test_tune_paging_overrides() {
        let args = Args::parse_from(["scribe", "--max-pages", "3", "--max-empty-pages", "2"]);
        let mut policy = PagingPolicy::default();
        args.tune_paging(&mut policy);
        assert_eq!(policy.max_pages, 3);
        assert_eq!(policy.max_empty_pages, 2);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let args = Args::parse_from(["scribe", "--request-timeout-ms", "0"]);
        assert!(args.validate().is_err());

        let args = Args::parse_from([
            "scribe",
            "--request-timeout-ms",
            "30000",
            "--aggregate-timeout-ms",
            "10000",
        ]);
        assert!(args.validate().is_err());

        let args = Args::parse_from(["scribe", "--source-b-base-url", "ftp://b"]);
        assert!(args
            .validate()
            .unwrap_err()
            .contains("SOURCE_B_BASE_URL"));
    }
}
