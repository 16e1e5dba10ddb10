//! Inscription indexer sources
//!
//! Each external indexer is one `InscriptionSource`. An adapter only knows
//! how to fetch and map a single page; the shared paginator turns that into
//! a lazy stream of batches and owns the termination rules, so the
//! aggregator never sees adapter-specific logic.
//!
//! ## Adapters
//!
//! - **paged** (Source A): page number + page size, total on the first page
//! - **cursor** (Source B): cursor advanced by size, total under `data.total`
//! - **snapshot** (Source C): single call with a fixed limit
//! - **explorer** (Source D): page number + limit, total as a string

pub mod cursor;
pub mod explorer;
pub mod http;
pub mod memory;
pub mod normalize;
pub mod paged;
pub mod paginator;
pub mod snapshot;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;

use crate::types::CanonicalRecord;

pub use cursor::{CursorSource, CursorSourceConfig};
pub use explorer::{ExplorerSource, ExplorerSourceConfig};
pub use http::{build_client, SourceEndpoint};
pub use memory::StaticSource;
pub use paged::{PagedSource, PagedSourceConfig};
pub use paginator::paginate;
pub use snapshot::{SnapshotSource, SnapshotSourceConfig};

/// Default number of consecutive empty pages tolerated before a source is
/// treated as exhausted
pub const DEFAULT_MAX_EMPTY_PAGES: u32 = 5;

/// What to do when a single page request fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Advance one page width and keep going
    SkipPage,
    /// Stop this source entirely
    Abort,
}

/// Per-source pagination limits and failure handling
#[derive(Debug, Clone)]
pub struct PagingPolicy {
    /// Items requested per call
    pub page_size: u32,
    /// Hard ceiling on page requests (successful or not)
    pub max_pages: u32,
    /// Consecutive empty pages tolerated while the declared total is unmet
    pub max_empty_pages: u32,
    /// Stop as soon as a page comes back shorter than `page_size`
    pub stop_on_short_page: bool,
    pub on_failure: FailurePolicy,
}

impl Default for PagingPolicy {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_pages: 50,
            max_empty_pages: DEFAULT_MAX_EMPTY_PAGES,
            stop_on_short_page: false,
            on_failure: FailurePolicy::Abort,
        }
    }
}

/// One page as returned by an adapter
#[derive(Debug, Clone, Default)]
pub struct SourcePage {
    /// Mapped records (items without an identifier already dropped)
    pub records: Vec<CanonicalRecord>,
    /// Number of items in the raw payload, before dropping
    pub raw_len: usize,
    /// Total count the source claims for the address, if it reports one
    pub declared_total: Option<u64>,
}

impl SourcePage {
    pub fn is_empty(&self) -> bool {
        self.raw_len == 0
    }

    /// Items that could not be mapped
    pub fn dropped(&self) -> usize {
        self.raw_len.saturating_sub(self.records.len())
    }
}

/// Records produced by one successful page request
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub source: String,
    pub records: Vec<CanonicalRecord>,
    pub declared_total: Option<u64>,
}

/// Items produced by `InscriptionSource::fetch_all`
#[derive(Debug, Clone)]
pub enum SourceEvent {
    Batch(SourceBatch),
    /// Always the last event of a run
    Finished(SourceReport),
}

/// Why a source stopped paging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceOutcome {
    /// Empty page after the declared total was reached
    Completed,
    /// Too many consecutive empty pages before the declared total
    Exhausted,
    /// Page ceiling reached
    CeilingReached,
    /// Page shorter than the page size
    ShortPage,
    /// A failed request ended the run
    Aborted,
    /// The aggregation deadline fired first
    TimedOut,
}

/// Per-source summary of one run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub source: String,
    pub pages: u32,
    pub failed_pages: u32,
    /// Unique ids accepted by this source during the run
    pub accepted: usize,
    pub dropped: usize,
    pub declared_total: Option<u64>,
    pub outcome: SourceOutcome,
}

impl SourceReport {
    /// Report for a source that never finished before the deadline
    pub fn timed_out(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            pages: 0,
            failed_pages: 0,
            accepted: 0,
            dropped: 0,
            declared_total: None,
            outcome: SourceOutcome::TimedOut,
        }
    }
}

/// Errors from a single page request
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Invalid payload: {0}")]
    Decode(String),

    #[error("Indexer error {code}: {message}")]
    Api { code: String, message: String },
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// One external inscription indexer
#[async_trait]
pub trait InscriptionSource: Send + Sync {
    /// Stable name used in logs and reports
    fn name(&self) -> &str;

    fn policy(&self) -> &PagingPolicy;

    /// Fetch and map one page; `page` is a zero-based page index that each
    /// adapter translates into its own cursor, offset or page number.
    async fn fetch_page(&self, address: &str, page: u32) -> Result<SourcePage, SourceError>;

    /// Page through everything the source has for `address`.
    ///
    /// Finite, lazy, and not restartable: every call starts again at page 0.
    /// Failures end the stream; they are never returned to the caller.
    fn fetch_all<'a>(&'a self, address: &'a str) -> BoxStream<'a, SourceEvent> {
        paginate(self, address)
    }
}
