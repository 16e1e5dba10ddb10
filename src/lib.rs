//! Scribe - multi-source Ordinals inscription aggregator
//!
//! Given a Bitcoin address, Scribe queries several independent inscription
//! indexers in parallel, deduplicates their overlapping results by
//! inscription id, and returns one ordered list with a best-effort total.
//!
//! ## Modules
//!
//! - **sources**: one adapter per indexer plus the shared pagination driver
//! - **aggregator**: fan-out, first-id-wins merge, deadline, ordering and counts
//! - **profile**: cached inscription count per address
//! - **server** / **routes**: the HTTP surface

pub mod aggregator;
pub mod config;
pub mod profile;
pub mod routes;
pub mod server;
pub mod sources;
pub mod types;

pub use aggregator::{AggregationResult, Aggregator, SortOrder};
pub use config::Args;
pub use server::{run, AppState};
pub use types::{CanonicalRecord, Result, ScribeError};
