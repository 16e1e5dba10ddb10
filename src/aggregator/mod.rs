//! Aggregation engine
//!
//! Fans out to every configured source, merges their batches as they
//! arrive, and reconciles the merged set once all sources are done or the
//! deadline fires. All sources are polled on the calling task through
//! `select_all`, so the merge set is only ever touched by one consumer
//! loop and needs no lock.

pub mod merge;
pub mod reconcile;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::sources::{InscriptionSource, SourceBatch, SourceEvent, SourceReport};
use crate::types::CanonicalRecord;

pub use merge::MergeSet;
pub use reconcile::{reconcile, AggregationResult};

/// Default deadline for one aggregation across all sources
pub const DEFAULT_AGGREGATE_TIMEOUT: Duration = Duration::from_secs(45);

/// Ordering of the merged records by sequence number
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Highest sequence number first
    #[default]
    Latest,
    /// Lowest sequence number first
    Oldest,
}

impl SortOrder {
    /// Stable sort; a missing sequence number sorts below every number
    pub fn sort(self, records: &mut [CanonicalRecord]) {
        match self {
            Self::Latest => records.sort_by(|a, b| b.sequence_number.cmp(&a.sequence_number)),
            Self::Oldest => records.sort_by(|a, b| a.sequence_number.cmp(&b.sequence_number)),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "latest" | "newest" | "desc" => Ok(Self::Latest),
            "oldest" | "asc" => Ok(Self::Oldest),
            other => Err(format!(
                "Invalid order '{}', expected 'latest' or 'oldest'",
                other
            )),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Oldest => write!(f, "oldest"),
        }
    }
}

/// Batches seen from one source, for reporting a run the deadline cut short
#[derive(Debug, Default)]
struct Progress {
    pages: u32,
    ids: HashSet<String>,
    declared_total: Option<u64>,
}

impl Progress {
    fn observe(&mut self, batch: &SourceBatch) {
        self.pages += 1;
        self.ids.extend(batch.records.iter().map(|r| r.id.clone()));
        if self.declared_total.is_none() {
            self.declared_total = batch.declared_total;
        }
    }

    fn timed_out_report(&self, source: &str) -> SourceReport {
        SourceReport {
            pages: self.pages,
            accepted: self.ids.len(),
            declared_total: self.declared_total,
            ..SourceReport::timed_out(source)
        }
    }
}

/// Merges inscriptions for an address across a fixed set of sources
pub struct Aggregator {
    sources: Vec<Arc<dyn InscriptionSource>>,
    deadline: Duration,
}

impl Aggregator {
    pub fn new(sources: Vec<Arc<dyn InscriptionSource>>) -> Self {
        Self {
            sources,
            deadline: DEFAULT_AGGREGATE_TIMEOUT,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Fetch, deduplicate, order and count everything the sources know
    /// about `address`.
    ///
    /// Never fails. Sources that error out or never finish simply
    /// contribute what they had; the gap shows up in `missing_count` and
    /// in the per-source reports.
    pub async fn aggregate(&self, address: &str, order: SortOrder) -> AggregationResult {
        let mut merged = MergeSet::new();
        let mut reports: Vec<SourceReport> = Vec::with_capacity(self.sources.len());
        let mut progress: HashMap<String, Progress> = HashMap::new();

        let mut events = stream::select_all(self.sources.iter().map(|s| s.fetch_all(address)));
        let consume = async {
            while let Some(event) = events.next().await {
                match event {
                    SourceEvent::Batch(batch) => {
                        progress
                            .entry(batch.source.clone())
                            .or_default()
                            .observe(&batch);
                        merged.absorb(batch);
                    }
                    SourceEvent::Finished(report) => reports.push(report),
                }
            }
        };
        let timed_out = tokio::time::timeout(self.deadline, consume).await.is_err();

        if timed_out {
            warn!(
                address = %address,
                deadline_ms = self.deadline.as_millis() as u64,
                merged = merged.len(),
                "Aggregation deadline reached, returning partial result"
            );
        }

        // One report per configured source, in configuration order
        let sources = self
            .sources
            .iter()
            .map(|source| {
                reports
                    .iter()
                    .position(|r| r.source == source.name())
                    .map(|i| reports.swap_remove(i))
                    .unwrap_or_else(|| match progress.get(source.name()) {
                        Some(seen) => seen.timed_out_report(source.name()),
                        None => SourceReport::timed_out(source.name()),
                    })
            })
            .collect();

        let reported_total = merged.reported_total();
        let mut records = merged.into_records();
        order.sort(&mut records);

        let mut result = reconcile(records, reported_total);
        result.sources = sources;
        result.timed_out = timed_out;

        if result.missing_count > 0 {
            warn!(
                address = %address,
                fetched = result.fetched_count,
                reported = result.reported_total,
                missing = result.missing_count,
                "Sources returned fewer inscriptions than they reported"
            );
        }

        info!(
            address = %address,
            order = %order,
            total = result.total,
            fetched = result.fetched_count,
            cursed = result.curse_count,
            normal = result.normal_count,
            timed_out = result.timed_out,
            "Aggregation complete"
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{FailurePolicy, PagingPolicy, SourceOutcome, StaticSource};

    fn record(id: &str, seq: Option<i64>) -> CanonicalRecord {
        let mut r = CanonicalRecord::new(id, "https://ordinals.com");
        r.sequence_number = seq;
        r
    }

    fn numbered(range: std::ops::Range<i64>) -> Vec<CanonicalRecord> {
        range.map(|n| record(&format!("i{n}"), Some(n))).collect()
    }

    fn policy() -> PagingPolicy {
        PagingPolicy {
            page_size: 10,
            max_pages: 10,
            ..PagingPolicy::default()
        }
    }

    fn aggregator(sources: Vec<StaticSource>) -> Aggregator {
        Aggregator::new(
            sources
                .into_iter()
                .map(|s| Arc::new(s) as Arc<dyn InscriptionSource>)
                .collect(),
        )
    }

    #[test]
    fn test_parse_sort_order() {
        assert_eq!("latest".parse::<SortOrder>().unwrap(), SortOrder::Latest);
        assert_eq!("OLDEST".parse::<SortOrder>().unwrap(), SortOrder::Oldest);
        assert_eq!("".parse::<SortOrder>().unwrap(), SortOrder::Latest);
        assert!("sideways".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_latest_order_puts_missing_sequence_last() {
        let mut records = vec![
            record("a", Some(3)),
            record("b", None),
            record("c", Some(-1)),
            record("d", Some(7)),
        ];
        SortOrder::Latest.sort(&mut records);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["d", "a", "c", "b"]);
    }

    #[test]
    fn test_oldest_order_puts_missing_sequence_first() {
        let mut records = vec![record("a", Some(3)), record("b", None), record("c", Some(-1))];
        SortOrder::Oldest.sort(&mut records);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_numbers() {
        let mut records = vec![
            record("first", Some(1)),
            record("second", Some(1)),
            record("third", Some(1)),
        ];
        SortOrder::Latest.sort(&mut records);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_overlapping_sources_are_deduplicated() {
        let a = StaticSource::new("a", policy()).page(numbered(0..10), Some(12));
        let b = StaticSource::new("b", policy()).page(numbered(5..12), Some(12));

        let result = aggregator(vec![a, b]).aggregate("bc1q", SortOrder::Oldest).await;

        assert_eq!(result.fetched_count, 12);
        assert_eq!(result.total, 12);
        assert_eq!(result.missing_count, 0);
        let numbers: Vec<_> = result.records.iter().filter_map(|r| r.sequence_number).collect();
        assert_eq!(numbers, (0..12).collect::<Vec<_>>());
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn test_three_failing_sources_keep_the_survivor() {
        let abort = PagingPolicy {
            on_failure: FailurePolicy::Abort,
            ..policy()
        };
        let skip = PagingPolicy {
            on_failure: FailurePolicy::SkipPage,
            ..policy()
        };
        let sources = vec![
            StaticSource::new("a", abort.clone()).unreachable(503),
            StaticSource::new("b", skip).unreachable(500),
            StaticSource::new("c", abort).unreachable(429),
            StaticSource::new("d", policy()).page(numbered(-2..3), Some(5)),
        ];

        let result = aggregator(sources).aggregate("bc1q", SortOrder::Latest).await;

        assert_eq!(result.fetched_count, 5);
        assert_eq!(result.curse_count, 2);
        assert_eq!(result.normal_count, 3);
        assert_eq!(result.sources.len(), 4);
        assert_eq!(result.sources[0].outcome, SourceOutcome::Aborted);
        assert_eq!(result.sources[1].outcome, SourceOutcome::Exhausted);
        assert_eq!(result.sources[3].outcome, SourceOutcome::Completed);
    }

    #[tokio::test]
    async fn test_all_sources_failing_yields_empty_result() {
        let sources = vec![
            StaticSource::new("a", policy()).unreachable(500),
            StaticSource::new("b", policy()).unreachable(500),
        ];

        let result = aggregator(sources).aggregate("bc1q", SortOrder::Latest).await;

        assert!(result.records.is_empty());
        assert_eq!(result.total, 0);
        assert_eq!(result.missing_count, 0);
    }

    #[tokio::test]
    async fn test_no_sources_configured() {
        let result = aggregator(vec![]).aggregate("bc1q", SortOrder::Latest).await;
        assert!(result.records.is_empty());
        assert!(result.sources.is_empty());
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn test_deadline_returns_partial_result() {
        let fast = StaticSource::new("fast", policy()).page(numbered(0..4), Some(4));
        let slow = StaticSource::new("slow", policy())
            .page(numbered(100..110), Some(50))
            .with_delay(Duration::from_secs(5));

        let result = aggregator(vec![fast, slow])
            .with_deadline(Duration::from_millis(200))
            .aggregate("bc1q", SortOrder::Latest)
            .await;

        assert!(result.timed_out);
        assert_eq!(result.fetched_count, 4);
        assert_eq!(result.sources[0].outcome, SourceOutcome::Completed);
        assert_eq!(result.sources[1].outcome, SourceOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_timed_out_source_reports_merged_pages() {
        let fast = StaticSource::new("fast", policy()).page(numbered(0..4), Some(4));
        let stalled = StaticSource::new("stalled", policy())
            .page(numbered(100..110), Some(50))
            .page(numbered(105..115), None)
            .stall_after(2, Duration::from_secs(5));

        let result = aggregator(vec![fast, stalled])
            .with_deadline(Duration::from_millis(200))
            .aggregate("bc1q", SortOrder::Latest)
            .await;

        assert!(result.timed_out);
        assert_eq!(result.fetched_count, 19);
        let report = &result.sources[1];
        assert_eq!(report.source, "stalled");
        assert_eq!(report.outcome, SourceOutcome::TimedOut);
        assert_eq!(report.pages, 2);
        assert_eq!(report.accepted, 15);
        assert_eq!(report.declared_total, Some(50));
    }
}
