//! Shared pagination driver
//!
//! Turns an adapter's single-page `fetch_page` into the lazy
//! `SourceEvent` stream behind `InscriptionSource::fetch_all`.
//!
//! A run stops when:
//! - a page is empty and the unique ids accepted so far cover the declared
//!   total (a source without a declared total stops at its first empty page)
//! - `max_pages` requests have been made
//! - `max_empty_pages` consecutive pages came back empty (or failed and were
//!   skipped) while the declared total is still out of reach
//! - `stop_on_short_page` is set and a page (an empty one included) is
//!   shorter than `page_size`, or the declared total has been reached
//! - a request fails under `FailurePolicy::Abort`

use std::collections::HashSet;

use futures::stream::{self, BoxStream, StreamExt};
use tracing::{debug, info, warn};

use super::{
    FailurePolicy, InscriptionSource, PagingPolicy, SourceBatch, SourceEvent, SourceOutcome,
    SourceReport,
};

/// Whether the run should request another page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Stop(SourceOutcome),
}

/// Termination bookkeeping for a single source run
#[derive(Debug, Clone)]
pub struct PageTracker {
    policy: PagingPolicy,
    pages: u32,
    failed_pages: u32,
    empty_streak: u32,
    accepted: usize,
    dropped: usize,
    declared_total: Option<u64>,
}

impl PageTracker {
    pub fn new(policy: PagingPolicy) -> Self {
        Self {
            policy,
            pages: 0,
            failed_pages: 0,
            empty_streak: 0,
            accepted: 0,
            dropped: 0,
            declared_total: None,
        }
    }

    pub fn ceiling_reached(&self) -> bool {
        self.pages >= self.policy.max_pages
    }

    fn target_reached(&self) -> bool {
        self.accepted as u64 >= self.declared_total.unwrap_or(0)
    }

    /// Record a successful page.
    ///
    /// `newly_accepted` is the number of ids on this page not seen earlier in
    /// the run. The declared total is taken from the first page that reports
    /// one.
    pub fn record_page(
        &mut self,
        raw_len: usize,
        newly_accepted: usize,
        dropped: usize,
        declared_total: Option<u64>,
    ) -> Step {
        self.pages += 1;
        self.accepted += newly_accepted;
        self.dropped += dropped;
        if self.declared_total.is_none() {
            self.declared_total = declared_total;
        }

        if raw_len == 0 {
            if self.target_reached() {
                return Step::Stop(SourceOutcome::Completed);
            }
            // An empty page is the shortest page there is
            if self.policy.stop_on_short_page {
                return Step::Stop(SourceOutcome::ShortPage);
            }
            self.empty_streak += 1;
            if self.empty_streak >= self.policy.max_empty_pages {
                return Step::Stop(SourceOutcome::Exhausted);
            }
        } else {
            self.empty_streak = 0;
            if self.policy.stop_on_short_page {
                if matches!(self.declared_total, Some(total) if total > 0)
                    && self.target_reached()
                {
                    return Step::Stop(SourceOutcome::Completed);
                }
                if raw_len < self.policy.page_size as usize {
                    return Step::Stop(SourceOutcome::ShortPage);
                }
            }
        }

        if self.ceiling_reached() {
            return Step::Stop(SourceOutcome::CeilingReached);
        }
        Step::Continue
    }

    /// Record a failed page request.
    ///
    /// A skipped page counts toward the ceiling and the empty-page streak.
    pub fn record_failure(&mut self) -> Step {
        self.pages += 1;
        self.failed_pages += 1;

        match self.policy.on_failure {
            FailurePolicy::Abort => Step::Stop(SourceOutcome::Aborted),
            FailurePolicy::SkipPage => {
                self.empty_streak += 1;
                if self.empty_streak >= self.policy.max_empty_pages {
                    Step::Stop(SourceOutcome::Exhausted)
                } else if self.ceiling_reached() {
                    Step::Stop(SourceOutcome::CeilingReached)
                } else {
                    Step::Continue
                }
            }
        }
    }

    pub fn report(&self, source: &str, outcome: SourceOutcome) -> SourceReport {
        SourceReport {
            source: source.to_string(),
            pages: self.pages,
            failed_pages: self.failed_pages,
            accepted: self.accepted,
            dropped: self.dropped,
            declared_total: self.declared_total,
            outcome,
        }
    }
}

struct RunState<'a, S: ?Sized> {
    source: &'a S,
    address: &'a str,
    next_page: u32,
    tracker: PageTracker,
    seen: HashSet<String>,
    stop: Option<SourceOutcome>,
    finished: bool,
}

impl<S: InscriptionSource + ?Sized> RunState<'_, S> {
    fn finish(&mut self, outcome: SourceOutcome) -> SourceEvent {
        self.finished = true;
        let report = self.tracker.report(self.source.name(), outcome);
        info!(
            source = %report.source,
            pages = report.pages,
            failed_pages = report.failed_pages,
            accepted = report.accepted,
            declared_total = ?report.declared_total,
            outcome = ?report.outcome,
            "Source run finished"
        );
        SourceEvent::Finished(report)
    }
}

/// Drive `source` page by page for `address`
///
/// Yields one `SourceEvent::Batch` per successful page and a final
/// `SourceEvent::Finished` carrying the run report.
pub fn paginate<'a, S>(source: &'a S, address: &'a str) -> BoxStream<'a, SourceEvent>
where
    S: InscriptionSource + ?Sized,
{
    let state = RunState {
        source,
        address,
        next_page: 0,
        tracker: PageTracker::new(source.policy().clone()),
        seen: HashSet::new(),
        stop: None,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }
        if let Some(outcome) = state.stop.take() {
            let event = state.finish(outcome);
            return Some((event, state));
        }

        loop {
            if state.tracker.ceiling_reached() {
                let event = state.finish(SourceOutcome::CeilingReached);
                return Some((event, state));
            }

            let page_index = state.next_page;
            state.next_page += 1;

            match state.source.fetch_page(state.address, page_index).await {
                Ok(page) => {
                    let before = state.seen.len();
                    for record in &page.records {
                        if !state.seen.contains(&record.id) {
                            state.seen.insert(record.id.clone());
                        }
                    }
                    let newly_accepted = state.seen.len() - before;

                    debug!(
                        source = %state.source.name(),
                        page = page_index,
                        items = page.raw_len,
                        accepted = newly_accepted,
                        dropped = page.dropped(),
                        declared_total = ?page.declared_total,
                        "Fetched source page"
                    );

                    if let Step::Stop(outcome) = state.tracker.record_page(
                        page.raw_len,
                        newly_accepted,
                        page.dropped(),
                        page.declared_total,
                    ) {
                        state.stop = Some(outcome);
                    }

                    let batch = SourceBatch {
                        source: state.source.name().to_string(),
                        records: page.records,
                        declared_total: page.declared_total,
                    };
                    return Some((SourceEvent::Batch(batch), state));
                }
                Err(e) => {
                    warn!(
                        source = %state.source.name(),
                        page = page_index,
                        error = %e,
                        policy = ?state.source.policy().on_failure,
                        "Source page request failed"
                    );
                    if let Step::Stop(outcome) = state.tracker.record_failure() {
                        let event = state.finish(outcome);
                        return Some((event, state));
                    }
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::memory::StaticSource;
    use crate::sources::{SourcePage, DEFAULT_MAX_EMPTY_PAGES};
    use crate::types::CanonicalRecord;

    fn records(ids: std::ops::Range<i64>) -> Vec<CanonicalRecord> {
        ids.map(|n| {
            let mut r = CanonicalRecord::new(format!("i{n}"), "https://ordinals.com");
            r.sequence_number = Some(n);
            r
        })
        .collect()
    }

    fn policy() -> PagingPolicy {
        PagingPolicy {
            page_size: 10,
            max_pages: 20,
            ..PagingPolicy::default()
        }
    }

    async fn run(source: &StaticSource) -> (Vec<SourceBatch>, SourceReport) {
        let mut batches = Vec::new();
        let mut report = None;
        let mut events = source.fetch_all("bc1qtest");
        while let Some(event) = events.next().await {
            match event {
                SourceEvent::Batch(b) => batches.push(b),
                SourceEvent::Finished(r) => report = Some(r),
            }
        }
        (batches, report.expect("finished event"))
    }

    #[tokio::test]
    async fn test_stops_on_empty_page_once_total_reached() {
        let source = StaticSource::new("s", policy())
            .page(records(0..10), Some(15))
            .page(records(10..15), None);

        let (batches, report) = run(&source).await;

        // Third request returns the empty page that ends the run
        assert_eq!(source.calls(), 3);
        assert_eq!(batches.len(), 3);
        assert_eq!(report.accepted, 15);
        assert_eq!(report.declared_total, Some(15));
        assert_eq!(report.outcome, SourceOutcome::Completed);
    }

    #[tokio::test]
    async fn test_no_declared_total_stops_at_first_empty_page() {
        let source = StaticSource::new("s", policy()).page(records(-5..0), None);

        let (_, report) = run(&source).await;

        assert_eq!(source.calls(), 2);
        assert_eq!(report.outcome, SourceOutcome::Completed);
        assert_eq!(report.accepted, 5);
    }

    #[tokio::test]
    async fn test_consecutive_empty_pages_mean_exhaustion() {
        let source = StaticSource::new("s", policy()).page(records(0..10), Some(100));

        let (_, report) = run(&source).await;

        // One real page, then five empties
        assert_eq!(source.calls(), 6);
        assert_eq!(report.outcome, SourceOutcome::Exhausted);
        assert_eq!(report.accepted, 10);
    }

    #[tokio::test]
    async fn test_page_ceiling() {
        let capped = PagingPolicy {
            max_pages: 2,
            ..policy()
        };
        let source = StaticSource::new("s", capped)
            .page(records(0..10), Some(30))
            .page(records(10..20), None)
            .page(records(20..30), None);

        let (batches, report) = run(&source).await;

        assert_eq!(source.calls(), 2);
        assert_eq!(batches.len(), 2);
        assert_eq!(report.outcome, SourceOutcome::CeilingReached);
        assert_eq!(report.accepted, 20);
    }

    #[tokio::test]
    async fn test_short_page_stops_when_enabled() {
        let short = PagingPolicy {
            stop_on_short_page: true,
            ..policy()
        };
        let source = StaticSource::new("s", short)
            .page(records(0..10), None)
            .page(records(10..14), None);

        let (_, report) = run(&source).await;

        assert_eq!(source.calls(), 2);
        assert_eq!(report.outcome, SourceOutcome::ShortPage);
    }

    #[tokio::test]
    async fn test_short_page_mode_stops_at_declared_total() {
        let short = PagingPolicy {
            stop_on_short_page: true,
            ..policy()
        };
        let source = StaticSource::new("s", short)
            .page(records(0..10), Some(20))
            .page(records(10..20), None)
            .page(records(20..30), None);

        let (_, report) = run(&source).await;

        assert_eq!(source.calls(), 2);
        assert_eq!(report.outcome, SourceOutcome::Completed);
    }

    #[tokio::test]
    async fn test_short_page_mode_stops_on_empty_page() {
        let short = PagingPolicy {
            stop_on_short_page: true,
            ..policy()
        };
        let source = StaticSource::new("s", short).page(records(0..10), Some(100));

        let (batches, report) = run(&source).await;

        // No empty-page streak: the first empty page ends the run
        assert_eq!(source.calls(), 2);
        assert_eq!(batches.len(), 2);
        assert_eq!(report.accepted, 10);
        assert_eq!(report.outcome, SourceOutcome::ShortPage);
    }

    #[tokio::test]
    async fn test_unmapped_items_count_as_dropped() {
        let source = StaticSource::new("s", policy())
            .raw_page(SourcePage {
                records: records(0..8),
                raw_len: 10,
                declared_total: Some(8),
            })
            .raw_page(SourcePage {
                records: Vec::new(),
                raw_len: 1,
                declared_total: None,
            });

        let (_, report) = run(&source).await;

        assert_eq!(report.accepted, 8);
        assert_eq!(report.dropped, 3);
        assert_eq!(report.outcome, SourceOutcome::Completed);
    }

    #[tokio::test]
    async fn test_abort_policy_ends_run_on_failure() {
        let source = StaticSource::new("s", policy())
            .failing_page(503)
            .page(records(0..10), Some(10));

        let (batches, report) = run(&source).await;

        assert_eq!(source.calls(), 1);
        assert!(batches.is_empty());
        assert_eq!(report.outcome, SourceOutcome::Aborted);
        assert_eq!(report.failed_pages, 1);
    }

    #[tokio::test]
    async fn test_skip_policy_advances_past_failed_page() {
        let skip = PagingPolicy {
            on_failure: FailurePolicy::SkipPage,
            ..policy()
        };
        let source = StaticSource::new("s", skip)
            .page(records(0..10), Some(20))
            .failing_page(500)
            .page(records(10..20), None);

        let (batches, report) = run(&source).await;

        assert_eq!(batches.len(), 3);
        assert_eq!(report.failed_pages, 1);
        assert_eq!(report.accepted, 20);
        assert_eq!(report.outcome, SourceOutcome::Completed);
    }

    #[tokio::test]
    async fn test_repeated_ids_count_once() {
        let source = StaticSource::new("s", policy())
            .page(records(0..10), Some(10))
            .page(records(0..10), None);

        let (_, report) = run(&source).await;

        assert_eq!(report.accepted, 10);
    }

    #[test]
    fn test_unreachable_skip_source_is_bounded_by_empty_streak() {
        let skip = PagingPolicy {
            on_failure: FailurePolicy::SkipPage,
            ..policy()
        };
        let mut tracker = PageTracker::new(skip);
        let mut steps = 0;
        while tracker.record_failure() == Step::Continue {
            steps += 1;
        }
        assert_eq!(steps, DEFAULT_MAX_EMPTY_PAGES - 1);
    }
}
