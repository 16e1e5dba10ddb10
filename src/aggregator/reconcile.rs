//! Totals and curse/normal split for a merged record set

use serde::Serialize;

use crate::sources::SourceReport;
use crate::types::CanonicalRecord;

/// Final, reconciled view of everything the sources returned for an address
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub records: Vec<CanonicalRecord>,
    /// Largest total any source declared
    pub reported_total: u64,
    /// `max(reported_total, records.len())`
    pub total: u64,
    pub fetched_count: u64,
    pub curse_count: u64,
    pub normal_count: u64,
    /// Records some source claims exist but nobody returned
    pub missing_count: u64,
    pub sources: Vec<SourceReport>,
    /// The aggregation deadline fired before every source finished
    pub timed_out: bool,
}

/// Derive counts for an already merged and ordered record list
///
/// Records without a sequence number count as normal, so
/// `curse_count + normal_count == fetched_count` always holds.
pub fn reconcile(records: Vec<CanonicalRecord>, reported_total: u64) -> AggregationResult {
    let fetched = records.len() as u64;
    let cursed = records.iter().filter(|r| r.is_cursed()).count() as u64;
    let total = reported_total.max(fetched);

    AggregationResult {
        records,
        reported_total,
        total,
        fetched_count: fetched,
        curse_count: cursed,
        normal_count: fetched - cursed,
        missing_count: total - fetched,
        sources: Vec::new(),
        timed_out: false,
    }
}
