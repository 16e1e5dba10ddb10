//! First-reporter-wins merge of source batches

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::sources::SourceBatch;
use crate::types::CanonicalRecord;

/// Deduplicating record set keyed by inscription id
///
/// Insertion order is kept so the final stable sort breaks ties by arrival.
#[derive(Debug, Default)]
pub struct MergeSet {
    records: IndexMap<String, CanonicalRecord>,
    reported_total: u64,
}

impl MergeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one batch; returns how many of its records were new
    pub fn absorb(&mut self, batch: SourceBatch) -> usize {
        if let Some(total) = batch.declared_total {
            self.reported_total = self.reported_total.max(total);
        }

        let mut inserted = 0;
        for record in batch.records {
            if let Entry::Vacant(slot) = self.records.entry(record.id.clone()) {
                slot.insert(record);
                inserted += 1;
            }
        }
        inserted
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Largest total any source has declared so far
    pub fn reported_total(&self) -> u64 {
        self.reported_total
    }

    pub fn into_records(self) -> Vec<CanonicalRecord> {
        self.records.into_values().collect()
    }
}
