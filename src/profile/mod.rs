//! Profile inscription-count cache
//!
//! The profile store itself lives elsewhere; aggregation only ever writes
//! the final count for an address through `InscriptionCountCache`.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

/// Collaborator that remembers the last aggregated count per address
#[async_trait]
pub trait InscriptionCountCache: Send + Sync {
    async fn set_cached_inscription_count(&self, address: &str, count: u64);

    async fn cached_inscription_count(&self, address: &str) -> Option<u64>;
}

/// Process-local cache, shared across requests
#[derive(Debug, Default)]
pub struct InMemoryCountCache {
    counts: DashMap<String, u64>,
}

impl InMemoryCountCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[async_trait]
impl InscriptionCountCache for InMemoryCountCache {
    async fn set_cached_inscription_count(&self, address: &str, count: u64) {
        debug!(address = %address, count, "Caching inscription count");
        self.counts.insert(address.to_string(), count);
    }

    async fn cached_inscription_count(&self, address: &str) -> Option<u64> {
        self.counts.get(address).map(|entry| *entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_latest_count_wins() {
        let cache = InMemoryCountCache::new();
        assert_eq!(cache.cached_inscription_count("bc1q").await, None);

        cache.set_cached_inscription_count("bc1q", 150).await;
        cache.set_cached_inscription_count("bc1q", 155).await;

        assert_eq!(cache.cached_inscription_count("bc1q").await, Some(155));
        assert_eq!(cache.len(), 1);
    }
}
