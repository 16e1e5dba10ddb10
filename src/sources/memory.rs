//! In-memory source serving pre-built pages
//!
//! Useful for fixtures and for exercising the aggregator without network
//! access. Pages beyond the scripted ones come back empty.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{InscriptionSource, PagingPolicy, SourceError, SourcePage};
use crate::types::CanonicalRecord;

enum StaticPage {
    Page(SourcePage),
    Fail(u16),
}

/// Source backed by a fixed list of pages
pub struct StaticSource {
    name: String,
    policy: PagingPolicy,
    pages: Vec<StaticPage>,
    fail_all: Option<u16>,
    delay: Option<Duration>,
    delay_from: u32,
    calls: AtomicU32,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, policy: PagingPolicy) -> Self {
        Self {
            name: name.into(),
            policy,
            pages: Vec::new(),
            fail_all: None,
            delay: None,
            delay_from: 0,
            calls: AtomicU32::new(0),
        }
    }

    /// Append a page of records
    pub fn page(mut self, records: Vec<CanonicalRecord>, declared_total: Option<u64>) -> Self {
        self.pages.push(StaticPage::Page(SourcePage {
            raw_len: records.len(),
            records,
            declared_total,
        }));
        self
    }

    /// Append a page with a raw item count that differs from the mapped
    /// records, as if some items had been dropped
    pub fn raw_page(mut self, page: SourcePage) -> Self {
        self.pages.push(StaticPage::Page(page));
        self
    }

    /// Append a page that fails with the given HTTP status
    pub fn failing_page(mut self, status: u16) -> Self {
        self.pages.push(StaticPage::Fail(status));
        self
    }

    /// Fail every request with the given HTTP status
    pub fn unreachable(mut self, status: u16) -> Self {
        self.fail_all = Some(status);
        self
    }

    /// Sleep before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer the first `pages` requests at once, then sleep before each
    /// later one
    pub fn stall_after(mut self, pages: u32, delay: Duration) -> Self {
        self.delay = Some(delay);
        self.delay_from = pages;
        self
    }

    /// Number of page requests served so far
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn failure(&self, status: u16) -> SourceError {
        SourceError::Status {
            status,
            url: format!("memory://{}", self.name),
        }
    }
}

#[async_trait]
impl InscriptionSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn policy(&self) -> &PagingPolicy {
        &self.policy
    }

    async fn fetch_page(&self, _address: &str, page: u32) -> Result<SourcePage, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay.filter(|_| page >= self.delay_from) {
            tokio::time::sleep(delay).await;
        }
        if let Some(status) = self.fail_all {
            return Err(self.failure(status));
        }

        match self.pages.get(page as usize) {
            Some(StaticPage::Page(p)) => Ok(p.clone()),
            Some(StaticPage::Fail(status)) => Err(self.failure(*status)),
            None => Ok(SourcePage::default()),
        }
    }
}
