//! Finder adapters: the pluggable email discovery methods.
//!
//! Each adapter implements [`FinderAdapter`] and pushes candidates into
//! a caller-owned [`CandidateSink`] as it finds them, so a budget
//! timeout that cancels the adapter still leaves the partial results in
//! the caller's hands.

pub mod harvester;
pub mod scraper;
pub mod static_gen;

pub use harvester::{HarvesterFinder, OsintCapability, OsintHit};
pub use scraper::{CrawlCapability, CrawlOptions, HttpCrawler, ScraperFinder};
pub use static_gen::StaticFinder;

use crate::core::error::Result;
use crate::core::models::{CandidateEmail, DiscoveryMethod, Entity, FinderBudget};
use async_trait::async_trait;
use std::sync::Mutex;

/// Bounded collection point for candidates produced by one adapter
/// invocation. Owned by the orchestrator, not the adapter, so partial
/// output survives adapter cancellation.
pub struct CandidateSink {
    cap: usize,
    items: Mutex<Vec<CandidateEmail>>,
}

impl CandidateSink {
    pub fn new(cap: usize) -> Self {
        CandidateSink {
            cap: cap.max(1),
            items: Mutex::new(Vec::new()),
        }
    }

    /// Pushes a candidate, returning `false` once the sink is full.
    /// Adapters should stop producing when this returns `false`.
    pub fn push(&self, candidate: CandidateEmail) -> bool {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        if items.len() >= self.cap {
            return false;
        }
        items.push(candidate);
        items.len() < self.cap
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.cap
    }

    /// Drains everything collected so far.
    pub fn take(&self) -> Vec<CandidateEmail> {
        std::mem::take(&mut *self.items.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

/// One email discovery method.
#[async_trait]
pub trait FinderAdapter: Send + Sync {
    fn method(&self) -> DiscoveryMethod;

    /// Discovers candidates for `entity`, pushing into `sink` as they
    /// are found. Returning `Ok` means the method ran to its natural
    /// end; an error means it was cut short, with whatever reached the
    /// sink still valid.
    async fn find(&self, entity: &Entity, budget: &FinderBudget, sink: &CandidateSink)
        -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::EntityKey;

    #[test]
    fn sink_enforces_cap() {
        let key = EntityKey::derive("X", None, "q");
        let sink = CandidateSink::new(2);
        assert!(sink.push(CandidateEmail::new(&key, "a@x.com", DiscoveryMethod::Static, 0.5)));
        assert!(!sink.push(CandidateEmail::new(&key, "b@x.com", DiscoveryMethod::Static, 0.5)));
        assert!(!sink.push(CandidateEmail::new(&key, "c@x.com", DiscoveryMethod::Static, 0.5)));
        assert_eq!(sink.len(), 2);
        assert!(sink.is_full());

        let drained = sink.take();
        assert_eq!(drained.len(), 2);
        assert!(sink.is_empty());
    }
}
