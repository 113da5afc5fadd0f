//! Scroll-and-extract pagination over a search surface.

use crate::core::error::{AppError, Result};
use crate::core::models::{EntityKey, RawEntityRecord};
use crate::search::clean::{clean_phone, clean_text, clean_website};
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;

/// One extraction step against the surface: the records currently
/// visible and whether the surface reports more content below.
#[derive(Debug, Clone, Default)]
pub struct PageStep {
    pub records: Vec<RawEntityRecord>,
    pub has_more: bool,
}

/// A session on a search surface for one query. Implementations scroll
/// the result list one notch and extract whatever is visible.
#[async_trait]
pub trait ExtractionCapability: Send {
    async fn step(&mut self) -> Result<PageStep>;
}

#[derive(Debug, Clone, Copy)]
pub struct PaginatorSettings {
    pub max_records: usize,
    /// Consecutive steps yielding no new records before giving up,
    /// regardless of what `has_more` claims.
    pub max_empty_steps: u32,
    pub settle_wait: Duration,
    pub step_retries: u32,
    pub retry_interval: Duration,
}

/// Drives an [`ExtractionCapability`] until the query is exhausted,
/// returning cleaned, deduplicated records.
pub struct SearchPaginator {
    settings: PaginatorSettings,
}

impl SearchPaginator {
    pub fn new(settings: PaginatorSettings) -> Self {
        SearchPaginator { settings }
    }

    /// Collects records for `query`.
    ///
    /// Termination: the record cap is reached, the surface reports no
    /// more content, or `max_empty_steps` consecutive steps add nothing
    /// new. A step whose retries are exhausted ends the query but keeps
    /// everything collected so far.
    pub async fn collect(
        &self,
        query: &str,
        capability: &mut dyn ExtractionCapability,
    ) -> Vec<RawEntityRecord> {
        let mut seen: HashSet<EntityKey> = HashSet::new();
        let mut collected: Vec<RawEntityRecord> = Vec::new();
        let mut empty_steps: u32 = 0;
        let mut step_index: u32 = 0;

        loop {
            step_index += 1;
            let step = match self.step_with_retry(capability).await {
                Ok(step) => step,
                Err(e) => {
                    tracing::warn!(target: "search",
                        "[{}] Step {} failed permanently: {}. Keeping {} records.",
                        query, step_index, e, collected.len());
                    break;
                }
            };

            let mut added = 0usize;
            for raw in step.records {
                if collected.len() >= self.settings.max_records {
                    break;
                }
                if let Some(record) = self.sanitize(query, raw) {
                    let key = EntityKey::derive(&record.name, record.address.as_deref(), query);
                    if seen.insert(key) {
                        collected.push(record);
                        added += 1;
                    }
                }
            }

            if collected.len() >= self.settings.max_records {
                tracing::debug!(target: "search",
                    "[{}] Reached record cap ({}) after {} steps.",
                    query, self.settings.max_records, step_index);
                break;
            }
            if added == 0 {
                empty_steps += 1;
                if empty_steps >= self.settings.max_empty_steps {
                    tracing::debug!(target: "search",
                        "[{}] {} consecutive empty steps. Query exhausted.",
                        query, empty_steps);
                    break;
                }
            } else {
                empty_steps = 0;
            }
            if !step.has_more {
                tracing::debug!(target: "search", "[{}] Surface reports end of results.", query);
                break;
            }

            tokio::time::sleep(self.settings.settle_wait).await;
        }

        tracing::info!(target: "search",
            "[{}] Collected {} records in {} steps.", query, collected.len(), step_index);
        collected
    }

    /// One extraction step with the same budget semantics as
    /// [`crate::utils::retry`], inlined because each attempt needs a
    /// fresh mutable borrow of the session.
    async fn step_with_retry(
        &self,
        capability: &mut dyn ExtractionCapability,
    ) -> Result<PageStep> {
        let max_attempts = self.settings.step_retries.max(1);
        let mut last_error: Option<AppError> = None;

        for attempt in 1..=max_attempts {
            match capability.step().await {
                Ok(step) => return Ok(step),
                Err(AppError::Structural(msg)) => {
                    // Malformed extraction output is an empty step, not
                    // the end of the query.
                    tracing::warn!(target: "search",
                        "Step returned malformed data, treating as empty: {}", msg);
                    return Ok(PageStep {
                        records: Vec::new(),
                        has_more: true,
                    });
                }
                Err(e @ AppError::Config(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(target: "search",
                        "Step attempt {}/{} failed: {}", attempt, max_attempts, e);
                    last_error = Some(e);
                    if attempt < max_attempts {
                        tokio::time::sleep(self.settings.retry_interval).await;
                    }
                }
            }
        }

        let detail = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts executed".to_string());
        Err(AppError::Exhausted(format!(
            "scroll step: gave up after {} attempts ({})",
            max_attempts, detail
        )))
    }

    fn sanitize(&self, query: &str, raw: RawEntityRecord) -> Option<RawEntityRecord> {
        let name = clean_text(&raw.name);
        if name.is_empty() {
            return None;
        }
        Some(RawEntityRecord {
            name,
            address: raw
                .address
                .as_deref()
                .map(clean_text)
                .filter(|a| !a.is_empty()),
            phone: raw.phone.as_deref().and_then(clean_phone),
            website: raw.website.as_deref().and_then(clean_website),
            query: query.to_string(),
        })
    }
}
