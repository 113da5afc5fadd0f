//! Core data model: discovered entities, candidate emails, persisted
//! email records and per-run reporting types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// The three independent email discovery methods.
///
/// The ordering constant encodes the system's trust ordering:
/// first-party scraping beats OSINT harvesting beats generated patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMethod {
    Static,
    Harvester,
    Scraper,
}

impl DiscoveryMethod {
    pub const ALL: [DiscoveryMethod; 3] = [
        DiscoveryMethod::Static,
        DiscoveryMethod::Harvester,
        DiscoveryMethod::Scraper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryMethod::Static => "static",
            DiscoveryMethod::Harvester => "harvester",
            DiscoveryMethod::Scraper => "scraper",
        }
    }

    /// Tie-break priority when two candidates claim equal confidence:
    /// Scraper > Harvester > Static.
    pub fn priority(&self) -> u8 {
        match self {
            DiscoveryMethod::Scraper => 2,
            DiscoveryMethod::Harvester => 1,
            DiscoveryMethod::Static => 0,
        }
    }
}

impl fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable, collision-resistant identity for a discovered business.
///
/// Derived from the lowercased display name plus the address (falling
/// back to the originating query), so the same business sighted twice by
/// overlapping queries maps to the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey(String);

impl EntityKey {
    pub fn derive(name: &str, address: Option<&str>, query: &str) -> Self {
        let scope = address.filter(|a| !a.trim().is_empty()).unwrap_or(query);
        let mut hasher = Sha256::new();
        hasher.update(name.trim().to_lowercase().as_bytes());
        hasher.update(b"|");
        hasher.update(scope.trim().to_lowercase().as_bytes());
        EntityKey(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A raw record as extracted from the search surface, before it is
/// persisted as an [`Entity`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEntityRecord {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    /// The query that surfaced this record.
    #[serde(default)]
    pub query: String,
}

/// Per-method completion flags on an entity.
///
/// Updates are monotonic unions: a flag once set is never cleared by the
/// pipeline, so overlapping query runs cannot lose progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodFlags {
    pub static_done: bool,
    pub harvester_done: bool,
    pub scraper_done: bool,
}

impl MethodFlags {
    pub fn is_done(&self, method: DiscoveryMethod) -> bool {
        match method {
            DiscoveryMethod::Static => self.static_done,
            DiscoveryMethod::Harvester => self.harvester_done,
            DiscoveryMethod::Scraper => self.scraper_done,
        }
    }

    pub fn set(&mut self, method: DiscoveryMethod) {
        match method {
            DiscoveryMethod::Static => self.static_done = true,
            DiscoveryMethod::Harvester => self.harvester_done = true,
            DiscoveryMethod::Scraper => self.scraper_done = true,
        }
    }

    /// Monotonic union with another flag set.
    pub fn union(&mut self, other: &MethodFlags) {
        self.static_done |= other.static_done;
        self.harvester_done |= other.harvester_done;
        self.scraper_done |= other.scraper_done;
    }
}

/// A discovered business, owned by the entity store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub key: EntityKey,
    pub name: String,
    pub address: Option<String>,
    pub website: Option<String>,
    pub query: String,
    pub completed: MethodFlags,
    pub created_at: DateTime<Utc>,
}

impl Entity {
    pub fn from_record(record: &RawEntityRecord) -> Self {
        let key = EntityKey::derive(&record.name, record.address.as_deref(), &record.query);
        Entity {
            key,
            name: record.name.clone(),
            address: record.address.clone(),
            website: record.website.clone(),
            query: record.query.clone(),
            completed: MethodFlags::default(),
            created_at: Utc::now(),
        }
    }
}

/// An unvalidated, source-tagged, confidence-scored email guess.
///
/// Transient: produced by one finder invocation and consumed by the
/// aggregator; never persisted in this form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEmail {
    pub entity: EntityKey,
    /// Lower-cased, trimmed address.
    pub address: String,
    pub source: DiscoveryMethod,
    /// Estimated likelihood in [0.0, 1.0] that the address is real.
    pub confidence: f64,
    /// Optional origin detail, e.g. OSINT source name or crawl depth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<String>,
}

impl CandidateEmail {
    pub fn new(
        entity: &EntityKey,
        address: impl AsRef<str>,
        source: DiscoveryMethod,
        confidence: f64,
    ) -> Self {
        CandidateEmail {
            entity: entity.clone(),
            address: address.as_ref().trim().to_lowercase(),
            source,
            confidence,
            provenance: None,
        }
    }

    pub fn with_provenance(mut self, provenance: impl Into<String>) -> Self {
        self.provenance = Some(provenance.into());
        self
    }
}

/// Deliverability state of a persisted email record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    #[default]
    Unchecked,
    Deliverable,
    Undeliverable,
    Risky,
}

/// The persisted best-known view of one email address for one entity.
///
/// At most one record exists per (entity, normalized address) pair; when
/// several sources corroborate the same address the record keeps the
/// highest confidence and its source tag, and counts the corroborating
/// methods as a secondary signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub entity: EntityKey,
    pub address: String,
    pub source: DiscoveryMethod,
    pub confidence: f64,
    /// Number of distinct methods that produced this address. Never
    /// folded into the confidence score.
    pub corroborations: u32,
    pub status: ValidationStatus,
    /// Stamped by the store on upsert; `None` on freshly merged records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Per-adapter time and result-count budget.
#[derive(Debug, Clone, Copy)]
pub struct FinderBudget {
    pub timeout: Duration,
    pub max_results: usize,
}

/// Outcome of one method's adapter dispatch for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MethodOutcome {
    /// Adapter finished within budget.
    Completed,
    /// Adapter failed after producing some candidates; partials kept.
    Partial,
    /// Method disabled by policy; no adapter call made.
    SkippedDisabled,
    /// Method is manual-only and this was an automatic run.
    SkippedManual,
    /// Budget expired; whatever was produced so far is kept.
    TimedOut,
    /// Hard failure with no salvageable candidates, retries exhausted.
    Failed,
}

impl MethodOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, MethodOutcome::Failed | MethodOutcome::TimedOut)
    }

    /// Whether the completion flag should be marked for this outcome.
    /// Skips leave the flag untouched so the method can still run later.
    pub fn marks_completion(&self) -> bool {
        !matches!(
            self,
            MethodOutcome::SkippedDisabled | MethodOutcome::SkippedManual
        )
    }
}

/// The union of candidates plus per-method outcomes for one entity.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub candidates: Vec<CandidateEmail>,
    pub outcomes: HashMap<DiscoveryMethod, MethodOutcome>,
}

/// Aggregate counters reported by a full pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub queries_completed: u64,
    pub queries_failed: u64,
    pub entities_discovered: u64,
    pub emails_found: u64,
    pub emails_validated: u64,
    pub static_failures: u64,
    pub harvester_failures: u64,
    pub scraper_failures: u64,
}

impl RunSummary {
    pub fn record_outcome(&mut self, method: DiscoveryMethod, outcome: MethodOutcome) {
        if outcome.is_failure() {
            match method {
                DiscoveryMethod::Static => self.static_failures += 1,
                DiscoveryMethod::Harvester => self.harvester_failures += 1,
                DiscoveryMethod::Scraper => self.scraper_failures += 1,
            }
        }
    }
}
