//! Read-only per-run discovery policy, derived from configuration.

use crate::core::models::{DiscoveryMethod, FinderBudget};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Three-state activation policy for one discovery method.
///
/// Modelled as a closed enum rather than enabled/run-inline boolean
/// pairs so invalid combinations cannot be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodMode {
    /// Never invoked, not even on request.
    Disabled,
    /// Available but only via the explicit out-of-band invocation path;
    /// automatic runs skip it.
    #[serde(rename = "manual")]
    ManualOnly,
    /// Runs automatically as part of the main discovery run.
    #[serde(rename = "auto")]
    AutoInline,
}

impl Default for MethodMode {
    fn default() -> Self {
        MethodMode::Disabled
    }
}

/// Harvester adapter settings.
#[derive(Debug, Clone)]
pub struct HarvesterSettings {
    pub sources: Vec<String>,
    pub limit_per_source: usize,
    pub timeout: Duration,
    pub concurrency: usize,
    pub confidence: f64,
}

/// Scraper adapter settings.
#[derive(Debug, Clone)]
pub struct ScraperSettings {
    /// Crawl depth; 1 = homepage only, -1 = unlimited (the URL cap
    /// bounds the crawl instead).
    pub depth: i32,
    pub limit_emails: usize,
    pub limit_urls: usize,
    pub timeout: Duration,
    pub delay: Duration,
    pub concurrency: usize,
    pub confidence: f64,
}

/// Immutable policy governing one run. Passed explicitly into every
/// component call; components never read ambient configuration.
#[derive(Debug, Clone)]
pub struct DiscoveryPolicy {
    pub static_mode: MethodMode,
    pub harvester_mode: MethodMode,
    pub scraper_mode: MethodMode,

    pub max_companies_per_query: usize,
    pub max_emails_per_entity: usize,
    pub min_confidence: f64,
    /// Bounded retries the orchestrator grants a hard-failing adapter.
    pub orchestrator_retries: u32,
    /// Whether aggregated emails are routed to the validation stage.
    pub validate_inline: bool,

    pub static_max_results: usize,
    pub static_timeout: Duration,
    pub harvester: HarvesterSettings,
    pub scraper: ScraperSettings,
}

impl DiscoveryPolicy {
    pub fn mode(&self, method: DiscoveryMethod) -> MethodMode {
        match method {
            DiscoveryMethod::Static => self.static_mode,
            DiscoveryMethod::Harvester => self.harvester_mode,
            DiscoveryMethod::Scraper => self.scraper_mode,
        }
    }

    pub fn budget(&self, method: DiscoveryMethod) -> FinderBudget {
        match method {
            DiscoveryMethod::Static => FinderBudget {
                timeout: self.static_timeout,
                max_results: self.static_max_results,
            },
            DiscoveryMethod::Harvester => FinderBudget {
                timeout: self.harvester.timeout,
                max_results: self
                    .harvester
                    .limit_per_source
                    .saturating_mul(self.harvester.sources.len().max(1)),
            },
            DiscoveryMethod::Scraper => FinderBudget {
                timeout: self.scraper.timeout,
                max_results: self.scraper.limit_emails,
            },
        }
    }

    pub fn concurrency(&self, method: DiscoveryMethod) -> usize {
        match method {
            // Static is pure CPU work; a wide pool keeps the accounting
            // uniform without ever being the bottleneck.
            DiscoveryMethod::Static => 64,
            DiscoveryMethod::Harvester => self.harvester.concurrency.max(1),
            DiscoveryMethod::Scraper => self.scraper.concurrency.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_mode_parses_from_config_strings() {
        assert_eq!(
            toml::from_str::<std::collections::HashMap<String, MethodMode>>("m = \"auto\"")
                .unwrap()["m"],
            MethodMode::AutoInline
        );
        assert_eq!(
            toml::from_str::<std::collections::HashMap<String, MethodMode>>("m = \"manual\"")
                .unwrap()["m"],
            MethodMode::ManualOnly
        );
        assert_eq!(
            toml::from_str::<std::collections::HashMap<String, MethodMode>>("m = \"disabled\"")
                .unwrap()["m"],
            MethodMode::Disabled
        );
    }
}
