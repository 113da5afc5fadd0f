//! Configuration types for the geomail pipeline.
//!
//! `Config` is the fully resolved, validated runtime configuration.
//! `ConfigFile` mirrors the TOML schema with everything optional so a
//! file only needs to state what it changes. Use [`ConfigBuilder`] to
//! construct a `Config`.

mod builder;
mod loading;
mod validation;

pub use builder::ConfigBuilder;

use crate::core::error::Result;
use crate::core::policy::{
    DiscoveryPolicy, HarvesterSettings, MethodMode, ScraperSettings,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

pub(crate) static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$")
        .expect("email regex must compile")
});

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Search
    pub query_templates: Vec<String>,
    pub countries: Vec<String>,
    pub states: Vec<String>,
    pub cities: Vec<String>,
    pub max_companies_per_query: usize,
    /// Consecutive scroll steps yielding no new records before a query
    /// is considered exhausted.
    pub max_empty_scrolls: u32,
    pub scroll_wait: Duration,
    pub step_retries: u32,
    pub max_parallel_queries: usize,

    // Finder activation and aggregation
    pub static_mode: MethodMode,
    pub harvester_mode: MethodMode,
    pub scraper_mode: MethodMode,
    pub max_emails_per_entity: usize,
    pub min_confidence: f64,
    pub orchestrator_retries: u32,
    /// Entities whose discovery runs concurrently; their adapter calls
    /// still compete for the shared per-method pools.
    pub max_parallel_entities: usize,

    // Static finder
    pub static_patterns: Option<Vec<String>>,
    pub static_smart_selection: bool,
    pub static_max_results: usize,
    pub static_confidence_overrides: HashMap<String, f64>,

    // Harvester finder
    pub harvester_sources: Vec<String>,
    pub harvester_limit_per_source: usize,
    pub harvester_timeout: Duration,
    pub harvester_concurrency: usize,
    pub harvester_confidence: f64,

    // Scraper finder
    pub scraper_depth: i32,
    pub scraper_limit_emails: usize,
    pub scraper_limit_urls: usize,
    pub scraper_timeout: Duration,
    pub scraper_delay: Duration,
    pub scraper_concurrency: usize,
    pub scraper_confidence: f64,

    // Validation (checker)
    pub checker_enabled: bool,
    pub checker_endpoint: String,
    pub checker_batch_size: usize,
    pub checker_max_workers: usize,
    pub checker_timeout: Duration,

    // Network
    pub user_agent: String,
    pub request_timeout: Duration,
    pub retry_interval: Duration,

    /// Path the base configuration was loaded from, if any.
    pub loaded_config_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            query_templates: Vec::new(),
            countries: Vec::new(),
            states: Vec::new(),
            cities: Vec::new(),
            max_companies_per_query: 25,
            max_empty_scrolls: 2,
            scroll_wait: Duration::from_secs(2),
            step_retries: 3,
            max_parallel_queries: 1,

            static_mode: MethodMode::AutoInline,
            harvester_mode: MethodMode::Disabled,
            scraper_mode: MethodMode::Disabled,
            max_emails_per_entity: 25,
            min_confidence: 0.5,
            orchestrator_retries: 1,
            max_parallel_entities: 8,

            static_patterns: None,
            static_smart_selection: true,
            static_max_results: 8,
            static_confidence_overrides: HashMap::new(),

            harvester_sources: vec!["bing".to_string(), "duckduckgo".to_string()],
            harvester_limit_per_source: 100,
            harvester_timeout: Duration::from_secs(300),
            harvester_concurrency: 2,
            harvester_confidence: 0.8,

            scraper_depth: 1,
            scraper_limit_emails: 50,
            scraper_limit_urls: 25,
            scraper_timeout: Duration::from_secs(10),
            scraper_delay: Duration::from_millis(1000),
            scraper_concurrency: 2,
            scraper_confidence: 0.9,

            checker_enabled: false,
            checker_endpoint: "http://localhost:8080/v0/check_email".to_string(),
            checker_batch_size: 200,
            checker_max_workers: 10,
            checker_timeout: Duration::from_secs(3600),

            user_agent: format!("geomail/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: Duration::from_secs(10),
            retry_interval: Duration::from_secs(2),

            loaded_config_path: None,
        }
    }
}

impl Config {
    /// Derives the immutable per-run policy from this configuration.
    pub fn policy(&self) -> DiscoveryPolicy {
        DiscoveryPolicy {
            static_mode: self.static_mode,
            harvester_mode: self.harvester_mode,
            scraper_mode: self.scraper_mode,
            max_companies_per_query: self.max_companies_per_query,
            max_emails_per_entity: self.max_emails_per_entity,
            min_confidence: self.min_confidence,
            orchestrator_retries: self.orchestrator_retries,
            validate_inline: self.checker_enabled,
            static_max_results: self.static_max_results,
            // Static generation is pure and effectively instant; the
            // budget exists so all three methods share one dispatch path.
            static_timeout: Duration::from_secs(5),
            harvester: HarvesterSettings {
                sources: self.harvester_sources.clone(),
                limit_per_source: self.harvester_limit_per_source,
                timeout: self.harvester_timeout,
                concurrency: self.harvester_concurrency,
                confidence: self.harvester_confidence,
            },
            scraper: ScraperSettings {
                depth: self.scraper_depth,
                limit_emails: self.scraper_limit_emails,
                limit_urls: self.scraper_limit_urls,
                timeout: self.scraper_timeout,
                delay: self.scraper_delay,
                concurrency: self.scraper_concurrency,
                confidence: self.scraper_confidence,
            },
        }
    }

    pub fn is_valid_email(&self, address: &str) -> bool {
        EMAIL_REGEX.is_match(address.trim())
    }
}

pub(crate) type ConfigResult<T> = Result<T>;

/// TOML file schema. Every field is optional; absent fields keep their
/// defaults or whatever an earlier layer set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub search: SearchSection,
    #[serde(default)]
    pub finders: FindersSection,
    #[serde(default, rename = "static")]
    pub static_: StaticSection,
    #[serde(default)]
    pub harvester: HarvesterSection,
    #[serde(default)]
    pub scraper: ScraperSection,
    #[serde(default)]
    pub checker: CheckerSection,
    #[serde(default)]
    pub network: NetworkSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchSection {
    pub query_templates: Option<Vec<String>>,
    pub countries: Option<Vec<String>>,
    pub states: Option<Vec<String>>,
    pub cities: Option<Vec<String>>,
    pub max_companies_per_query: Option<usize>,
    pub max_empty_scrolls: Option<u32>,
    pub scroll_wait_secs: Option<u64>,
    pub step_retries: Option<u32>,
    pub max_parallel_queries: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FindersSection {
    pub static_mode: Option<MethodMode>,
    pub harvester_mode: Option<MethodMode>,
    pub scraper_mode: Option<MethodMode>,
    pub max_emails_per_entity: Option<usize>,
    pub min_confidence: Option<f64>,
    pub orchestrator_retries: Option<u32>,
    pub max_parallel_entities: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticSection {
    pub patterns: Option<Vec<String>>,
    pub smart_selection: Option<bool>,
    pub max_results: Option<usize>,
    /// Per-pattern confidence overrides, e.g. `info = 0.97`.
    pub confidence: Option<HashMap<String, f64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarvesterSection {
    pub sources: Option<Vec<String>>,
    pub limit_per_source: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub concurrency: Option<usize>,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScraperSection {
    pub depth: Option<i32>,
    pub limit_emails: Option<usize>,
    pub limit_urls: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub delay_ms: Option<u64>,
    pub concurrency: Option<usize>,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckerSection {
    pub enabled: Option<bool>,
    pub api_endpoint: Option<String>,
    pub batch_size: Option<usize>,
    pub max_workers: Option<usize>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkSection {
    pub user_agent: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub retry_interval_secs: Option<u64>,
}
