//! Loading configuration files and applying them onto a `Config`.

use super::{Config, ConfigFile};
use anyhow::Context;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Reads and parses a TOML configuration file.
pub(crate) fn load_config_file(file_path: &str) -> anyhow::Result<ConfigFile> {
    let path = Path::new(file_path);
    if !path.exists() || !path.is_file() {
        return Err(anyhow::anyhow!(
            "File not found or is not a file: {}",
            file_path
        ));
    }
    tracing::debug!("Reading config file: {}", file_path);
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", file_path))?;

    let parsed: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML configuration from {}", file_path))?;

    tracing::debug!("Parsed configuration file: {}", file_path);
    Ok(parsed)
}

/// Merges a parsed `ConfigFile` onto a mutable `Config`. Only fields
/// present in the file are touched.
pub(crate) fn apply_file_config(config: &mut Config, file: &ConfigFile) {
    // Search
    if let Some(ref templates) = file.search.query_templates {
        config.query_templates = templates.clone();
    }
    if let Some(ref countries) = file.search.countries {
        config.countries = countries.clone();
    }
    if let Some(ref states) = file.search.states {
        config.states = states.clone();
    }
    if let Some(ref cities) = file.search.cities {
        config.cities = cities.clone();
    }
    if let Some(max) = file.search.max_companies_per_query {
        config.max_companies_per_query = max;
    }
    if let Some(scrolls) = file.search.max_empty_scrolls {
        config.max_empty_scrolls = scrolls;
    }
    if let Some(secs) = file.search.scroll_wait_secs {
        config.scroll_wait = Duration::from_secs(secs);
    }
    if let Some(retries) = file.search.step_retries {
        config.step_retries = retries;
    }
    if let Some(parallel) = file.search.max_parallel_queries {
        config.max_parallel_queries = parallel;
    }

    // Finders
    if let Some(mode) = file.finders.static_mode {
        config.static_mode = mode;
    }
    if let Some(mode) = file.finders.harvester_mode {
        config.harvester_mode = mode;
    }
    if let Some(mode) = file.finders.scraper_mode {
        config.scraper_mode = mode;
    }
    if let Some(max) = file.finders.max_emails_per_entity {
        config.max_emails_per_entity = max;
    }
    if let Some(floor) = file.finders.min_confidence {
        config.min_confidence = floor;
    }
    if let Some(retries) = file.finders.orchestrator_retries {
        config.orchestrator_retries = retries;
    }
    if let Some(parallel) = file.finders.max_parallel_entities {
        config.max_parallel_entities = parallel;
    }

    // Static
    if let Some(ref patterns) = file.static_.patterns {
        if !patterns.is_empty() {
            config.static_patterns = Some(patterns.clone());
        }
    }
    if let Some(smart) = file.static_.smart_selection {
        config.static_smart_selection = smart;
    }
    if let Some(max) = file.static_.max_results {
        config.static_max_results = max;
    }
    if let Some(ref overrides) = file.static_.confidence {
        config.static_confidence_overrides = overrides.clone();
    }

    // Harvester
    if let Some(ref sources) = file.harvester.sources {
        if !sources.is_empty() {
            config.harvester_sources = sources.clone();
        }
    }
    if let Some(limit) = file.harvester.limit_per_source {
        config.harvester_limit_per_source = limit;
    }
    if let Some(secs) = file.harvester.timeout_secs {
        config.harvester_timeout = Duration::from_secs(secs);
    }
    if let Some(workers) = file.harvester.concurrency {
        config.harvester_concurrency = workers;
    }
    if let Some(confidence) = file.harvester.confidence {
        config.harvester_confidence = confidence;
    }

    // Scraper
    if let Some(depth) = file.scraper.depth {
        config.scraper_depth = depth;
    }
    if let Some(limit) = file.scraper.limit_emails {
        config.scraper_limit_emails = limit;
    }
    if let Some(limit) = file.scraper.limit_urls {
        config.scraper_limit_urls = limit;
    }
    if let Some(secs) = file.scraper.timeout_secs {
        config.scraper_timeout = Duration::from_secs(secs);
    }
    if let Some(ms) = file.scraper.delay_ms {
        config.scraper_delay = Duration::from_millis(ms);
    }
    if let Some(workers) = file.scraper.concurrency {
        config.scraper_concurrency = workers;
    }
    if let Some(confidence) = file.scraper.confidence {
        config.scraper_confidence = confidence;
    }

    // Checker
    if let Some(enabled) = file.checker.enabled {
        config.checker_enabled = enabled;
    }
    if let Some(ref endpoint) = file.checker.api_endpoint {
        if !endpoint.trim().is_empty() {
            config.checker_endpoint = endpoint.trim().to_string();
        }
    }
    if let Some(size) = file.checker.batch_size {
        config.checker_batch_size = size;
    }
    if let Some(workers) = file.checker.max_workers {
        config.checker_max_workers = workers;
    }
    if let Some(secs) = file.checker.timeout_secs {
        config.checker_timeout = Duration::from_secs(secs);
    }

    // Network
    if let Some(ref agent) = file.network.user_agent {
        config.user_agent = agent.clone();
    }
    if let Some(secs) = file.network.request_timeout_secs {
        config.request_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = file.network.retry_interval_secs {
        config.retry_interval = Duration::from_secs(secs);
    }
}
