//! Validation of the final `Config` before a run starts.

use super::{Config, ConfigResult};
use crate::core::error::AppError;
use crate::core::policy::MethodMode;

/// Validates the configuration after loading and overrides.
///
/// Clamps recoverable values with a warning; returns a fatal
/// `AppError::Config` for states that cannot be attributed to any
/// single entity or query once the run is underway.
pub(crate) fn validate_config(config: &mut Config) -> ConfigResult<()> {
    if config.max_companies_per_query == 0 {
        tracing::warn!("max_companies_per_query was 0. Setting to 1.");
        config.max_companies_per_query = 1;
    }
    if config.max_parallel_queries == 0 {
        tracing::warn!("max_parallel_queries was 0. Setting to 1.");
        config.max_parallel_queries = 1;
    }
    if config.max_emails_per_entity == 0 {
        tracing::warn!("max_emails_per_entity was 0. Setting to 1.");
        config.max_emails_per_entity = 1;
    }
    if config.max_parallel_entities == 0 {
        tracing::warn!("max_parallel_entities was 0. Setting to 1.");
        config.max_parallel_entities = 1;
    }
    if !(0.0..=1.0).contains(&config.min_confidence) {
        tracing::warn!(
            "min_confidence ({}) outside [0, 1]. Clamping.",
            config.min_confidence
        );
        config.min_confidence = config.min_confidence.clamp(0.0, 1.0);
    }

    for (name, value) in [
        ("harvester.confidence", config.harvester_confidence),
        ("scraper.confidence", config.scraper_confidence),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(AppError::Config(format!(
                "{} must be within [0.0, 1.0], got {}",
                name, value
            )));
        }
    }
    for (name, value) in config.static_confidence_overrides.iter() {
        if !(0.0..=1.0).contains(value) {
            return Err(AppError::Config(format!(
                "static confidence override for '{}' must be within [0.0, 1.0], got {}",
                name, value
            )));
        }
    }

    // A method marked available must have a usable adapter configuration;
    // anything else would fail mid-run without an attributable entity.
    if config.harvester_mode != MethodMode::Disabled && config.harvester_sources.is_empty() {
        return Err(AppError::Config(
            "Harvester is enabled but no OSINT sources are configured.".to_string(),
        ));
    }
    if config.scraper_mode != MethodMode::Disabled {
        if config.scraper_limit_urls == 0 {
            return Err(AppError::Config(
                "Scraper is enabled but limit_urls is 0.".to_string(),
            ));
        }
        if config.scraper_depth == 0 || config.scraper_depth < -1 {
            return Err(AppError::Config(format!(
                "Scraper depth must be >= 1 or -1 for unlimited, got {}",
                config.scraper_depth
            )));
        }
    }
    if config.checker_enabled && config.checker_endpoint.trim().is_empty() {
        return Err(AppError::Config(
            "Inline validation is enabled but no checker endpoint is configured.".to_string(),
        ));
    }
    if config.checker_enabled && config.checker_batch_size == 0 {
        tracing::warn!("checker batch_size was 0. Setting to 1.");
        config.checker_batch_size = 1;
    }
    if config.checker_enabled && config.checker_max_workers == 0 {
        tracing::warn!("checker max_workers was 0. Setting to 1.");
        config.checker_max_workers = 1;
    }

    Ok(())
}
