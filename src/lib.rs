//! # Geomail Core Library
//!
//! Discovery and aggregation pipeline for business contact data: runs
//! geographic search queries against a scrollable search surface,
//! discovers email addresses for each business through pluggable finder
//! methods, merges the candidates into confidence-ranked records, and
//! optionally validates their deliverability.
//!
//! Designed to be used either directly as a library or via the
//! `geomail` command-line tool (which uses this library).

mod core;
mod finders;
mod search;
mod store;
mod utils;
mod validation;

pub use crate::core::aggregate::merge;
pub use crate::core::config::{Config, ConfigBuilder, ConfigFile};
pub use crate::core::error::{AppError, Result};
pub use crate::core::models::{
    CandidateEmail, Discovery, DiscoveryMethod, EmailRecord, Entity, EntityKey, FinderBudget,
    MethodFlags, MethodOutcome, RawEntityRecord, RunSummary, ValidationStatus,
};
pub use crate::core::orchestrator::{DiscoveryOrchestrator, OrchestratorBuilder};
pub use crate::core::pipeline::{Pipeline, SearchSurface};
pub use crate::core::policy::{DiscoveryPolicy, HarvesterSettings, MethodMode, ScraperSettings};
pub use crate::finders::static_gen::StaticFinderSettings;
pub use crate::finders::{
    CandidateSink, CrawlCapability, CrawlOptions, FinderAdapter, HarvesterFinder, HttpCrawler,
    OsintCapability, OsintHit, ScraperFinder, StaticFinder,
};
pub use crate::search::{ExtractionCapability, PageStep, PaginatorSettings, QueryGenerator, SearchPaginator};
pub use crate::store::{EntityStore, MemoryStore};
pub use crate::validation::{
    CheckStatus, HttpCheckClient, ValidationCapability, ValidationGateway,
    ValidationGatewaySettings, Verdict,
};

use std::sync::Arc;

/// Wires a [`Pipeline`] from configuration with the stock adapters:
/// pattern generation, an HTTP crawler for the scraper method, and the
/// HTTP checking client when inline validation is enabled.
///
/// The harvester method needs an external OSINT backend, so enabling it
/// here is a configuration error; register your own
/// [`OsintCapability`]-backed adapter through
/// [`DiscoveryOrchestrator::builder`] instead.
pub fn build_pipeline(config: Config, store: Arc<dyn EntityStore>) -> Result<Pipeline> {
    if config.harvester_mode != MethodMode::Disabled {
        return Err(AppError::Config(
            "The harvester method requires an external OSINT backend; wire the \
             orchestrator manually to use it"
                .to_string(),
        ));
    }

    let policy = config.policy();
    let mut builder = DiscoveryOrchestrator::builder().adapter(Arc::new(StaticFinder::new(
        StaticFinderSettings {
            patterns: config.static_patterns.clone(),
            smart_selection: config.static_smart_selection,
            min_confidence: config.min_confidence,
            confidence_overrides: config.static_confidence_overrides.clone(),
        },
    )));
    if config.scraper_mode != MethodMode::Disabled {
        let crawler = HttpCrawler::new(&config.user_agent, config.request_timeout)?;
        builder = builder.adapter(Arc::new(ScraperFinder::new(
            Arc::new(crawler),
            policy.scraper.clone(),
        )));
    }
    let orchestrator = Arc::new(builder.build(policy)?);

    let gateway = if config.checker_enabled {
        let client = HttpCheckClient::new(
            config.checker_endpoint.clone(),
            &config.user_agent,
            config.request_timeout,
        )?;
        Some(Arc::new(ValidationGateway::new(
            Arc::new(client),
            ValidationGatewaySettings {
                batch_size: config.checker_batch_size,
                max_workers: config.checker_max_workers,
                call_timeout: config.checker_timeout,
            },
        )))
    } else {
        None
    };

    Pipeline::new(config, store, orchestrator, gateway)
}
