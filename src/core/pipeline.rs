//! The full discovery and aggregation pipeline.
//!
//! A run walks four stages: query expansion and search, per-entity
//! email discovery, confidence-ranked aggregation into the store, and
//! optional deliverability validation. Only configuration errors abort
//! a run; everything else is logged, counted and survived.

use crate::core::aggregate::merge;
use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use crate::core::models::{Entity, RawEntityRecord, RunSummary, ValidationStatus};
use crate::core::orchestrator::DiscoveryOrchestrator;
use crate::search::paginator::{ExtractionCapability, PaginatorSettings, SearchPaginator};
use crate::search::query::QueryGenerator;
use crate::store::EntityStore;
use crate::utils::retry::{retry_with_budget, RetryBudget};
use crate::validation::ValidationGateway;
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;

/// A search surface that can be opened once per query, yielding a
/// scrollable extraction session.
#[async_trait]
pub trait SearchSurface: Send + Sync {
    async fn open(&self, query: &str) -> Result<Box<dyn ExtractionCapability>>;
}

pub struct Pipeline {
    config: Config,
    store: Arc<dyn EntityStore>,
    orchestrator: Arc<DiscoveryOrchestrator>,
    gateway: Option<Arc<ValidationGateway>>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        store: Arc<dyn EntityStore>,
        orchestrator: Arc<DiscoveryOrchestrator>,
        gateway: Option<Arc<ValidationGateway>>,
    ) -> Result<Self> {
        if config.checker_enabled && gateway.is_none() {
            return Err(AppError::Config(
                "Inline validation is enabled but no validation gateway was provided".to_string(),
            ));
        }
        Ok(Pipeline {
            config,
            store,
            orchestrator,
            gateway,
        })
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn orchestrator(&self) -> &Arc<DiscoveryOrchestrator> {
        &self.orchestrator
    }

    /// Full run against a live search surface.
    pub async fn run(&self, surface: &dyn SearchSurface) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        self.search_stage(surface, &mut summary).await?;
        self.discovery_stage(&mut summary).await?;
        self.validation_stage(&mut summary).await?;
        self.log_summary(&summary);
        Ok(summary)
    }

    /// Run over pre-collected records, skipping the search stage.
    pub async fn run_records(&self, records: Vec<RawEntityRecord>) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for record in &records {
            if record.name.trim().is_empty() {
                continue;
            }
            self.store.upsert_entity(Entity::from_record(record))?;
            summary.entities_discovered += 1;
        }
        self.discovery_stage(&mut summary).await?;
        self.validation_stage(&mut summary).await?;
        self.log_summary(&summary);
        Ok(summary)
    }

    async fn search_stage(
        &self,
        surface: &dyn SearchSurface,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let queries = QueryGenerator::new(
            self.config.query_templates.clone(),
            self.config.countries.clone(),
            self.config.states.clone(),
            self.config.cities.clone(),
        )
        .generate();
        if queries.is_empty() {
            return Err(AppError::Config(
                "No queries to run: configure query_templates and their geographies".to_string(),
            ));
        }
        tracing::info!(target: "pipeline", "Running {} queries.", queries.len());

        let paginator = SearchPaginator::new(PaginatorSettings {
            max_records: self.config.max_companies_per_query,
            max_empty_steps: self.config.max_empty_scrolls,
            settle_wait: self.config.scroll_wait,
            step_retries: self.config.step_retries,
            retry_interval: self.config.retry_interval,
        });

        let open_budget = RetryBudget::new(self.config.step_retries, self.config.retry_interval);
        let mut pending = queries.into_iter();
        let mut in_flight = FuturesUnordered::new();
        let run_query = |query: String| {
            let paginator = &paginator;
            async move {
                let q = query.as_str();
                match retry_with_budget(&open_budget, "search.open", || surface.open(q)).await {
                    Ok(mut session) => {
                        let records = paginator.collect(&query, session.as_mut()).await;
                        Ok(records)
                    }
                    Err(e) => Err((query, e)),
                }
            }
        };

        for query in pending.by_ref().take(self.config.max_parallel_queries) {
            in_flight.push(run_query(query));
        }
        while let Some(result) = in_flight.next().await {
            if let Some(next) = pending.next() {
                in_flight.push(run_query(next));
            }
            match result {
                Ok(records) => {
                    summary.queries_completed += 1;
                    for record in &records {
                        self.store.upsert_entity(Entity::from_record(record))?;
                    }
                    summary.entities_discovered += records.len() as u64;
                }
                Err((query, e)) => {
                    tracing::error!(target: "pipeline",
                        "[{}] Query failed to open a search session: {}", query, e);
                    summary.queries_failed += 1;
                }
            }
        }
        Ok(())
    }

    async fn discovery_stage(&self, summary: &mut RunSummary) -> Result<()> {
        let policy = self.orchestrator.policy().clone();
        let entities = self.store.entities()?;
        tracing::info!(target: "pipeline",
            "Discovering emails for {} entities.", entities.len());

        // Entities run under their own fan-out window; the adapter
        // calls they spawn still compete for the shared per-method
        // pools inside the orchestrator.
        let orchestrator = &self.orchestrator;
        let run_entity = |entity: Entity| async move {
            let discovery = orchestrator.discover(&entity).await;
            (entity, discovery)
        };

        let mut pending = entities.into_iter();
        let mut in_flight = FuturesUnordered::new();
        for entity in pending.by_ref().take(self.config.max_parallel_entities.max(1)) {
            in_flight.push(run_entity(entity));
        }
        while let Some((entity, discovery)) = in_flight.next().await {
            if let Some(next) = pending.next() {
                in_flight.push(run_entity(next));
            }
            for (method, outcome) in &discovery.outcomes {
                summary.record_outcome(*method, *outcome);
                if outcome.marks_completion() {
                    self.store.mark_method(&entity.key, *method)?;
                }
            }
            if discovery.candidates.is_empty() {
                continue;
            }
            let records = merge(
                &entity.key,
                &discovery.candidates,
                policy.max_emails_per_entity,
                policy.min_confidence,
            );
            summary.emails_found += records.len() as u64;
            self.store.upsert_email_records(&entity.key, records)?;
        }
        Ok(())
    }

    async fn validation_stage(&self, summary: &mut RunSummary) -> Result<()> {
        let gateway = match &self.gateway {
            Some(gateway) if self.orchestrator.policy().validate_inline => gateway,
            _ => return Ok(()),
        };
        let pending = self.store.emails_pending_validation()?;
        if pending.is_empty() {
            return Ok(());
        }
        tracing::info!(target: "pipeline",
            "Validating {} email records.", pending.len());
        for verdict in gateway.validate(pending).await {
            if verdict.status == ValidationStatus::Unchecked {
                continue;
            }
            self.store
                .set_validation_status(&verdict.entity, &verdict.address, verdict.status)?;
            summary.emails_validated += 1;
        }
        Ok(())
    }

    fn log_summary(&self, summary: &RunSummary) {
        tracing::info!(target: "pipeline",
            "Run finished: {} queries ok, {} failed, {} entities, {} emails found, {} validated.",
            summary.queries_completed,
            summary.queries_failed,
            summary.entities_discovered,
            summary.emails_found,
            summary.emails_validated,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::DiscoveryMethod;
    use crate::core::orchestrator::DiscoveryOrchestrator;
    use crate::core::policy::MethodMode;
    use crate::finders::static_gen::{StaticFinder, StaticFinderSettings};
    use crate::search::paginator::PageStep;
    use crate::store::MemoryStore;
    use std::time::Duration;

    struct FixedSurface {
        records: Vec<RawEntityRecord>,
    }

    struct FixedSession {
        records: Vec<RawEntityRecord>,
        served: bool,
    }

    #[async_trait]
    impl ExtractionCapability for FixedSession {
        async fn step(&mut self) -> Result<PageStep> {
            if self.served {
                return Ok(PageStep::default());
            }
            self.served = true;
            Ok(PageStep {
                records: self.records.clone(),
                has_more: false,
            })
        }
    }

    #[async_trait]
    impl SearchSurface for FixedSurface {
        async fn open(&self, _query: &str) -> Result<Box<dyn ExtractionCapability>> {
            Ok(Box::new(FixedSession {
                records: self.records.clone(),
                served: false,
            }))
        }
    }

    fn record(name: &str, website: &str) -> RawEntityRecord {
        RawEntityRecord {
            name: name.to_string(),
            address: Some(format!("{} HQ", name)),
            phone: None,
            website: Some(website.to_string()),
            query: String::new(),
        }
    }

    fn test_config() -> Config {
        Config {
            query_templates: vec!["tech companies in ${city}".to_string()],
            cities: vec!["Austin".to_string()],
            scroll_wait: Duration::from_millis(1),
            retry_interval: Duration::from_millis(1),
            static_mode: MethodMode::AutoInline,
            min_confidence: 0.85,
            ..Default::default()
        }
    }

    fn pipeline(config: Config, store: Arc<MemoryStore>) -> Pipeline {
        let orchestrator = DiscoveryOrchestrator::builder()
            .adapter(Arc::new(StaticFinder::new(StaticFinderSettings::default())))
            .build(config.policy())
            .unwrap();
        Pipeline::new(config, store, Arc::new(orchestrator), None).unwrap()
    }

    #[tokio::test]
    async fn full_run_searches_discovers_and_aggregates() {
        let store = Arc::new(MemoryStore::new());
        let p = pipeline(test_config(), store.clone());
        let surface = FixedSurface {
            records: vec![
                record("TechCorp Software", "https://techcorp.io"),
                record("DataWorks Inc", "https://dataworks.com"),
            ],
        };

        let summary = p.run(&surface).await.unwrap();
        assert_eq!(summary.queries_completed, 1);
        assert_eq!(summary.queries_failed, 0);
        assert_eq!(summary.entities_discovered, 2);
        assert_eq!(store.entity_count().unwrap(), 2);
        assert!(summary.emails_found > 0);

        // Above the 0.85 floor only the info/contact prefixes survive.
        for entity in store.entities().unwrap() {
            let records = store.email_records(&entity.key).unwrap();
            assert!(!records.is_empty());
            assert!(records.iter().all(|r| r.confidence >= 0.85));
            assert!(records
                .iter()
                .all(|r| r.source == DiscoveryMethod::Static));
            assert!(entity.completed.is_done(DiscoveryMethod::Static));
        }
    }

    #[tokio::test]
    async fn second_run_skips_completed_methods() {
        let store = Arc::new(MemoryStore::new());
        let p = pipeline(test_config(), store.clone());
        let surface = FixedSurface {
            records: vec![record("TechCorp Software", "https://techcorp.io")],
        };

        p.run(&surface).await.unwrap();
        let first = store.email_records(&store.entities().unwrap()[0].key).unwrap();

        let summary = p.run(&surface).await.unwrap();
        // Static already completed for the entity; no new emails found.
        assert_eq!(summary.emails_found, 0);
        let second = store.email_records(&store.entities().unwrap()[0].key).unwrap();
        assert_eq!(first.len(), second.len());
    }

    #[tokio::test]
    async fn run_records_skips_search_stage() {
        let store = Arc::new(MemoryStore::new());
        let p = pipeline(test_config(), store.clone());
        let summary = p
            .run_records(vec![record("TechCorp Software", "https://techcorp.io")])
            .await
            .unwrap();
        assert_eq!(summary.queries_completed, 0);
        assert_eq!(summary.entities_discovered, 1);
        assert!(summary.emails_found > 0);
    }

    #[tokio::test]
    async fn missing_queries_is_a_config_error() {
        let store = Arc::new(MemoryStore::new());
        let config = Config {
            query_templates: Vec::new(),
            ..test_config()
        };
        let p = pipeline(config, store);
        let surface = FixedSurface { records: vec![] };
        assert!(matches!(p.run(&surface).await, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn enabled_checker_without_gateway_is_a_config_error() {
        let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
        let config = Config {
            checker_enabled: true,
            ..test_config()
        };
        let orchestrator = DiscoveryOrchestrator::builder()
            .adapter(Arc::new(StaticFinder::new(StaticFinderSettings::default())))
            .build(config.policy())
            .unwrap();
        let result = Pipeline::new(config, store, Arc::new(orchestrator), None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn discovery_runs_entities_concurrently() {
        use crate::core::models::FinderBudget;
        use crate::finders::{CandidateSink, FinderAdapter};
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct GaugeFinder {
            current: AtomicUsize,
            peak: AtomicUsize,
        }

        #[async_trait]
        impl FinderAdapter for GaugeFinder {
            fn method(&self) -> DiscoveryMethod {
                DiscoveryMethod::Static
            }
            async fn find(
                &self,
                _entity: &Entity,
                _budget: &FinderBudget,
                _sink: &CandidateSink,
            ) -> Result<()> {
                let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                self.current.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let gauge = Arc::new(GaugeFinder {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let store = Arc::new(MemoryStore::new());
        let config = test_config();
        let orchestrator = DiscoveryOrchestrator::builder()
            .adapter(gauge.clone())
            .build(config.policy())
            .unwrap();
        let p = Pipeline::new(config, store, Arc::new(orchestrator), None).unwrap();

        p.run_records(vec![
            record("A Co", "https://a.com"),
            record("B Co", "https://b.com"),
            record("C Co", "https://c.com"),
            record("D Co", "https://d.com"),
        ])
        .await
        .unwrap();
        // Several entities' adapter calls must have been in flight at
        // the same time.
        assert!(gauge.peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn inline_validation_gate_follows_policy() {
        use crate::validation::{
            CheckStatus, ValidationCapability, ValidationGatewaySettings,
        };
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct CountingChecker {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl ValidationCapability for CountingChecker {
            async fn check(&self, _address: &str) -> Result<CheckStatus> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(CheckStatus::Safe)
            }
        }

        let gateway_for = |checker: Arc<CountingChecker>| {
            Arc::new(ValidationGateway::new(
                checker,
                ValidationGatewaySettings {
                    batch_size: 10,
                    max_workers: 2,
                    call_timeout: Duration::from_secs(5),
                },
            ))
        };
        let build = |enabled: bool, checker: Arc<CountingChecker>| {
            let config = Config {
                checker_enabled: enabled,
                ..test_config()
            };
            let orchestrator = DiscoveryOrchestrator::builder()
                .adapter(Arc::new(StaticFinder::new(StaticFinderSettings::default())))
                .build(config.policy())
                .unwrap();
            Pipeline::new(
                config,
                Arc::new(MemoryStore::new()),
                Arc::new(orchestrator),
                Some(gateway_for(checker)),
            )
            .unwrap()
        };
        let records = || vec![record("TechCorp Software", "https://techcorp.io")];

        // Gateway wired but inline validation off: nothing is checked.
        let idle = Arc::new(CountingChecker {
            calls: AtomicUsize::new(0),
        });
        let summary = build(false, idle.clone()).run_records(records()).await.unwrap();
        assert_eq!(summary.emails_validated, 0);
        assert_eq!(idle.calls.load(Ordering::SeqCst), 0);

        let active = Arc::new(CountingChecker {
            calls: AtomicUsize::new(0),
        });
        let summary = build(true, active.clone()).run_records(records()).await.unwrap();
        assert!(summary.emails_validated > 0);
        assert!(active.calls.load(Ordering::SeqCst) > 0);
    }
}
