//! OSINT harvesting: querying public search sources for addresses
//! already published on the entity's domain.

use crate::core::config::EMAIL_REGEX;
use crate::core::error::{AppError, Result};
use crate::core::models::{CandidateEmail, DiscoveryMethod, Entity, FinderBudget};
use crate::core::policy::HarvesterSettings;
use crate::finders::{CandidateSink, FinderAdapter};
use crate::utils::domain::get_domain_from_url;
use async_trait::async_trait;
use std::sync::Arc;

/// One address sighted by an OSINT source.
#[derive(Debug, Clone)]
pub struct OsintHit {
    pub address: String,
    pub source: String,
}

/// Backend that can query a single OSINT source for addresses on a
/// domain. One source per call, so the finder can bank results between
/// sources and a mid-run cancellation keeps everything banked so far.
#[async_trait]
pub trait OsintCapability: Send + Sync {
    async fn search(&self, source: &str, domain: &str, limit: usize) -> Result<Vec<OsintHit>>;
}

pub struct HarvesterFinder {
    capability: Arc<dyn OsintCapability>,
    settings: HarvesterSettings,
}

impl HarvesterFinder {
    pub fn new(capability: Arc<dyn OsintCapability>, settings: HarvesterSettings) -> Self {
        HarvesterFinder {
            capability,
            settings,
        }
    }
}

#[async_trait]
impl FinderAdapter for HarvesterFinder {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Harvester
    }

    async fn find(
        &self,
        entity: &Entity,
        _budget: &FinderBudget,
        sink: &CandidateSink,
    ) -> Result<()> {
        let website = entity.website.as_deref().ok_or_else(|| {
            AppError::Structural(format!("Entity '{}' has no website", entity.name))
        })?;
        let domain = get_domain_from_url(website)?;

        let mut failed_sources = 0usize;
        'sources: for source in &self.settings.sources {
            let hits = match self
                .capability
                .search(source, &domain, self.settings.limit_per_source)
                .await
            {
                Ok(hits) => hits,
                Err(e) => {
                    tracing::warn!(target: "finder.harvester",
                        "[{}] Source '{}' failed: {}", entity.name, source, e);
                    failed_sources += 1;
                    continue;
                }
            };

            tracing::debug!(target: "finder.harvester",
                "[{}] Source '{}' returned {} hits.", entity.name, source, hits.len());
            for hit in hits {
                let address = hit.address.trim().to_lowercase();
                if !EMAIL_REGEX.is_match(&address) {
                    continue;
                }
                // Harvested hits only count when they belong to the domain.
                let host = address.split_once('@').map(|(_, h)| h).unwrap_or("");
                if host != domain && !host.ends_with(&format!(".{}", domain)) {
                    continue;
                }
                let candidate = CandidateEmail::new(
                    &entity.key,
                    address,
                    DiscoveryMethod::Harvester,
                    self.settings.confidence,
                )
                .with_provenance(hit.source);
                if !sink.push(candidate) {
                    break 'sources;
                }
            }
        }

        if failed_sources == self.settings.sources.len() && !self.settings.sources.is_empty() {
            return Err(AppError::Capability(format!(
                "All {} OSINT sources failed for '{}'",
                failed_sources, entity.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::RawEntityRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn entity() -> Entity {
        Entity::from_record(&RawEntityRecord {
            name: "TechCorp Software".to_string(),
            address: None,
            phone: None,
            website: Some("https://techcorp.io".to_string()),
            query: "q".to_string(),
        })
    }

    fn settings(sources: &[&str]) -> HarvesterSettings {
        HarvesterSettings {
            sources: sources.iter().map(|s| s.to_string()).collect(),
            limit_per_source: 10,
            timeout: Duration::from_secs(5),
            concurrency: 1,
            confidence: 0.8,
        }
    }

    fn budget() -> FinderBudget {
        FinderBudget {
            timeout: Duration::from_secs(5),
            max_results: 25,
        }
    }

    struct FixedSource {
        hits: Vec<(&'static str, Vec<&'static str>)>,
    }

    #[async_trait]
    impl OsintCapability for FixedSource {
        async fn search(&self, source: &str, _domain: &str, _limit: usize) -> Result<Vec<OsintHit>> {
            let entry = self.hits.iter().find(|(s, _)| *s == source);
            match entry {
                Some((_, addresses)) => Ok(addresses
                    .iter()
                    .map(|a| OsintHit {
                        address: a.to_string(),
                        source: source.to_string(),
                    })
                    .collect()),
                None => Err(AppError::Capability(format!("source '{}' unavailable", source))),
            }
        }
    }

    #[tokio::test]
    async fn filters_foreign_domains_and_invalid_addresses() {
        let capability = Arc::new(FixedSource {
            hits: vec![(
                "bing",
                vec![
                    "j.doe@techcorp.io",
                    "someone@gmail.com",
                    "not-an-email",
                    "HR@TechCorp.IO",
                ],
            )],
        });
        let finder = HarvesterFinder::new(capability, settings(&["bing"]));
        let sink = CandidateSink::new(25);
        finder.find(&entity(), &budget(), &sink).await.unwrap();

        let candidates = sink.take();
        let addresses: Vec<&str> = candidates.iter().map(|c| c.address.as_str()).collect();
        assert_eq!(addresses, vec!["j.doe@techcorp.io", "hr@techcorp.io"]);
        assert!(candidates.iter().all(|c| c.confidence == 0.8));
        assert!(candidates
            .iter()
            .all(|c| c.provenance.as_deref() == Some("bing")));
    }

    #[tokio::test]
    async fn one_failing_source_keeps_results_from_others() {
        let capability = Arc::new(FixedSource {
            hits: vec![("duckduckgo", vec!["info@techcorp.io"])],
        });
        let finder = HarvesterFinder::new(capability, settings(&["bing", "duckduckgo"]));
        let sink = CandidateSink::new(25);
        finder.find(&entity(), &budget(), &sink).await.unwrap();
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn all_sources_failing_is_an_error() {
        let capability = Arc::new(FixedSource { hits: vec![] });
        let finder = HarvesterFinder::new(capability, settings(&["bing", "duckduckgo"]));
        let sink = CandidateSink::new(25);
        let result = finder.find(&entity(), &budget(), &sink).await;
        assert!(matches!(result, Err(AppError::Capability(_))));
    }

    #[tokio::test]
    async fn respects_sink_cap_across_sources() {
        struct Counting {
            calls: AtomicUsize,
        }
        #[async_trait]
        impl OsintCapability for Counting {
            async fn search(&self, source: &str, _d: &str, _l: usize) -> Result<Vec<OsintHit>> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok((0..10)
                    .map(|i| OsintHit {
                        address: format!("user{}@techcorp.io", i),
                        source: source.to_string(),
                    })
                    .collect())
            }
        }
        let capability = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        let finder = HarvesterFinder::new(capability.clone(), settings(&["bing", "duckduckgo"]));
        let sink = CandidateSink::new(5);
        finder.find(&entity(), &budget(), &sink).await.unwrap();
        assert_eq!(sink.len(), 5);
        // Second source never queried once the sink filled.
        assert_eq!(capability.calls.load(Ordering::SeqCst), 1);
    }
}
