//! Pattern-based email generation from an entity's website domain.
//!
//! Pure: no network traffic, no I/O. Candidates are formed by joining
//! well-known mailbox prefixes with the entity's domain and scored by
//! how commonly each prefix exists in the wild.

use crate::core::error::{AppError, Result};
use crate::core::models::{CandidateEmail, DiscoveryMethod, Entity, FinderBudget};
use crate::finders::{CandidateSink, FinderAdapter};
use crate::utils::domain::get_domain_from_url;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternCategory {
    General,
    Business,
    Support,
    Hr,
    Marketing,
    Technical,
    Finance,
    Legal,
}

/// Mailbox prefix, base confidence, category. Ordered roughly by how
/// commonly the prefix exists on real business domains.
const EMAIL_PATTERNS: &[(&str, f64, PatternCategory)] = &[
    ("info", 0.95, PatternCategory::General),
    ("contact", 0.90, PatternCategory::General),
    ("hello", 0.85, PatternCategory::General),
    ("sales", 0.80, PatternCategory::Business),
    ("support", 0.80, PatternCategory::Support),
    ("help", 0.75, PatternCategory::Support),
    ("service", 0.75, PatternCategory::Support),
    ("hr", 0.70, PatternCategory::Hr),
    ("careers", 0.70, PatternCategory::Hr),
    ("business", 0.70, PatternCategory::Business),
    ("jobs", 0.65, PatternCategory::Hr),
    ("recruitment", 0.65, PatternCategory::Hr),
    ("marketing", 0.65, PatternCategory::Marketing),
    ("admin", 0.65, PatternCategory::Technical),
    ("partnerships", 0.60, PatternCategory::Business),
    ("bd", 0.60, PatternCategory::Business),
    ("media", 0.60, PatternCategory::Marketing),
    ("press", 0.60, PatternCategory::Marketing),
    ("it", 0.60, PatternCategory::Technical),
    ("finance", 0.60, PatternCategory::Finance),
    ("accounting", 0.60, PatternCategory::Finance),
    ("webmaster", 0.55, PatternCategory::Technical),
    ("legal", 0.55, PatternCategory::Legal),
    ("office", 0.50, PatternCategory::General),
    ("team", 0.50, PatternCategory::General),
    ("mail", 0.45, PatternCategory::General),
];

#[derive(Debug, Clone)]
pub struct StaticFinderSettings {
    /// Explicit prefix list; overrides smart selection when set.
    pub patterns: Option<Vec<String>>,
    /// Pick category-appropriate prefixes from the entity name/website.
    pub smart_selection: bool,
    pub min_confidence: f64,
    pub confidence_overrides: HashMap<String, f64>,
}

impl Default for StaticFinderSettings {
    fn default() -> Self {
        StaticFinderSettings {
            patterns: None,
            smart_selection: true,
            min_confidence: 0.0,
            confidence_overrides: HashMap::new(),
        }
    }
}

pub struct StaticFinder {
    settings: StaticFinderSettings,
}

impl StaticFinder {
    pub fn new(settings: StaticFinderSettings) -> Self {
        StaticFinder { settings }
    }

    fn confidence_for(&self, prefix: &str, base: f64) -> f64 {
        self.settings
            .confidence_overrides
            .get(prefix)
            .copied()
            .unwrap_or(base)
    }

    /// Categories worth probing for this entity. General and business
    /// prefixes apply to every business; the rest are keyed off the
    /// name and website text.
    fn select_categories(entity: &Entity) -> Vec<PatternCategory> {
        let text = format!(
            "{} {}",
            entity.name,
            entity.website.as_deref().unwrap_or("")
        )
        .to_lowercase();

        // Whole tokens only; "corp" must not fire on "scorpion".
        let tokens: HashSet<&str> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let mut categories = vec![PatternCategory::General, PatternCategory::Business];
        let has_any = |keywords: &[&str]| keywords.iter().any(|k| tokens.contains(k));

        if has_any(&["tech", "software", "digital", "computer", "data", "ai", "ml"]) {
            categories.push(PatternCategory::Technical);
        }
        if has_any(&["service", "services", "support", "consulting", "solutions"]) {
            categories.push(PatternCategory::Support);
        }
        if has_any(&["corp", "corporation", "inc", "ltd", "group", "holdings"]) {
            categories.push(PatternCategory::Hr);
            categories.push(PatternCategory::Marketing);
        }
        categories
    }

    fn generate(&self, entity: &Entity, max_results: usize) -> Result<Vec<CandidateEmail>> {
        let website = entity.website.as_deref().ok_or_else(|| {
            AppError::Structural(format!("Entity '{}' has no website", entity.name))
        })?;
        let domain = get_domain_from_url(website)?;

        let selected: Vec<(&str, f64)> = if let Some(ref explicit) = self.settings.patterns {
            explicit
                .iter()
                .map(|prefix| {
                    let base = EMAIL_PATTERNS
                        .iter()
                        .find(|(p, _, _)| p == prefix)
                        .map(|(_, c, _)| *c)
                        .unwrap_or(0.5);
                    (prefix.as_str(), base)
                })
                .collect()
        } else if self.settings.smart_selection {
            let categories = Self::select_categories(entity);
            EMAIL_PATTERNS
                .iter()
                .filter(|(_, _, cat)| categories.contains(cat))
                .map(|(p, c, _)| (*p, *c))
                .collect()
        } else {
            EMAIL_PATTERNS.iter().map(|(p, c, _)| (*p, *c)).collect()
        };

        let mut candidates: Vec<CandidateEmail> = selected
            .into_iter()
            .map(|(prefix, base)| {
                let confidence = self.confidence_for(prefix, base);
                CandidateEmail::new(
                    &entity.key,
                    format!("{}@{}", prefix, domain),
                    DiscoveryMethod::Static,
                    confidence,
                )
                .with_provenance(format!("pattern:{}", prefix))
            })
            .filter(|c| c.confidence >= self.settings.min_confidence)
            .collect();

        candidates.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.address.cmp(&b.address))
        });
        candidates.truncate(max_results);
        Ok(candidates)
    }
}

#[async_trait]
impl FinderAdapter for StaticFinder {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Static
    }

    async fn find(
        &self,
        entity: &Entity,
        budget: &FinderBudget,
        sink: &CandidateSink,
    ) -> Result<()> {
        let candidates = self.generate(entity, budget.max_results)?;
        tracing::debug!(target: "finder.static",
            "[{}] Generated {} pattern candidates.", entity.name, candidates.len());
        for candidate in candidates {
            if !sink.push(candidate) {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::RawEntityRecord;
    use std::time::Duration;

    fn entity(name: &str, website: Option<&str>) -> Entity {
        Entity::from_record(&RawEntityRecord {
            name: name.to_string(),
            address: Some("1 Main St".to_string()),
            phone: None,
            website: website.map(str::to_string),
            query: "q".to_string(),
        })
    }

    fn budget(max_results: usize) -> FinderBudget {
        FinderBudget {
            timeout: Duration::from_secs(5),
            max_results,
        }
    }

    #[tokio::test]
    async fn explicit_patterns_with_overrides() {
        let finder = StaticFinder::new(StaticFinderSettings {
            patterns: Some(vec!["info".to_string(), "contact".to_string()]),
            confidence_overrides: HashMap::new(),
            ..Default::default()
        });
        let e = entity("TechCorp Software", Some("https://techcorp.io"));
        let sink = CandidateSink::new(10);
        finder.find(&e, &budget(10), &sink).await.unwrap();

        let candidates = sink.take();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].address, "info@techcorp.io");
        assert_eq!(candidates[0].confidence, 0.95);
        assert_eq!(candidates[1].address, "contact@techcorp.io");
        assert_eq!(candidates[1].confidence, 0.90);
    }

    #[tokio::test]
    async fn smart_selection_adds_technical_prefixes_for_tech_names() {
        let finder = StaticFinder::new(StaticFinderSettings::default());
        let e = entity("TechCorp Software", Some("https://techcorp.io"));
        let sink = CandidateSink::new(100);
        finder.find(&e, &budget(100), &sink).await.unwrap();

        let addresses: Vec<String> = sink.take().into_iter().map(|c| c.address).collect();
        assert!(addresses.contains(&"info@techcorp.io".to_string()));
        assert!(addresses.contains(&"admin@techcorp.io".to_string()));
        // HR prefixes require a large-company keyword, absent here.
        assert!(!addresses.contains(&"careers@techcorp.io".to_string()));
    }

    #[tokio::test]
    async fn keyword_matching_is_whole_token_only() {
        let finder = StaticFinder::new(StaticFinderSettings::default());

        // "scorpion" contains "corp" as a substring but is not a
        // large-company token.
        let e = entity("Scorpion Pest Removal", Some("https://scorpion-pest.com"));
        let sink = CandidateSink::new(100);
        finder.find(&e, &budget(100), &sink).await.unwrap();
        let addresses: Vec<String> = sink.take().into_iter().map(|c| c.address).collect();
        assert!(!addresses.contains(&"careers@scorpion-pest.com".to_string()));
        assert!(!addresses.contains(&"press@scorpion-pest.com".to_string()));

        let e = entity("Acme Corp", Some("https://acme.com"));
        let sink = CandidateSink::new(100);
        finder.find(&e, &budget(100), &sink).await.unwrap();
        let addresses: Vec<String> = sink.take().into_iter().map(|c| c.address).collect();
        assert!(addresses.contains(&"careers@acme.com".to_string()));
        assert!(addresses.contains(&"press@acme.com".to_string()));
    }

    #[tokio::test]
    async fn results_are_sorted_capped_and_floored() {
        let finder = StaticFinder::new(StaticFinderSettings {
            smart_selection: false,
            min_confidence: 0.75,
            ..Default::default()
        });
        let e = entity("Joe's Cafe", Some("joes.com"));
        let sink = CandidateSink::new(100);
        finder.find(&e, &budget(3), &sink).await.unwrap();

        let candidates = sink.take();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].address, "info@joes.com");
        assert!(candidates.windows(2).all(|w| w[0].confidence >= w[1].confidence));
        assert!(candidates.iter().all(|c| c.confidence >= 0.75));
    }

    #[tokio::test]
    async fn missing_website_is_a_structural_error() {
        let finder = StaticFinder::new(StaticFinderSettings::default());
        let e = entity("No Site Co", None);
        let sink = CandidateSink::new(10);
        let result = finder.find(&e, &budget(10), &sink).await;
        assert!(matches!(result, Err(AppError::Structural(_))));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn override_replaces_base_confidence() {
        let mut overrides = HashMap::new();
        overrides.insert("contact".to_string(), 0.99);
        let finder = StaticFinder::new(StaticFinderSettings {
            patterns: Some(vec!["contact".to_string()]),
            confidence_overrides: overrides,
            ..Default::default()
        });
        let e = entity("Joe's Cafe", Some("joes.com"));
        let sink = CandidateSink::new(10);
        finder.find(&e, &budget(10), &sink).await.unwrap();
        assert_eq!(sink.take()[0].confidence, 0.99);
    }
}
