//! First-party website crawling: fetching the entity's own pages and
//! extracting the addresses published on them.

use crate::core::error::{AppError, Result};
use crate::core::models::{CandidateEmail, DiscoveryMethod, Entity, FinderBudget};
use crate::core::policy::ScraperSettings;
use crate::finders::{CandidateSink, FinderAdapter};
use crate::utils::domain::{get_domain_from_url, normalize_url};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

static EMAIL_SCAN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}")
        .expect("email scan regex must compile")
});

static HREF_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"href\s*=\s*["']([^"'#]+)["']"#).expect("href regex must compile")
});

/// Crawl shape derived from [`ScraperSettings`].
#[derive(Debug, Clone, Copy)]
pub struct CrawlOptions {
    /// Crawl depth; 1 fetches the homepage only, -1 is unlimited.
    pub depth: i32,
    pub limit_urls: usize,
    pub limit_emails: usize,
    pub delay: Duration,
}

impl From<&ScraperSettings> for CrawlOptions {
    fn from(settings: &ScraperSettings) -> Self {
        CrawlOptions {
            depth: settings.depth,
            limit_urls: settings.limit_urls,
            limit_emails: settings.limit_emails,
            delay: settings.delay,
        }
    }
}

/// Backend that fetches one page body. The finder owns the crawl
/// frontier so partial output lands in the sink page by page.
#[async_trait]
pub trait CrawlCapability: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String>;
}

/// `reqwest`-backed page fetcher.
pub struct HttpCrawler {
    client: reqwest::Client,
}

impl HttpCrawler {
    pub fn new(user_agent: &str, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(request_timeout)
            .build()
            .map_err(|e| AppError::Capability(format!("Failed to build HTTP client: {}", e)))?;
        Ok(HttpCrawler { client })
    }
}

#[async_trait]
impl CrawlCapability for HttpCrawler {
    async fn fetch(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AppError::Capability(format!("GET {} failed: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(AppError::Capability(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }
        response
            .text()
            .await
            .map_err(|e| AppError::Capability(format!("Reading body of {} failed: {}", url, e)))
    }
}

pub struct ScraperFinder {
    capability: Arc<dyn CrawlCapability>,
    settings: ScraperSettings,
}

impl ScraperFinder {
    pub fn new(capability: Arc<dyn CrawlCapability>, settings: ScraperSettings) -> Self {
        ScraperFinder {
            capability,
            settings,
        }
    }

    fn extract_emails(body: &str, domain: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for m in EMAIL_SCAN_REGEX.find_iter(body) {
            let address = m.as_str().trim_matches('.').to_lowercase();
            // Image filenames regularly match the scan pattern.
            if address.ends_with(".png") || address.ends_with(".jpg") || address.ends_with(".gif") {
                continue;
            }
            let host = address.split_once('@').map(|(_, h)| h).unwrap_or("");
            if host != domain && !host.ends_with(&format!(".{}", domain)) {
                continue;
            }
            if seen.insert(address.clone()) {
                found.push(address);
            }
        }
        found
    }

    fn extract_links(body: &str, base: &Url, domain: &str) -> Vec<Url> {
        let mut links = Vec::new();
        for capture in HREF_REGEX.captures_iter(body) {
            let href = &capture[1];
            if href.starts_with("mailto:") || href.starts_with("javascript:") {
                continue;
            }
            if let Ok(resolved) = base.join(href) {
                if resolved.host_str().map(|h| h.ends_with(domain)) == Some(true) {
                    links.push(resolved);
                }
            }
        }
        links
    }
}

#[async_trait]
impl FinderAdapter for ScraperFinder {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Scraper
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
        let start = normalize_url(website)?;
        let domain = get_domain_from_url(website)?;
        let options = CrawlOptions::from(&self.settings);

        let mut visited: HashSet<String> = HashSet::new();
        let mut emitted: HashSet<String> = HashSet::new();
        // The homepage sits at depth 1, so depth 1 crawls it alone.
        let mut frontier: VecDeque<(Url, u32)> = VecDeque::new();
        frontier.push_back((start, 1));

        let mut fetched = 0usize;
        let mut failures = 0usize;

        while let Some((url, depth)) = frontier.pop_front() {
            if fetched >= options.limit_urls || emitted.len() >= options.limit_emails {
                break;
            }
            if !visited.insert(url.as_str().to_string()) {
                continue;
            }
            if fetched > 0 && !options.delay.is_zero() {
                // Jittered politeness delay between page fetches.
                let factor = rand::thread_rng().gen_range(0.8..1.2);
                tokio::time::sleep(options.delay.mul_f64(factor)).await;
            }

            let body = match self.capability.fetch(&url).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(target: "finder.scraper",
                        "[{}] Fetch failed for {}: {}", entity.name, url, e);
                    failures += 1;
                    fetched += 1;
                    continue;
                }
            };
            fetched += 1;

            for address in Self::extract_emails(&body, &domain) {
                if emitted.len() >= options.limit_emails {
                    break;
                }
                if emitted.insert(address.clone()) {
                    let candidate = CandidateEmail::new(
                        &entity.key,
                        address,
                        DiscoveryMethod::Scraper,
                        self.settings.confidence,
                    )
                    .with_provenance(url.to_string());
                    if !sink.push(candidate) {
                        return Ok(());
                    }
                }
            }

            let follow = options.depth == -1 || (depth as i32) < options.depth;
            if follow {
                for link in Self::extract_links(&body, &url, &domain) {
                    if !visited.contains(link.as_str()) {
                        frontier.push_back((link, depth + 1));
                    }
                }
            }
        }

        if fetched > 0 && failures == fetched {
            return Err(AppError::Capability(format!(
                "All {} page fetches failed for '{}'",
                fetched, entity.name
            )));
        }
        tracing::debug!(target: "finder.scraper",
            "[{}] Crawled {} pages, found {} addresses.", entity.name, fetched, emitted.len());
        Ok(())
    }
}
