//! Fluent builder for constructing validated `Config` instances.

use super::loading::{apply_file_config, load_config_file};
use super::validation::validate_config;
use super::{Config, ConfigFile, ConfigResult};
use crate::core::error::AppError;
use crate::core::policy::MethodMode;
use std::path::Path;
use std::time::Duration;

/// Builder pattern for creating `Config` instances.
///
/// Resolution order: defaults, then a config file (explicit or found at
/// a default location), then builder overrides, then validation.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
    config_file_path: Option<String>,
    overrides: ConfigFile,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Specify an optional configuration file path to load.
    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file_path = Some(path.into());
        self
    }

    pub fn query_templates(mut self, templates: Vec<String>) -> Self {
        self.overrides.search.query_templates = Some(templates);
        self
    }
    pub fn max_companies_per_query(mut self, value: usize) -> Self {
        self.overrides.search.max_companies_per_query = Some(value);
        self
    }
    pub fn max_empty_scrolls(mut self, value: u32) -> Self {
        self.overrides.search.max_empty_scrolls = Some(value);
        self
    }
    pub fn max_parallel_queries(mut self, value: usize) -> Self {
        self.overrides.search.max_parallel_queries = Some(value);
        self
    }
    pub fn static_mode(mut self, mode: MethodMode) -> Self {
        self.overrides.finders.static_mode = Some(mode);
        self
    }
    pub fn harvester_mode(mut self, mode: MethodMode) -> Self {
        self.overrides.finders.harvester_mode = Some(mode);
        self
    }
    pub fn scraper_mode(mut self, mode: MethodMode) -> Self {
        self.overrides.finders.scraper_mode = Some(mode);
        self
    }
    pub fn max_emails_per_entity(mut self, value: usize) -> Self {
        self.overrides.finders.max_emails_per_entity = Some(value);
        self
    }
    pub fn min_confidence(mut self, value: f64) -> Self {
        self.overrides.finders.min_confidence = Some(value);
        self
    }
    pub fn harvester_sources(mut self, sources: Vec<String>) -> Self {
        self.overrides.harvester.sources = Some(sources);
        self
    }
    pub fn scraper_depth(mut self, depth: i32) -> Self {
        self.overrides.scraper.depth = Some(depth);
        self
    }
    pub fn checker_enabled(mut self, enabled: bool) -> Self {
        self.overrides.checker.enabled = Some(enabled);
        self
    }
    pub fn checker_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.overrides.checker.api_endpoint = Some(endpoint.into());
        self
    }
    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.overrides.network.user_agent = Some(value.into());
        self
    }
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.overrides.network.request_timeout_secs = Some(duration.as_secs());
        self
    }

    /// Builds the final `Config`, applying defaults, file settings,
    /// overrides and validation.
    pub fn build(mut self) -> ConfigResult<Config> {
        let mut loaded_path: Option<String> = None;

        if let Some(ref path) = self.config_file_path {
            match load_config_file(path) {
                Ok(file_config) => {
                    apply_file_config(&mut self.config, &file_config);
                    loaded_path = Some(path.clone());
                    tracing::info!("Loaded base configuration from specified file: {}", path);
                }
                Err(e) => {
                    tracing::error!("Failed to load specified config file '{}': {}", path, e);
                    return Err(AppError::Config(format!(
                        "Failed to load specified configuration file '{}': {}",
                        path, e
                    )));
                }
            }
        } else {
            tracing::debug!("No config file specified, checking default locations.");
            for path_str in ["./geomail.toml", "./config.toml"] {
                if Path::new(path_str).exists() {
                    match load_config_file(path_str) {
                        Ok(file_config) => {
                            apply_file_config(&mut self.config, &file_config);
                            loaded_path = Some(path_str.to_string());
                            tracing::info!(
                                "Loaded base configuration from default location: {}",
                                path_str
                            );
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(
                                "Failed to load or parse default config '{}': {}",
                                path_str,
                                e
                            );
                        }
                    }
                }
            }
            if loaded_path.is_none() {
                tracing::info!("No configuration file found. Using default values and overrides.");
            }
        }

        apply_file_config(&mut self.config, &self.overrides);
        self.config.loaded_config_path = loaded_path;
        validate_config(&mut self.config)?;

        tracing::debug!("Final configuration built successfully.");
        Ok(self.config)
    }
}
