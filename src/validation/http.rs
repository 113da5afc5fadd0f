//! HTTP client for a Reacher-compatible email checking service.

use crate::core::error::{AppError, Result};
use crate::validation::{CheckStatus, ValidationCapability};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize)]
struct CheckRequest<'a> {
    to_email: &'a str,
}

/// Talks to a `POST /v0/check_email` endpoint and maps its
/// `is_reachable` verdict into [`CheckStatus`].
pub struct HttpCheckClient {
    client: Client,
    endpoint: String,
}

impl HttpCheckClient {
    pub fn new(endpoint: impl Into<String>, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Capability(format!("Failed to build check client: {}", e)))?;
        Ok(HttpCheckClient {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ValidationCapability for HttpCheckClient {
    async fn check(&self, address: &str) -> Result<CheckStatus> {
        tracing::debug!(target: "validation", "Checking {} via {}", address, self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&CheckRequest { to_email: address })
            .send()
            .await
            .map_err(|e| {
                AppError::Capability(format!("Check request for {} failed: {}", address, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Capability(format!(
                "Check service returned {} for {}",
                status, address
            )));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            AppError::Capability(format!("Invalid check response for {}: {}", address, e))
        })?;

        let verdict = body
            .get("is_reachable")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AppError::Capability(format!(
                    "Check response for {} is missing 'is_reachable'",
                    address
                ))
            })?;

        match verdict {
            "safe" => Ok(CheckStatus::Safe),
            "invalid" => Ok(CheckStatus::Invalid),
            "risky" => Ok(CheckStatus::Risky),
            "unknown" => Ok(CheckStatus::Unknown),
            other => {
                tracing::warn!(target: "validation",
                    "Unrecognized verdict '{}' for {}; treating as unknown.", other, address);
                Ok(CheckStatus::Unknown)
            }
        }
    }
}
