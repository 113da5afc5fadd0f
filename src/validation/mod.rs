//! Deliverability validation of aggregated email records.

pub mod gateway;
pub mod http;

pub use gateway::{ValidationGateway, ValidationGatewaySettings, Verdict};
pub use http::HttpCheckClient;

use crate::core::error::Result;
use crate::core::models::ValidationStatus;
use async_trait::async_trait;

/// Verdict vocabulary of the checking service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Safe,
    Invalid,
    Risky,
    Unknown,
}

impl CheckStatus {
    /// Maps a service verdict onto the persisted status. `Unknown`
    /// leaves the record unchecked so a later run can try again.
    pub fn to_validation_status(self) -> ValidationStatus {
        match self {
            CheckStatus::Safe => ValidationStatus::Deliverable,
            CheckStatus::Invalid => ValidationStatus::Undeliverable,
            CheckStatus::Risky => ValidationStatus::Risky,
            CheckStatus::Unknown => ValidationStatus::Unchecked,
        }
    }
}

/// A service that can judge the deliverability of one address.
#[async_trait]
pub trait ValidationCapability: Send + Sync {
    async fn check(&self, address: &str) -> Result<CheckStatus>;
}
