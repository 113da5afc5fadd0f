//! Batched, bounded-concurrency dispatch of validation checks.

use crate::core::models::{EmailRecord, EntityKey, ValidationStatus};
use crate::validation::ValidationCapability;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Copy)]
pub struct ValidationGatewaySettings {
    pub batch_size: usize,
    pub max_workers: usize,
    /// Budget for a single check call. Calls that exceed it leave the
    /// record unchecked.
    pub call_timeout: Duration,
}

/// One resolved check, addressed back to the owning record.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub entity: EntityKey,
    pub address: String,
    pub status: ValidationStatus,
}

/// Fans pending records out to the checking service in fixed-size
/// batches with a shared worker pool.
///
/// Validation never discards: a failed or timed-out check yields an
/// `Unchecked` verdict so the record stays eligible for a later pass.
pub struct ValidationGateway {
    capability: Arc<dyn ValidationCapability>,
    settings: ValidationGatewaySettings,
}

impl ValidationGateway {
    pub fn new(
        capability: Arc<dyn ValidationCapability>,
        settings: ValidationGatewaySettings,
    ) -> Self {
        ValidationGateway {
            capability,
            settings,
        }
    }

    pub async fn validate(&self, pending: Vec<EmailRecord>) -> Vec<Verdict> {
        let total = pending.len();
        if total == 0 {
            return Vec::new();
        }
        let batch_size = self.settings.batch_size.max(1);
        let workers = Arc::new(Semaphore::new(self.settings.max_workers.max(1)));

        // Every batch goes in flight immediately; batches compete only
        // for worker-pool slots, so a hung call cannot stall records
        // dispatched in other batches.
        let mut in_flight = FuturesUnordered::new();
        for (batch_index, batch) in pending.chunks(batch_size).enumerate() {
            tracing::debug!(target: "validation",
                "Dispatching batch {} ({} records).", batch_index + 1, batch.len());
            for record in batch {
                let capability = Arc::clone(&self.capability);
                let workers = Arc::clone(&workers);
                let timeout = self.settings.call_timeout;
                let entity = record.entity.clone();
                let address = record.address.clone();
                in_flight.push(async move {
                    let _permit = workers.acquire().await.expect("worker pool closed");
                    let status =
                        match tokio::time::timeout(timeout, capability.check(&address)).await {
                            Ok(Ok(check)) => check.to_validation_status(),
                            Ok(Err(e)) => {
                                tracing::warn!(target: "validation",
                                    "Check failed for {}: {}", address, e);
                                ValidationStatus::Unchecked
                            }
                            Err(_elapsed) => {
                                tracing::warn!(target: "validation",
                                    "Check timed out for {}.", address);
                                ValidationStatus::Unchecked
                            }
                        };
                    Verdict {
                        entity,
                        address,
                        status,
                    }
                });
            }
        }

        let mut verdicts = Vec::with_capacity(total);
        while let Some(verdict) = in_flight.next().await {
            verdicts.push(verdict);
        }

        let resolved = verdicts
            .iter()
            .filter(|v| v.status != ValidationStatus::Unchecked)
            .count();
        tracing::info!(target: "validation",
            "Validated {}/{} records.", resolved, total);
        verdicts
    }
}
