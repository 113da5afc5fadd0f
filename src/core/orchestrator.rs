//! Dispatching the enabled discovery methods for one entity.

use crate::core::error::{AppError, Result};
use crate::core::models::{
    CandidateEmail, Discovery, DiscoveryMethod, Entity, MethodOutcome,
};
use crate::core::policy::{DiscoveryPolicy, MethodMode};
use crate::finders::{CandidateSink, FinderAdapter};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Builder for [`DiscoveryOrchestrator`]. Fails fast when the policy
/// enables a method no adapter was registered for.
#[derive(Default)]
pub struct OrchestratorBuilder {
    adapters: HashMap<DiscoveryMethod, Arc<dyn FinderAdapter>>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adapter(mut self, adapter: Arc<dyn FinderAdapter>) -> Self {
        self.adapters.insert(adapter.method(), adapter);
        self
    }

    pub fn build(self, policy: DiscoveryPolicy) -> Result<DiscoveryOrchestrator> {
        for method in DiscoveryMethod::ALL {
            if policy.mode(method) != MethodMode::Disabled && !self.adapters.contains_key(&method)
            {
                return Err(AppError::Config(format!(
                    "Method '{}' is enabled but no adapter is registered for it",
                    method
                )));
            }
        }
        let pools = DiscoveryMethod::ALL
            .into_iter()
            .map(|m| (m, Arc::new(Semaphore::new(policy.concurrency(m)))))
            .collect();
        Ok(DiscoveryOrchestrator {
            adapters: self.adapters,
            pools,
            policy,
        })
    }
}

/// Runs every policy-enabled finder for an entity, each under its own
/// time budget and per-method concurrency pool, and unions the results.
///
/// Method failures are isolated: a finder timing out or erroring never
/// affects its siblings, and candidates it pushed before dying are kept.
pub struct DiscoveryOrchestrator {
    adapters: HashMap<DiscoveryMethod, Arc<dyn FinderAdapter>>,
    pools: HashMap<DiscoveryMethod, Arc<Semaphore>>,
    policy: DiscoveryPolicy,
}

impl DiscoveryOrchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub fn policy(&self) -> &DiscoveryPolicy {
        &self.policy
    }

    /// Automatic discovery: runs every auto-inline method concurrently.
    /// Manual-only and disabled methods are skipped with their own
    /// outcome markers; methods already completed for the entity are
    /// not re-run.
    pub async fn discover(&self, entity: &Entity) -> Discovery {
        let mut outcomes = HashMap::new();
        let mut candidates = Vec::new();
        let mut running = FuturesUnordered::new();

        for method in DiscoveryMethod::ALL {
            if entity.completed.is_done(method) {
                tracing::trace!(target: "orchestrator",
                    "[{}] {} already completed; skipping.", entity.name, method);
                continue;
            }
            match self.policy.mode(method) {
                MethodMode::Disabled => {
                    outcomes.insert(method, MethodOutcome::SkippedDisabled);
                }
                MethodMode::ManualOnly => {
                    outcomes.insert(method, MethodOutcome::SkippedManual);
                }
                MethodMode::AutoInline => {
                    running.push(self.run_method(entity, method));
                }
            }
        }

        while let Some((method, outcome, mut found)) = running.next().await {
            outcomes.insert(method, outcome);
            candidates.append(&mut found);
        }

        Discovery {
            candidates,
            outcomes,
        }
    }

    /// Explicit single-method invocation. Bypasses the manual-only
    /// gate but still refuses disabled methods.
    pub async fn discover_manual(&self, entity: &Entity, method: DiscoveryMethod) -> Result<Discovery> {
        if self.policy.mode(method) == MethodMode::Disabled {
            return Err(AppError::Config(format!(
                "Method '{}' is disabled and cannot be invoked manually",
                method
            )));
        }
        let (method, outcome, candidates) = self.run_method(entity, method).await;
        let mut outcomes = HashMap::new();
        outcomes.insert(method, outcome);
        Ok(Discovery {
            candidates,
            outcomes,
        })
    }

    async fn run_method(
        &self,
        entity: &Entity,
        method: DiscoveryMethod,
    ) -> (DiscoveryMethod, MethodOutcome, Vec<CandidateEmail>) {
        let adapter = match self.adapters.get(&method) {
            Some(adapter) => Arc::clone(adapter),
            // Unreachable after builder validation; recorded as a
            // failure rather than a panic if it ever happens.
            None => return (method, MethodOutcome::Failed, Vec::new()),
        };
        let pool = Arc::clone(&self.pools[&method]);
        let budget = self.policy.budget(method);
        let max_attempts = 1 + self.policy.orchestrator_retries;

        // Closed pools cannot happen; permits are never forgotten.
        let _permit = pool.acquire().await.expect("method pool closed");

        for attempt in 1..=max_attempts {
            // Fresh sink per attempt so a retry cannot duplicate
            // candidates banked by the failed attempt.
            let sink = CandidateSink::new(budget.max_results);
            match tokio::time::timeout(budget.timeout, adapter.find(entity, &budget, &sink)).await
            {
                Ok(Ok(())) => {
                    tracing::debug!(target: "orchestrator",
                        "[{}] {} completed with {} candidates.",
                        entity.name, method, sink.len());
                    return (method, MethodOutcome::Completed, sink.take());
                }
                Err(_elapsed) => {
                    // The adapter future is dropped; whatever reached
                    // the sink before the deadline is kept.
                    tracing::warn!(target: "orchestrator",
                        "[{}] {} exceeded its {}s budget; keeping {} partial candidates.",
                        entity.name, method, budget.timeout.as_secs(), sink.len());
                    return (method, MethodOutcome::TimedOut, sink.take());
                }
                Ok(Err(e @ AppError::Structural(_))) | Ok(Err(e @ AppError::Config(_))) => {
                    tracing::debug!(target: "orchestrator",
                        "[{}] {} cannot run: {}", entity.name, method, e);
                    let outcome = if sink.is_empty() {
                        MethodOutcome::Failed
                    } else {
                        MethodOutcome::Partial
                    };
                    return (method, outcome, sink.take());
                }
                Ok(Err(e)) => {
                    tracing::warn!(target: "orchestrator",
                        "[{}] {} attempt {}/{} failed: {}",
                        entity.name, method, attempt, max_attempts, e);
                    if attempt == max_attempts {
                        let outcome = if sink.is_empty() {
                            MethodOutcome::Failed
                        } else {
                            MethodOutcome::Partial
                        };
                        return (method, outcome, sink.take());
                    }
                }
            }
        }
        (method, MethodOutcome::Failed, Vec::new())
    }
}
