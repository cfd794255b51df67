//! Environment safety validation
//!
//! Decides whether a tool may run an operation against an environment. Only
//! PRODUCTION records are cached: an environment can be promoted from SANDBOX
//! to PRODUCTION but never demoted, so a cached PRODUCTION record can never go
//! stale in a way that loosens a decision, while a cached SANDBOX record could.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::error::ValidationError;
use super::lookup::LookupClientFactory;
use crate::domain::{Environment, EnvironmentId, OperationType, ValidationPolicy};
use crate::observability::MetricsRecorder;

/// Validates a single environment for an operation type
#[async_trait]
pub trait EnvironmentValidator: Send + Sync {
    /// Ok when `operation` is allowed on `environment_id` under `policy`.
    ///
    /// Must return [`ValidationError::Cancelled`] promptly once `cancel` fires.
    async fn validate(
        &self,
        cancel: &CancellationToken,
        environment_id: EnvironmentId,
        operation: OperationType,
        policy: &ValidationPolicy,
    ) -> Result<(), ValidationError>;
}

/// Validator backed by a concurrent cache of PRODUCTION environments
pub struct CachingEnvironmentValidator {
    factory: Arc<dyn LookupClientFactory>,
    cache: DashMap<EnvironmentId, Environment>,
    metrics: MetricsRecorder,
}

impl CachingEnvironmentValidator {
    pub fn new(factory: Arc<dyn LookupClientFactory>) -> Self {
        Self { factory, cache: DashMap::new(), metrics: MetricsRecorder::new() }
    }

    /// Drop one cached environment, e.g. after it was deleted
    pub fn evict(&self, environment_id: &EnvironmentId) -> Option<Environment> {
        self.cache.remove(environment_id).map(|(_, env)| env)
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_cached(&self, environment_id: &EnvironmentId) -> bool {
        self.cache.contains_key(environment_id)
    }

    async fn fetch(
        &self,
        cancel: &CancellationToken,
        environment_id: EnvironmentId,
    ) -> Result<Environment, ValidationError> {
        let client = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.metrics.record_lookup("cancelled");
                return Err(ValidationError::Cancelled);
            }
            client = self.factory.client() => client,
        };
        let client = client.map_err(|e| {
            warn!(error = %e, "No authenticated client for environment lookup");
            ValidationError::AuthenticationUnavailable(e.to_string())
        })?;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.metrics.record_lookup("cancelled");
                return Err(ValidationError::Cancelled);
            }
            result = client.get_environment(environment_id) => result,
        };

        let response = result.map_err(|e| {
            self.metrics.record_lookup("error");
            warn!(
                environment_id = %environment_id,
                status = ?e.status,
                error = %e,
                "Environment lookup failed"
            );
            ValidationError::ResourceInaccessible {
                id: environment_id,
                status: e.status,
                message: e.message,
            }
        })?;

        match response.environment {
            Some(environment) => {
                self.metrics.record_lookup("ok");
                Ok(environment)
            }
            None => {
                self.metrics.record_lookup("empty");
                Err(ValidationError::EmptyResponse(environment_id))
            }
        }
    }
}

#[async_trait]
impl EnvironmentValidator for CachingEnvironmentValidator {
    #[instrument(skip(self, cancel, policy), fields(environment_id = %environment_id, operation = %operation))]
    async fn validate(
        &self,
        cancel: &CancellationToken,
        environment_id: EnvironmentId,
        operation: OperationType,
        policy: &ValidationPolicy,
    ) -> Result<(), ValidationError> {
        let cached = self.cache.get(&environment_id).map(|entry| entry.value().clone());
        if let Some(environment) = cached {
            self.metrics.record_cache_hit();
            debug!("Environment served from cache");
            return check_policy(&environment, operation, policy);
        }
        self.metrics.record_cache_miss();

        let environment = self.fetch(cancel, environment_id).await?;
        if environment.is_production() {
            self.cache.insert(environment_id, environment.clone());
        }

        check_policy(&environment, operation, policy)
    }
}

/// SANDBOX always passes; PRODUCTION passes only when the policy allows the operation
pub fn check_policy(
    environment: &Environment,
    operation: OperationType,
    policy: &ValidationPolicy,
) -> Result<(), ValidationError> {
    if !environment.is_production() || policy.allows_production(operation) {
        return Ok(());
    }

    Err(ValidationError::ProductionDenied {
        id: environment.id,
        name: environment.name.clone(),
        operation,
    })
}
