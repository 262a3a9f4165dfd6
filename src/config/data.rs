use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    config::errors::ConfigError,
    constants::{
        DEFAULT_BATCHES_PER_SESSION, DEFAULT_OPERATIONS_PER_BATCH, DEFAULT_RETRY_ATTEMPTS,
        DEFAULT_RETRY_DELAY_MS,
    },
    plan::PlanLimits,
    retry::RetryPolicy,
};

/// Limits and retry settings for one orchestration run. A plain value passed
/// into the orchestrator at call time; nothing here is read from ambient
/// state or mutated mid-run.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmitConfig {
    /// Member operations per transaction, excluding the fee-priority
    /// operation.
    pub max_operations_per_batch: usize,
    /// Transactions authorized by one signing pass.
    pub max_batches_per_session: usize,
    /// Attempts per batch before the session is failed.
    pub retry_attempts: u32,
    /// Delay between attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// Optional maximum random jitter added to the delay, in milliseconds.
    pub retry_jitter_ms: Option<u64>,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        SubmitConfig {
            max_operations_per_batch: DEFAULT_OPERATIONS_PER_BATCH,
            max_batches_per_session: DEFAULT_BATCHES_PER_SESSION,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            retry_jitter_ms: None,
        }
    }
}

impl SubmitConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_operations_per_batch == 0 {
            return Err(ConfigError::ZeroOperationsPerBatch);
        }
        if self.max_batches_per_session == 0 {
            return Err(ConfigError::ZeroBatchesPerSession);
        }
        if self.retry_attempts == 0 {
            return Err(ConfigError::ZeroRetryAttempts);
        }
        Ok(())
    }

    pub fn plan_limits(&self) -> PlanLimits {
        PlanLimits {
            max_operations_per_batch: self.max_operations_per_batch,
            max_batches_per_session: self.max_batches_per_session,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
            jitter: self.retry_jitter_ms.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_network_limits() {
        let config = SubmitConfig::default();
        assert_eq!(config.max_operations_per_batch, 5);
        assert_eq!(config.max_batches_per_session, 20);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_delay_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_limits() {
        let config = SubmitConfig {
            max_operations_per_batch: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroOperationsPerBatch)
        ));

        let config = SubmitConfig {
            max_batches_per_session: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroBatchesPerSession)
        ));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: SubmitConfig = serde_json::from_str(r#"{"maxOperationsPerBatch": 12}"#).unwrap();
        assert_eq!(config.max_operations_per_batch, 12);
        assert_eq!(config.max_batches_per_session, 20);
    }
}
