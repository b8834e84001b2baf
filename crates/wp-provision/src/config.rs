//! Provisioning configuration
//!
//! Loaded from TOML by the CLI:
//!
//! ```toml
//! failure_policy = "compensate"
//! compensation_max_retries = 3
//! compensation_backoff_ms = 100
//!
//! [scheduling]
//! mode = "concurrent"
//! max_in_flight = 4
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do with already-created records when a run fails midway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep the partial tree and report it
    #[default]
    LeaveInPlace,
    /// Delete every record this run created, newest first
    Compensate,
}

/// How gateway calls are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Scheduling {
    /// One call at a time, in draft order
    #[default]
    Sequential,
    /// Sibling activity branches in parallel once the program exists
    Concurrent {
        /// Upper bound on branches running at once
        max_in_flight: usize,
    },
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Concurrent branches cannot be reported accurately without compensation
    #[error("concurrent scheduling requires the compensate failure policy")]
    ConcurrentRequiresCompensation,

    /// Zero permits would never start a branch
    #[error("max_in_flight must be at least 1")]
    ZeroConcurrency,

    /// Configuration text could not be parsed
    #[error("invalid configuration: {0}")]
    Parse(String),
}

/// Provisioner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Failure policy
    pub failure_policy: FailurePolicy,
    /// Scheduling mode
    pub scheduling: Scheduling,
    /// Retries per record for retryable delete failures during compensation
    pub compensation_max_retries: u32,
    /// Base delay between compensation retries, multiplied by the attempt
    pub compensation_backoff_ms: u64,
}

impl ProvisionConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With failure policy
    #[inline]
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// With scheduling mode
    #[inline]
    #[must_use]
    pub fn with_scheduling(mut self, scheduling: Scheduling) -> Self {
        self.scheduling = scheduling;
        self
    }

    /// Concurrent scheduling with compensation
    #[inline]
    #[must_use]
    pub fn concurrent(max_in_flight: usize) -> Self {
        Self::default()
            .with_failure_policy(FailurePolicy::Compensate)
            .with_scheduling(Scheduling::Concurrent { max_in_flight })
    }

    /// With compensation retry budget
    #[inline]
    #[must_use]
    pub fn with_compensation_retries(mut self, retries: u32) -> Self {
        self.compensation_max_retries = retries;
        self
    }

    /// With compensation backoff
    #[inline]
    #[must_use]
    pub fn with_compensation_backoff(mut self, backoff: Duration) -> Self {
        self.compensation_backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Delay before the given retry attempt (1-based)
    #[inline]
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.compensation_backoff_ms.saturating_mul(u64::from(attempt)))
    }

    /// Check that the combination of settings is supported
    ///
    /// # Errors
    /// Returns [`ConfigError`] for zero concurrency or concurrent scheduling
    /// without compensation
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Scheduling::Concurrent { max_in_flight } = self.scheduling {
            if max_in_flight == 0 {
                return Err(ConfigError::ZeroConcurrency);
            }
            if self.failure_policy != FailurePolicy::Compensate {
                return Err(ConfigError::ConcurrentRequiresCompensation);
            }
        }
        Ok(())
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] on malformed TOML, or a validation error
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::LeaveInPlace,
            scheduling: Scheduling::Sequential,
            compensation_max_retries: 3,
            compensation_backoff_ms: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_sequential_leave_in_place() {
        let config = ProvisionConfig::default();
        assert_eq!(config.failure_policy, FailurePolicy::LeaveInPlace);
        assert_eq!(config.scheduling, Scheduling::Sequential);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn concurrent_without_compensation_is_rejected() {
        let config = ProvisionConfig::new().with_scheduling(Scheduling::Concurrent { max_in_flight: 2 });
        assert_eq!(config.validate(), Err(ConfigError::ConcurrentRequiresCompensation));
        assert!(ProvisionConfig::concurrent(2).validate().is_ok());
    }

    #[test]
    fn zero_in_flight_is_rejected() {
        assert_eq!(
            ProvisionConfig::concurrent(0).validate(),
            Err(ConfigError::ZeroConcurrency)
        );
    }

    #[test]
    fn parses_toml_with_partial_fields() {
        let config = ProvisionConfig::from_toml_str(
            r#"
            failure_policy = "compensate"
            compensation_backoff_ms = 0

            [scheduling]
            mode = "concurrent"
            max_in_flight = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.scheduling, Scheduling::Concurrent { max_in_flight: 4 });
        assert_eq!(config.compensation_max_retries, 3);
        assert_eq!(config.backoff_for(2), Duration::ZERO);
    }

    #[test]
    fn invalid_toml_combination_fails_validation() {
        let err = ProvisionConfig::from_toml_str("[scheduling]\nmode = \"concurrent\"\nmax_in_flight = 2\n")
            .unwrap_err();
        assert_eq!(err, ConfigError::ConcurrentRequiresCompensation);

        let err = ProvisionConfig::from_toml_str("failure_policy = \"undo\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn backoff_grows_with_attempt() {
        let config = ProvisionConfig::new().with_compensation_backoff(Duration::from_millis(50));
        assert_eq!(config.backoff_for(1), Duration::from_millis(50));
        assert_eq!(config.backoff_for(3), Duration::from_millis(150));
    }
}
