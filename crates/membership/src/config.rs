//! Engine configuration

use std::env;
use std::future::Future;
use std::time::Duration;

use regulars_shared::{MembershipError, MembershipResult};

/// Tunables for the engine, loaded from environment variables
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Deadline applied to every repository, OTP, and card-vault call
    pub call_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(12),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let secs = match env::var("REGULARS_CALL_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                ConfigError::InvalidTimeout(
                    "REGULARS_CALL_TIMEOUT_SECS must be an integer number of seconds",
                )
            })?,
            Err(_) => 12,
        };

        if !(1..=60).contains(&secs) {
            return Err(ConfigError::InvalidTimeout(
                "REGULARS_CALL_TIMEOUT_SECS must be between 1 and 60",
            ));
        }

        Ok(Self {
            call_timeout: Duration::from_secs(secs),
        })
    }

    /// Run a port call under the configured deadline.
    ///
    /// An elapsed deadline surfaces as a retryable repository error naming
    /// the operation.
    pub(crate) async fn bounded<T, F>(&self, operation: &str, fut: F) -> MembershipResult<T>
    where
        F: Future<Output = MembershipResult<T>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                let secs = self.call_timeout.as_secs();
                tracing::warn!(
                    operation = operation,
                    timeout_secs = secs,
                    "Port call outran its deadline"
                );
                Err(MembershipError::timeout(operation, secs))
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(&'static str),
}
