//! Timeout Helpers
//!
//! Every outbound call in the pipeline is bounded. An elapsed deadline
//! becomes [`TaleError::Timeout`] and is handled like any other upstream
//! failure by the caller.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::ai::timeout::{TimeoutConfig, with_timeout};
//!
//! let timeouts = TimeoutConfig::from_config(&config);
//! let text = with_timeout(timeouts.text_request, client.invoke(&prompt), "text generation").await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::config::Config;
use crate::constants::network;
use crate::types::{Result, TaleError};

/// Deadlines for each kind of outbound call
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// One text-generation call (default: 120 seconds)
    pub text_request: Duration,
    /// One image provider call (default: 60 seconds)
    pub image_request: Duration,
    /// Backend health probe (default: 10 seconds)
    pub health_check: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            text_request: Duration::from_secs(network::TEXT_TIMEOUT_SECS),
            image_request: Duration::from_secs(network::IMAGE_TIMEOUT_SECS),
            health_check: Duration::from_secs(network::HEALTH_TIMEOUT_SECS),
        }
    }
}

impl TimeoutConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            text_request: Duration::from_secs(config.llm.timeout_secs),
            image_request: Duration::from_secs(config.image.timeout_secs),
            ..Self::default()
        }
    }
}

/// Execute an async operation with a timeout
///
/// Returns a timeout error if the operation doesn't complete within the specified duration.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(TaleError::timeout(operation_name, timeout)),
    }
}
