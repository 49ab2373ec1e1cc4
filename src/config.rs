//! Configuration for the index assembler.
//!
//! # Example
//!
//! ```
//! use geo_range_index::AssemblerConfig;
//!
//! // Minimal config (uses defaults)
//! let config = AssemblerConfig::default();
//! assert_eq!(config.max_node_bytes, 256 * 1024); // 256 KiB
//!
//! // Tighter budget, fewer parallel writes
//! let config = AssemblerConfig {
//!     max_node_bytes: 64 * 1024,
//!     max_concurrent_writes: 4,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use serde::Deserialize;
use std::time::Duration;

use crate::resilience::retry::RetryConfig;

/// Configuration for the index assembler.
#[derive(Debug, Clone, Deserialize)]
pub struct AssemblerConfig {
    /// Largest stored size (bytes) any object in the tree may have
    #[serde(default = "default_max_node_bytes")]
    pub max_node_bytes: u64,

    /// Sibling objects written to the store at the same time
    #[serde(default = "default_max_concurrent_writes")]
    pub max_concurrent_writes: usize,

    /// Whole-fold attempts on transient store failures (1 = no retry)
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Retry backoff settings
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

fn default_max_node_bytes() -> u64 { 256 * 1024 } // 256 KiB
fn default_max_concurrent_writes() -> usize { 16 }
fn default_max_retries() -> usize { 3 }
fn default_retry_initial_delay_ms() -> u64 { 100 }
fn default_retry_max_delay_ms() -> u64 { 2000 }

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_node_bytes: default_max_node_bytes(),
            max_concurrent_writes: default_max_concurrent_writes(),
            max_retries: default_max_retries(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl AssemblerConfig {
    /// Config with the given budget and defaults for everything else.
    #[must_use]
    pub fn with_budget(max_node_bytes: u64) -> Self {
        Self {
            max_node_bytes,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_node_bytes == 0 {
            return Err("max_node_bytes must be greater than zero".into());
        }
        if self.max_concurrent_writes == 0 {
            return Err("max_concurrent_writes must be greater than zero".into());
        }
        if self.max_retries == 0 {
            return Err("max_retries must be at least 1".into());
        }
        Ok(())
    }

    /// Backoff policy derived from the retry fields.
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: Some(self.max_retries),
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AssemblerConfig::default();
        assert_eq!(config.max_node_bytes, 256 * 1024);
        assert_eq!(config.max_concurrent_writes, 16);
        assert_eq!(config.max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_uses_defaults() {
        let config: AssemblerConfig =
            serde_json::from_str(r#"{"max_node_bytes": 1024}"#).unwrap();
        assert_eq!(config.max_node_bytes, 1024);
        assert_eq!(config.max_concurrent_writes, 16);
        assert_eq!(config.retry_max_delay_ms, 2000);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(AssemblerConfig::with_budget(0).validate().is_err());

        let config = AssemblerConfig { max_concurrent_writes: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = AssemblerConfig { max_retries: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_config_mirrors_fields() {
        let config = AssemblerConfig {
            max_retries: 5,
            retry_initial_delay_ms: 10,
            retry_max_delay_ms: 50,
            ..Default::default()
        };
        let retry = config.retry_config();
        assert_eq!(retry.max_attempts, Some(5));
        assert_eq!(retry.initial_delay, Duration::from_millis(10));
        assert_eq!(retry.max_delay, Duration::from_millis(50));

        assert_eq!(AssemblerConfig::default().retry_config(), RetryConfig::interactive());
    }
}
