//! Session configuration module
//!
//! Tuning knobs for one session peer manager instance.

use anyhow::Result;
use std::time::Duration;

/// Configuration for a session peer manager
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum number of peers returned by a candidate query
    pub max_returned_peers: usize,
    /// Capacity of the manager's command queue
    pub command_queue_size: usize,
    /// Connection-priority weight applied to every session peer
    pub tag_weight: i32,
    /// Window after which an unanswered request is credited as a slow response
    pub request_timeout: Duration,
    /// Weight of the newest latency sample when folding into a peer's average
    pub latency_smoothing: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_returned_peers: 32,
            command_queue_size: 16,
            tag_weight: 5,
            request_timeout: Duration::from_secs(5),
            latency_smoothing: 0.5,
        }
    }
}

impl SessionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_returned_peers == 0 {
            return Err(anyhow::anyhow!("max_returned_peers must be at least 1"));
        }

        if self.command_queue_size == 0 {
            return Err(anyhow::anyhow!("command_queue_size must be at least 1"));
        }

        if self.request_timeout == Duration::ZERO {
            return Err(anyhow::anyhow!("request_timeout cannot be zero"));
        }

        if !(self.latency_smoothing > 0.0 && self.latency_smoothing <= 1.0) {
            return Err(anyhow::anyhow!("latency_smoothing must be in (0, 1]"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_returned_peers, 32);
        assert_eq!(config.command_queue_size, 16);
        assert_eq!(config.tag_weight, 5);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.latency_smoothing, 0.5);
    }

    #[test]
    fn test_validate_zero_cap() {
        let config = SessionConfig {
            max_returned_peers: 0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_queue() {
        let config = SessionConfig {
            command_queue_size: 0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = SessionConfig {
            request_timeout: Duration::ZERO,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_smoothing_out_of_range() {
        let config = SessionConfig {
            latency_smoothing: 0.0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SessionConfig {
            latency_smoothing: 1.5,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
