//! Configuration management
//!
//! Strongly-typed configuration with TOML support. Every section has
//! defaults, so an empty file is a valid configuration.

use crate::error::{Error, Result};
use crate::reassembler::{OverflowPolicy, ReassemblerLimits};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pending buffer limits
    pub reassembly: ReassemblyConfig,

    /// Stream lifecycle settings
    pub stream: StreamConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| Error::ConfigNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Error::from)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.reassembly.max_pending_segments == Some(0) {
            return Err(Error::config_value(
                "reassembly.max_pending_segments",
                "Must be non-zero (omit it for no limit)",
            ));
        }
        if self.reassembly.max_pending_bytes == Some(0) {
            return Err(Error::config_value(
                "reassembly.max_pending_bytes",
                "Must be non-zero (omit it for no limit)",
            ));
        }
        if self.stream.idle_timeout_secs == 0 {
            return Err(Error::config_value(
                "stream.idle_timeout_secs",
                "Must be at least 1 second",
            ));
        }

        Ok(())
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Caps on each reassembler's out-of-order buffer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReassemblyConfig {
    /// Maximum buffered segments per stream (None = unlimited)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pending_segments: Option<usize>,
    /// Maximum buffered bytes per stream (None = unlimited)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pending_bytes: Option<usize>,
    /// What to do when a cap is hit
    pub overflow_policy: OverflowPolicy,
}

impl ReassemblyConfig {
    /// Limits to hand to a reassembler
    pub fn limits(&self) -> ReassemblerLimits {
        ReassemblerLimits {
            max_segments: self.max_pending_segments,
            max_bytes: self.max_pending_bytes,
            overflow: self.overflow_policy,
        }
    }
}

/// Stream lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Seconds without traffic after which a stream counts as idle
    pub idle_timeout_secs: u64,
}

impl StreamConfig {
    /// Idle timeout as a duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 30,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Enable JSON format logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.reassembly.max_pending_segments, None);
        assert_eq!(config.reassembly.max_pending_bytes, None);
        assert_eq!(config.reassembly.overflow_policy, OverflowPolicy::DropNew);
        assert_eq!(config.stream.idle_timeout_secs, 30);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_limits_unbounded() {
        let limits = Config::default().reassembly.limits();
        assert!(!limits.is_bounded());
    }

    #[test]
    fn test_validation_zero_caps() {
        let mut config = Config::default();
        config.reassembly.max_pending_segments = Some(0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.reassembly.max_pending_bytes = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let mut config = Config::default();
        config.stream.idle_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_parse() {
        let config = Config::from_toml(
            r#"
[reassembly]
max_pending_segments = 64
max_pending_bytes = 65536
overflow_policy = "evict-furthest"

[stream]
idle_timeout_secs = 120
"#,
        )
        .unwrap();

        let limits = config.reassembly.limits();
        assert_eq!(limits.max_segments, Some(64));
        assert_eq!(limits.max_bytes, Some(65536));
        assert_eq!(limits.overflow, OverflowPolicy::EvictFurthest);
        assert_eq!(config.stream.idle_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_toml_parse_invalid() {
        assert!(Config::from_toml("this is not [valid toml").is_err());
        assert!(Config::from_toml("[reassembly]\noverflow_policy = \"shrug\"").is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = Config::default();
        config.reassembly.max_pending_bytes = Some(1 << 20);
        let parsed = Config::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed.reassembly.max_pending_bytes, Some(1 << 20));
        assert_eq!(parsed.reassembly.max_pending_segments, None);
    }
}
