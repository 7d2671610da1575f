//! Configuration system for source scheduling
//!
//! This module provides a profile-based configuration that resolves into
//! [`SourcesConfig`]. Presets cover the common cases; `Custom` carries a
//! hand-built or deserialized configuration.

use crate::core::constants::{GEOJSON_WORKER_THREADS, VECTOR_WORKER_THREADS};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do with a style source whose type this build does not understand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedSourcePolicy {
    /// Drop the source without any signal
    #[default]
    Ignore,
    /// Drop the source and log a warning
    Warn,
    /// Refuse to build the orchestrator
    Reject,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerProfile {
    Balanced,
    LowResource,
    HighPerformance,
    Custom(SourcesConfig),
}

impl SchedulerProfile {
    pub fn resolve(&self) -> SourcesConfig {
        match self {
            Self::Balanced => SourcesConfig {
                unsupported_sources: UnsupportedSourcePolicy::Ignore,
                tile_cache_size: 1024,
                max_retries: 3,
                retry_delay_ms: 500,
                exponential_backoff: true,
                vector_threads: VECTOR_WORKER_THREADS,
                geojson_threads: GEOJSON_WORKER_THREADS,
                driver: DriverConfig {
                    max_concurrent: 16,
                    idle_delay_ms: 10,
                },
            },
            Self::LowResource => SourcesConfig {
                unsupported_sources: UnsupportedSourcePolicy::Ignore,
                tile_cache_size: 256,
                max_retries: 1,
                retry_delay_ms: 1000,
                exponential_backoff: false,
                vector_threads: 1,
                geojson_threads: 1,
                driver: DriverConfig {
                    max_concurrent: 4,
                    idle_delay_ms: 25,
                },
            },
            Self::HighPerformance => SourcesConfig {
                unsupported_sources: UnsupportedSourcePolicy::Ignore,
                tile_cache_size: 4096,
                max_retries: 5,
                retry_delay_ms: 250,
                exponential_backoff: true,
                vector_threads: 4,
                geojson_threads: GEOJSON_WORKER_THREADS,
                driver: DriverConfig {
                    max_concurrent: 64,
                    idle_delay_ms: 5,
                },
            },
            Self::Custom(config) => config.clone(),
        }
    }
}

impl Default for SchedulerProfile {
    fn default() -> Self {
        Self::Balanced
    }
}

/// Settings shared by the orchestrator and every tile factory it builds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub unsupported_sources: UnsupportedSourcePolicy,
    /// Loaded or failed tiles kept per source
    pub tile_cache_size: usize,
    /// Re-requests allowed for a tile whose load failed
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub exponential_backoff: bool,
    pub vector_threads: usize,
    pub geojson_threads: usize,
    pub driver: DriverConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        SchedulerProfile::default().resolve()
    }
}

impl SourcesConfig {
    /// Parse a configuration from JSON; omitted fields take the balanced defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tile_cache_size == 0 {
            return Err(Error::Config("tile_cache_size must be at least 1".into()));
        }
        if self.driver.max_concurrent == 0 {
            return Err(Error::Config("driver.max_concurrent must be at least 1".into()));
        }
        Ok(())
    }

    pub fn with_unsupported_sources(mut self, policy: UnsupportedSourcePolicy) -> Self {
        self.unsupported_sources = policy;
        self
    }

    /// Delay before the attempt after `retry_count` failures may be made
    pub fn retry_delay(&self, retry_count: u32) -> Duration {
        let base = Duration::from_millis(self.retry_delay_ms);
        if self.exponential_backoff && retry_count > 1 {
            base * 2_u32.saturating_pow(retry_count.saturating_sub(1).min(16))
        } else {
            base
        }
    }
}

/// Settings for the background queue driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Tasks allowed to run at once
    pub max_concurrent: usize,
    /// Pause between polls of the queue
    pub idle_delay_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        SchedulerProfile::default().resolve().driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_balanced() {
        assert_eq!(SourcesConfig::default(), SchedulerProfile::Balanced.resolve());
        assert_eq!(
            SourcesConfig::default().unsupported_sources,
            UnsupportedSourcePolicy::Ignore
        );
    }

    #[test]
    fn test_custom_profile_passes_through() {
        let custom = SourcesConfig {
            tile_cache_size: 7,
            ..Default::default()
        };
        assert_eq!(SchedulerProfile::Custom(custom.clone()).resolve(), custom);
    }

    #[test]
    fn test_from_json_fills_missing_fields() {
        let config =
            SourcesConfig::from_json(r#"{ "unsupported_sources": "warn", "max_retries": 0 }"#)
                .unwrap();
        assert_eq!(config.unsupported_sources, UnsupportedSourcePolicy::Warn);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.tile_cache_size, SourcesConfig::default().tile_cache_size);
    }

    #[test]
    fn test_from_json_rejects_zero_cache() {
        let err = SourcesConfig::from_json(r#"{ "tile_cache_size": 0 }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_retry_delay_backoff() {
        let config = SourcesConfig {
            retry_delay_ms: 100,
            exponential_backoff: true,
            ..Default::default()
        };
        assert_eq!(config.retry_delay(1), Duration::from_millis(100));
        assert_eq!(config.retry_delay(2), Duration::from_millis(200));
        assert_eq!(config.retry_delay(3), Duration::from_millis(400));

        let flat = SourcesConfig {
            exponential_backoff: false,
            ..config
        };
        assert_eq!(flat.retry_delay(3), Duration::from_millis(100));
    }
}
