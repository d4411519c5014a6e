use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which non-current, non-persistent location to evict when over capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// The earliest-registered candidate. Not time-ordered: a location that
    /// was registered early and used constantly still goes first.
    #[default]
    FirstRegistered,
    /// The candidate that was current longest ago (never-current first).
    LeastRecentlyUsed,
}

/// Streaming configuration: capacity, delays and eviction policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Capacity of the active set (registered locations, persistent ones included).
    pub max_loaded_locations: usize,
    /// How long a location that was just left survives before its unload is queued.
    pub unload_delay_secs: f32,
    /// Length of each fixed pause inside a pipeline run.
    pub settle_delay_secs: f32,
    pub eviction: EvictionPolicy,
    /// Freeze the scheduler clock while the game is paused.
    pub suspend_while_paused: bool,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            max_loaded_locations: 3,
            unload_delay_secs: 5.0,
            settle_delay_secs: 0.1,
            eviction: EvictionPolicy::FirstRegistered,
            suspend_while_paused: false,
        }
    }
}

/// Errors from streaming configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("max_loaded_locations must be at least 1")]
    ZeroCapacity,
    #[error("{field} must be a finite, non-negative number of seconds within Duration range (got {value})")]
    InvalidDelay { field: &'static str, value: f32 },
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl StreamingConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_loaded_locations == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        for (field, value) in [
            ("unload_delay_secs", self.unload_delay_secs),
            ("settle_delay_secs", self.settle_delay_secs),
        ] {
            if Duration::try_from_secs_f32(value).is_err() {
                return Err(ConfigError::InvalidDelay { field, value });
            }
        }
        Ok(())
    }

    pub fn unload_delay(&self) -> Duration {
        seconds(self.unload_delay_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        seconds(self.settle_delay_secs)
    }
}

/// Out-of-range values saturate instead of panicking; `validate` rejects them.
fn seconds(value: f32) -> Duration {
    match Duration::try_from_secs_f32(value) {
        Ok(duration) => duration,
        Err(_) if value > 0.0 => Duration::MAX,
        Err(_) => Duration::ZERO,
    }
}
