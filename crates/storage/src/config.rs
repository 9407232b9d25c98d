//! Storage configuration.
//!
//! Deserializable knobs for the composition root (CLI or service
//! bootstrap, both external to this crate).

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Storage core configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path of the database file.
    pub path: PathBuf,
    /// Entities older than this many hours are swept.
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,
    /// Sweep scheduler configuration.
    #[serde(default)]
    pub sweep: SweepConfig,
}

impl StoreConfig {
    /// Maximum entity age as a duration.
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours * 3600)
    }
}

/// Sweep scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    /// Seconds between sweep cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Maximum expired entries to delete per collection per cycle.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

impl SweepConfig {
    /// Interval between cycles as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_batch_size: default_max_batch_size(),
        }
    }
}

fn default_max_age_hours() -> u64 {
    24
}

fn default_interval_secs() -> u64 {
    crate::sweep::SWEEP_INTERVAL.as_secs()
}

fn default_max_batch_size() -> usize {
    crate::sweep::MAX_BATCH_SIZE
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"path": "hooks.db"}"#).expect("parse");

        assert_eq!(config.path, PathBuf::from("hooks.db"));
        assert_eq!(config.max_age_hours, 24);
        assert_eq!(config.max_age(), Duration::from_secs(24 * 3600));
        assert_eq!(config.sweep.interval_secs, 10);
        assert_eq!(config.sweep.max_batch_size, 1000);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config: StoreConfig = serde_json::from_str(
            r#"{
                "path": "/var/lib/hookbin/hooks.db",
                "max_age_hours": 48,
                "sweep": {"interval_secs": 30, "max_batch_size": 100}
            }"#,
        )
        .expect("parse");

        assert_eq!(config.max_age_hours, 48);
        assert_eq!(config.sweep.interval(), Duration::from_secs(30));
        assert_eq!(config.sweep.max_batch_size, 100);
    }
}
