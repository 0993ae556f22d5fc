//! TOML-based engine configuration.
//!
//! Stores engine tuning including:
//! - Overdue sweep interval and grace period
//! - Timezone anchor (fixed UTC offset)
//! - Reminder lead time and catch-up horizon
//! - Adherence bucket thresholds
//!
//! Configuration is read from `~/.config/carecadence/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::{Duration, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::adherence::AdherenceThresholds;
use crate::error::ConfigError;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between overdue sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Minutes past the scheduled time before an occurrence counts as missed.
    #[serde(default)]
    pub grace_period_minutes: u32,
    /// Local wall-clock offset from UTC in minutes.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Minutes ahead of an occurrence to send a reminder; 0 disables.
    #[serde(default)]
    pub reminder_lead_minutes: u32,
    /// How many past days a sweep back-fills after a gap.
    #[serde(default = "default_catch_up_days")]
    pub catch_up_days: u32,
    /// Notifications kept by the in-memory notification center.
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,
    #[serde(default)]
    pub adherence: AdherenceThresholds,
}

fn default_sweep_interval_secs() -> u64 {
    60
}
fn default_catch_up_days() -> u32 {
    7
}
fn default_notification_capacity() -> usize {
    200
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            grace_period_minutes: 0,
            utc_offset_minutes: 0,
            reminder_lead_minutes: 0,
            catch_up_days: default_catch_up_days(),
            notification_capacity: default_notification_capacity(),
            adherence: AdherenceThresholds::default(),
        }
    }
}

/// Returns `~/.config/carecadence[-dev]/` based on CARECADENCE_ENV.
///
/// Set CARECADENCE_ENV=dev to use the development directory.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .ok_or_else(|| ConfigError::DirUnavailable("no home directory".into()))?;

    let env = std::env::var("CARECADENCE_ENV").unwrap_or_else(|_| "production".to_string());
    Ok(if env == "dev" {
        base_dir.join("carecadence-dev")
    } else {
        base_dir.join("carecadence")
    })
}

impl EngineConfig {
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(config_dir()?.join("config.toml"))
    }

    /// Load from the default location, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or
    /// validated.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load and validate a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let cfg: EngineConfig = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval_secs == 0 {
            return Err(invalid("sweep_interval_secs", "must be at least 1"));
        }
        if self.utc_offset_minutes.abs() > 18 * 60 {
            return Err(invalid("utc_offset_minutes", "must be within ±1080"));
        }
        if self.notification_capacity == 0 {
            return Err(invalid("notification_capacity", "must be at least 1"));
        }
        let t = &self.adherence;
        if t.excellent_threshold > 100 {
            return Err(invalid("adherence.excellent_threshold", "must be at most 100"));
        }
        if t.moderate_threshold > t.excellent_threshold {
            return Err(invalid(
                "adherence.moderate_threshold",
                "must not exceed excellent_threshold",
            ));
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return None;
        }
        let mut current = serde_json::to_value(self).ok()?;
        for part in key.split('.') {
            current = current.get(part)?.clone();
        }
        match current {
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }

    pub fn sweep_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.sweep_interval_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::minutes(i64::from(self.grace_period_minutes))
    }

    pub fn reminder_lead(&self) -> Option<Duration> {
        (self.reminder_lead_minutes > 0)
            .then(|| Duration::minutes(i64::from(self.reminder_lead_minutes)))
    }

    /// Fixed offset used to turn instants into local wall-clock time.
    pub fn timezone(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_roundtrip() {
        let cfg = EngineConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed = EngineConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.sweep_interval_secs, 60);
        assert_eq!(parsed.adherence.excellent_threshold, 95);
    }

    #[test]
    fn partial_file_uses_defaults() {
        let cfg = EngineConfig::from_toml("grace_period_minutes = 10\n[adherence]\nmoderate_threshold = 80\n").unwrap();
        assert_eq!(cfg.grace_period(), Duration::minutes(10));
        assert_eq!(cfg.adherence.moderate_threshold, 80);
        assert_eq!(cfg.adherence.excellent_threshold, 95);
        assert_eq!(cfg.catch_up_days, 7);
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(EngineConfig::from_toml("sweep_interval_secs = 0").is_err());
        assert!(EngineConfig::from_toml("utc_offset_minutes = 2000").is_err());
        assert!(EngineConfig::from_toml("[adherence]\nexcellent_threshold = 80\nmoderate_threshold = 90").is_err());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.get("sweep_interval_secs").as_deref(), Some("60"));
        assert_eq!(cfg.get("adherence.moderate_threshold").as_deref(), Some("85"));
        assert!(cfg.get("adherence.missing").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn load_from_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "utc_offset_minutes = -300\nreminder_lead_minutes = 15").unwrap();
        let cfg = EngineConfig::load_from(file.path()).unwrap();
        assert_eq!(cfg.timezone().local_minus_utc(), -300 * 60);
        assert_eq!(cfg.reminder_lead(), Some(Duration::minutes(15)));
    }

    #[test]
    fn load_from_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::LoadFailed { .. }));
    }
}
