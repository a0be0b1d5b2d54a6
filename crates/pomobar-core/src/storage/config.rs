//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Tick cadence and the milestone message window
//! - Preset session lengths
//! - Milestone thresholds and optional message overrides
//!
//! Configuration is stored at `~/.config/pomobar/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::driver::DriverSettings;
use crate::error::ConfigError;
use crate::timer::{EngineSettings, MessageCatalog, MilestoneKind};

/// Countdown cadence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimerConfig {
    /// Period of the tick callback. Must be between 1 and 1000 ms.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// How long a milestone message stays up.
    #[serde(default = "default_message_window_ms")]
    pub message_window_ms: u64,
    /// Session lengths offered by front-ends, in minutes.
    #[serde(default = "default_presets")]
    pub presets: Vec<u64>,
}

/// Milestone configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MilestoneConfig {
    /// Remaining fraction at which the halfway message fires.
    #[serde(default = "default_halfway_threshold")]
    pub halfway_threshold: f64,
    /// Remaining fraction at which the almost-there message fires.
    #[serde(default = "default_almost_there_threshold")]
    pub almost_there_threshold: f64,
    /// Fixed seed for message selection (reproducible runs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halfway: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub almost_there: Option<Vec<String>>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/pomobar/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub milestones: MilestoneConfig,
}

// Default functions
fn default_tick_interval_ms() -> u64 {
    250
}
fn default_message_window_ms() -> u64 {
    3000
}
fn default_presets() -> Vec<u64> {
    vec![5, 15, 30]
}
fn default_halfway_threshold() -> f64 {
    0.5
}
fn default_almost_there_threshold() -> f64 {
    1.0 / 3.0
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            message_window_ms: default_message_window_ms(),
            presets: default_presets(),
        }
    }
}

impl Default for MilestoneConfig {
    fn default() -> Self {
        Self {
            halfway_threshold: default_halfway_threshold(),
            almost_there_threshold: default_almost_there_threshold(),
            seed: None,
            halfway: None,
            almost_there: None,
        }
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || invalid(key, "unknown config key");
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(invalid(key, "config key is empty"));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                // Unset optional fields are skipped on serialization.
                let existing = obj.get(part).cloned().unwrap_or(serde_json::Value::Null);

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(key, e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(key, format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(key, format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(key, e.to_string()))?
                    }
                    serde_json::Value::Null => serde_json::from_str(value)
                        .unwrap_or_else(|_| serde_json::Value::String(value.into())),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/pomobar"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults there when it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by key without saving. Fails on unknown keys, unparsable
    /// values, or a result that does not validate.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(key, e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| invalid(key, e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Check ranges and cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tick = self.timer.tick_interval_ms;
        if !(1..=1000).contains(&tick) {
            return Err(invalid(
                "timer.tick_interval_ms",
                format!("{tick} is outside 1..=1000"),
            ));
        }
        if self.timer.presets.iter().any(|&m| m == 0) {
            return Err(invalid("timer.presets", "presets must be positive"));
        }

        let half = self.milestones.halfway_threshold;
        let near = self.milestones.almost_there_threshold;
        for (key, value) in [
            ("milestones.halfway_threshold", half),
            ("milestones.almost_there_threshold", near),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(invalid(key, format!("{value} is outside (0, 1]")));
            }
        }
        if near > half {
            return Err(invalid(
                "milestones.almost_there_threshold",
                "must not exceed milestones.halfway_threshold",
            ));
        }

        self.catalog().map(|_| ())
    }

    fn catalog(&self) -> Result<MessageCatalog, ConfigError> {
        let defaults = MessageCatalog::default();
        let pick = |custom: &Option<Vec<String>>, kind: MilestoneKind| {
            custom
                .clone()
                .unwrap_or_else(|| defaults.messages(kind).to_vec())
        };
        MessageCatalog::new(
            pick(&self.milestones.halfway, MilestoneKind::Halfway),
            pick(&self.milestones.almost_there, MilestoneKind::AlmostThere),
        )
    }

    pub fn engine_settings(&self) -> Result<EngineSettings, ConfigError> {
        self.validate()?;
        Ok(EngineSettings {
            halfway_threshold: self.milestones.halfway_threshold,
            almost_there_threshold: self.milestones.almost_there_threshold,
            catalog: self.catalog()?,
            seed: self.milestones.seed,
        })
    }

    pub fn driver_settings(&self) -> DriverSettings {
        DriverSettings {
            tick_interval: Duration::from_millis(self.timer.tick_interval_ms.clamp(1, 1000)),
            message_window: Duration::from_millis(self.timer.message_window_ms),
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
