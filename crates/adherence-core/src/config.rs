//! TOML-based engine configuration.
//!
//! Stores the settings that callers would otherwise hard-code:
//! - Local UTC offset used for streak day boundaries
//! - Local UTC offset used for dosage time windows
//! - Full regeneration interval for the rolling summary
//!
//! Configuration is stored at `~/.config/adherence/engine.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dosage::DosageConstraintValidator;
use crate::error::{ConfigError, ValidationError};
use crate::streak::StreakCalculator;
use crate::summary::{SummaryRegenerationPolicy, DEFAULT_FULL_REGENERATION_INTERVAL};
use crate::time_window::{offset_from_minutes, MAX_UTC_OFFSET_MINUTES};

const CONFIG_FILE_NAME: &str = "engine.toml";

/// Streak-specific configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakConfig {
    /// Minutes east of UTC for calendar-day boundaries
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

/// Summary regeneration configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default = "default_full_regeneration_interval")]
    pub full_regeneration_interval: u32,
}

/// Dosage validation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DosageConfig {
    /// Minutes east of UTC for active time windows
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

/// Engine configuration.
///
/// Serialized to/from TOML at `~/.config/adherence/engine.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub streak: StreakConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub dosage: DosageConfig,
}

fn default_full_regeneration_interval() -> u32 {
    DEFAULT_FULL_REGENERATION_INTERVAL
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            full_regeneration_interval: default_full_regeneration_interval(),
        }
    }
}

impl Default for DosageConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
        }
    }
}

/// Returns `~/.config/adherence[-dev]/` based on ADHERENCE_ENV.
///
/// Set ADHERENCE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("ADHERENCE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("adherence-dev")
    } else {
        base_dir.join("adherence")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::LoadFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}

impl EngineConfig {
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
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as integer")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: EngineConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Persist to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from the default location, writing defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::info!("No engine config at {}; writing defaults", path.display());
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Falling back to default engine config: {}", e);
            Self::default()
        })
    }

    /// Check ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, minutes) in [
            ("streak.utc_offset_minutes", self.streak.utc_offset_minutes),
            ("dosage.utc_offset_minutes", self.dosage.utc_offset_minutes),
        ] {
            if offset_from_minutes(minutes).is_none() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!(
                        "offset must be within ±{} minutes, got {}",
                        MAX_UTC_OFFSET_MINUTES, minutes
                    ),
                });
            }
        }

        if self.summary.full_regeneration_interval == 0 {
            return Err(ConfigError::InvalidValue {
                key: "summary.full_regeneration_interval".to_string(),
                message: ValidationError::InvalidInterval(0).to_string(),
            });
        }
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

    /// Set a config value by key. The caller decides whether to persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// or fails validation; `self` is left unchanged in that case.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: EngineConfig = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    pub fn streak_calculator(&self) -> Result<StreakCalculator, ConfigError> {
        let offset = self.offset("streak.utc_offset_minutes", self.streak.utc_offset_minutes)?;
        Ok(StreakCalculator::with_offset(offset))
    }

    pub fn dosage_validator(&self) -> Result<DosageConstraintValidator, ConfigError> {
        let offset = self.offset("dosage.utc_offset_minutes", self.dosage.utc_offset_minutes)?;
        Ok(DosageConstraintValidator::with_offset(offset))
    }

    pub fn regeneration_policy(&self) -> Result<SummaryRegenerationPolicy, ConfigError> {
        SummaryRegenerationPolicy::with_interval(self.summary.full_regeneration_interval).map_err(|e| {
            ConfigError::InvalidValue {
                key: "summary.full_regeneration_interval".to_string(),
                message: e.to_string(),
            }
        })
    }

    fn offset(&self, key: &str, minutes: i32) -> Result<chrono::FixedOffset, ConfigError> {
        offset_from_minutes(minutes).ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("offset {} minutes is out of range", minutes),
        })
    }
}
