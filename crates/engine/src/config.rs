use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use daybook_core::document::{DEFAULT_COLOR, DEFAULT_TITLE};
use daybook_storage::SchemaOptions;

use crate::error::EngineError;
use crate::history::DEFAULT_HISTORY_LIMIT;

pub const DB_PATH_ENV: &str = "DAYBOOK_DB_PATH";
pub const HISTORY_LIMIT_ENV: &str = "DAYBOOK_HISTORY_LIMIT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    pub database_path: PathBuf,
    pub history_limit: usize,
    pub default_title: String,
    pub default_color: String,
    /// Quiet period before a content edit is written.
    pub write_debounce_ms: u64,
    pub listing_max_age_secs: u64,
    /// Let the store reject a second entry for the same lineage and day
    /// instead of leaving the duplicate for the reconciler.
    pub enforce_lineage_date_unique: bool,
    pub logging: LoggingConfig,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("daybook.db"),
            history_limit: DEFAULT_HISTORY_LIMIT,
            default_title: DEFAULT_TITLE.to_string(),
            default_color: DEFAULT_COLOR.to_string(),
            write_debounce_ms: 1000,
            listing_max_age_secs: 30,
            enforce_lineage_date_unique: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl JournalConfig {
    pub fn schema_options(&self) -> SchemaOptions {
        SchemaOptions {
            enforce_lineage_date_unique: self.enforce_lineage_date_unique,
        }
    }

    pub fn write_debounce(&self) -> Duration {
        Duration::milliseconds(self.write_debounce_ms as i64)
    }

    pub fn listing_max_age(&self) -> Duration {
        Duration::seconds(self.listing_max_age_secs as i64)
    }

    /// The history cap actually applied. Zero means the default and nothing
    /// goes above `DEFAULT_HISTORY_LIMIT`.
    pub fn effective_history_limit(&self) -> usize {
        match self.history_limit {
            0 => DEFAULT_HISTORY_LIMIT,
            limit => limit.min(DEFAULT_HISTORY_LIMIT),
        }
    }

    /// Pull out-of-range values back into range, warning about each one.
    pub fn normalize(&mut self) {
        if self.history_limit == 0 {
            tracing::warn!("history_limit must be positive, using {DEFAULT_HISTORY_LIMIT}");
            self.history_limit = DEFAULT_HISTORY_LIMIT;
        } else if self.history_limit > DEFAULT_HISTORY_LIMIT {
            tracing::warn!(
                requested = self.history_limit,
                "history_limit capped at {DEFAULT_HISTORY_LIMIT}"
            );
            self.history_limit = DEFAULT_HISTORY_LIMIT;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `DAYBOOK_LOG` is unset.
    pub filter: String,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            with_target: true,
        }
    }
}

pub fn from_toml_str(contents: &str) -> Result<JournalConfig, EngineError> {
    let mut config: JournalConfig = toml::from_str(contents)
        .map_err(|e| EngineError::Config(format!("failed to parse config: {e}")))?;
    config.normalize();
    Ok(config)
}

pub fn to_toml_string(config: &JournalConfig) -> Result<String, EngineError> {
    toml::to_string_pretty(config)
        .map_err(|e| EngineError::Config(format!("failed to render config: {e}")))
}

/// Load `path`, falling back to defaults when it does not exist, then apply
/// environment overrides.
pub fn load(path: &Path) -> Result<JournalConfig, EngineError> {
    let mut config: JournalConfig = if path.exists() {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("failed to parse {}: {e}", path.display())))?
    } else {
        JournalConfig::default()
    };
    apply_env_overrides(&mut config);
    config.normalize();
    Ok(config)
}

pub fn apply_env_overrides(config: &mut JournalConfig) {
    if let Ok(raw) = std::env::var(DB_PATH_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            config.database_path = PathBuf::from(trimmed);
        }
    }

    if let Ok(raw) = std::env::var(HISTORY_LIMIT_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            match trimmed.parse::<usize>() {
                Ok(0) => {
                    tracing::warn!("{HISTORY_LIMIT_ENV} must be positive, ignoring");
                }
                Ok(value) => {
                    config.history_limit = value.min(DEFAULT_HISTORY_LIMIT);
                }
                Err(err) => {
                    tracing::warn!("invalid {HISTORY_LIMIT_ENV}, ignoring: {err}");
                }
            }
        }
    }
}
