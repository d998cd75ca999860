//! TOML-based configuration for seedscope.
//!
//! Supports a config file (seedscope.toml) with environment variable
//! expansion in path values.
//!
//! Example configuration:
//! ```toml
//! [detection]
//! max_concurrent_queries = 8
//! query_timeout_ms = 5000
//! max_execution_time_ms = 30000
//! min_strategy_confidence = 0.5
//!
//! [cache]
//! enabled = true
//! ttl_seconds = 3600
//! path = "${HOME}/.cache/seedscope/detections.json"
//!
//! [logging]
//! verbosity = "verbose"
//!
//! [framework]
//! kind = "makerkit"
//! version = "v2"
//! personal_accounts = true
//! team_accounts = true
//!
//! [configuration]
//! mode = "optimized"
//! user_count = 50
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::configure::{ConfigOverrides, GenerationMode, MAX_USER_COUNT};
use crate::introspect::ProbeOptions;
use crate::strategy::{FrameworkProfile, ProfileError};
use crate::telemetry::Verbosity;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid framework profile: {0}")]
    InvalidFramework(#[from] ProfileError),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

impl SettingsError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Main settings structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Introspection limits and strategy selection.
    pub detection: DetectionSettings,

    /// Detection result cache.
    pub cache: CacheSettings,

    pub logging: LoggingSettings,

    /// Explicit framework profile; skips framework detection when set.
    pub framework: Option<FrameworkProfile>,

    /// Auto-configuration defaults.
    pub configuration: ConfigurationSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Maximum number of in-flight introspection queries.
    pub max_concurrent_queries: usize,

    /// Timeout for a single introspection query.
    pub query_timeout_ms: u64,

    /// Timeout for a whole introspection pass.
    pub max_execution_time_ms: u64,

    /// Minimum confidence for a detected strategy to win without override.
    pub min_strategy_confidence: f64,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        let probe = ProbeOptions::default();
        Self {
            max_concurrent_queries: probe.max_concurrent_queries,
            query_timeout_ms: u64::try_from(probe.query_timeout.as_millis()).unwrap_or(u64::MAX),
            max_execution_time_ms: u64::try_from(probe.max_execution_time.as_millis()).unwrap_or(u64::MAX),
            min_strategy_confidence: 0.5,
        }
    }
}

impl DetectionSettings {
    pub fn probe_options(&self) -> ProbeOptions {
        ProbeOptions {
            max_concurrent_queries: self.max_concurrent_queries,
            query_timeout: Duration::from_millis(self.query_timeout_ms),
            max_execution_time: Duration::from_millis(self.max_execution_time_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,

    /// Entry lifetime in seconds.
    pub ttl_seconds: u64,

    /// Persisted cache file. Supports `${VAR}` expansion.
    pub path: Option<String>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 3600,
            path: None,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// The cache file with environment variables expanded.
    pub fn resolved_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.path
            .as_deref()
            .map(|path| expand_env_vars(path).map(PathBuf::from))
            .transpose()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub verbosity: Verbosity,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfigurationSettings {
    pub mode: GenerationMode,

    /// Fixed user count applied over whatever the configurator derives.
    pub user_count: Option<u32>,
}

impl ConfigurationSettings {
    /// Overrides this section imposes on generated configurations.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            user_count: self.user_count,
            ..ConfigOverrides::default()
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `SEEDSCOPE_CONFIG`
    /// 2. `./seedscope.toml`
    /// 3. `~/.config/seedscope/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("SEEDSCOPE_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("seedscope.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("seedscope").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Reject out-of-range values.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let detection = &self.detection;
        if detection.max_concurrent_queries == 0 {
            return Err(SettingsError::invalid(
                "detection.max_concurrent_queries",
                "must be at least 1",
            ));
        }
        if detection.query_timeout_ms == 0 {
            return Err(SettingsError::invalid("detection.query_timeout_ms", "must be positive"));
        }
        if detection.max_execution_time_ms < detection.query_timeout_ms {
            return Err(SettingsError::invalid(
                "detection.max_execution_time_ms",
                format!(
                    "must be at least query_timeout_ms ({}), got {}",
                    detection.query_timeout_ms, detection.max_execution_time_ms
                ),
            ));
        }
        if !(0.0..=1.0).contains(&detection.min_strategy_confidence) {
            return Err(SettingsError::invalid(
                "detection.min_strategy_confidence",
                format!("must be within [0, 1], got {}", detection.min_strategy_confidence),
            ));
        }
        if let Some(count) = self.configuration.user_count {
            if count == 0 || count > MAX_USER_COUNT {
                return Err(SettingsError::invalid(
                    "configuration.user_count",
                    format!("must be within 1..={}, got {}", MAX_USER_COUNT, count),
                ));
            }
        }
        if let Some(framework) = &self.framework {
            framework.validate()?;
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // Lone $
                result.push('$');
                continue;
            }
        }
        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
