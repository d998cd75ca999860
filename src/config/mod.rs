//! Configuration module for seedscope.
//!
//! Handles the settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, CacheSettings, ConfigurationSettings, DetectionSettings, LoggingSettings,
    Settings, SettingsError,
};
