//! Configuration generation errors.
//!
//! Generation itself never returns these: the configurator converts them
//! into the fallback configuration. They surface only from
//! [`write_configuration`](super::write_configuration).

/// Errors while building or writing a seed configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("template '{template}' produced an invalid configuration: {source}")]
    Template {
        template: &'static str,
        #[source]
        source: Box<ConfigurationError>,
    },

    #[error("failed to serialize configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigurationError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    pub fn template(template: &'static str, source: ConfigurationError) -> Self {
        Self::Template {
            template,
            source: Box::new(source),
        }
    }
}

pub type ConfigurationResult<T> = Result<T, ConfigurationError>;
