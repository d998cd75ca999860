//! Introspection error types.

use std::io;
use thiserror::Error;

/// Result type for introspection operations.
pub type IntrospectionResult<T> = Result<T, IntrospectionError>;

const AUTH_REMEDIATION: &str =
    "check the database credentials (service role key or connection string) and retry";
const CONNECTIVITY_REMEDIATION: &str =
    "verify the database URL is reachable from this host and that the database is running";

/// Errors that can occur while probing a schema.
#[derive(Error, Debug)]
pub enum IntrospectionError {
    /// The database rejected our credentials.
    #[error("authentication failed: {message} ({remediation})")]
    Authentication {
        message: String,
        remediation: String,
    },

    /// The database could not be reached.
    #[error("database unreachable: {message} ({remediation})")]
    Connectivity {
        message: String,
        remediation: String,
    },

    /// A single catalog query failed.
    #[error("query failed: {0}")]
    Query(String),

    /// A probe did not answer within the query timeout.
    #[error("probe timed out after {0} ms")]
    Timeout(u64),

    /// Failed to read a schema snapshot file.
    #[error("failed to read schema snapshot: {0}")]
    SnapshotIo(#[source] io::Error),

    /// Failed to parse a schema snapshot.
    #[error("failed to parse schema snapshot: {0}")]
    SnapshotParse(#[source] serde_json::Error),
}

impl IntrospectionError {
    /// Credentials were rejected.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            remediation: AUTH_REMEDIATION.to_string(),
        }
    }

    /// The database is unreachable.
    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::Connectivity {
            message: message.into(),
            remediation: CONNECTIVITY_REMEDIATION.to_string(),
        }
    }

    /// Fatal errors abort introspection; everything else degrades to "absent".
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::Connectivity { .. })
    }

    /// Remediation guidance for fatal errors.
    pub fn remediation(&self) -> Option<&str> {
        match self {
            Self::Authentication { remediation, .. } | Self::Connectivity { remediation, .. } => {
                Some(remediation)
            }
            _ => None,
        }
    }
}

impl From<io::Error> for IntrospectionError {
    fn from(err: io::Error) -> Self {
        Self::SnapshotIo(err)
    }
}

impl From<serde_json::Error> for IntrospectionError {
    fn from(err: serde_json::Error) -> Self {
        Self::SnapshotParse(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(IntrospectionError::authentication("invalid JWT").is_fatal());
        assert!(IntrospectionError::connectivity("connection refused").is_fatal());
        assert!(!IntrospectionError::Query("relation missing".into()).is_fatal());
        assert!(!IntrospectionError::Timeout(500).is_fatal());
    }

    #[test]
    fn test_remediation_in_message() {
        let err = IntrospectionError::authentication("invalid JWT");
        assert!(err.to_string().contains("credentials"));
        assert!(err.remediation().is_some());
        assert!(IntrospectionError::Timeout(10).remediation().is_none());
    }
}
