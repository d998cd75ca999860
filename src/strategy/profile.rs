//! Framework profiles: how the seeding pipeline should shape accounts.

use serde::{Deserialize, Serialize};

use crate::detection::FrameworkVersion;

/// Errors from an inconsistent framework profile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("makerkit profile requires a concrete version, got '{0}'")]
    UnversionedMakerKit(FrameworkVersion),

    #[error("makerkit profile must enable personal or team accounts")]
    NoAccountKinds,

    #[error("generic profile requires a user table name")]
    MissingUserTable,
}

/// Framework-specific seeding profile.
///
/// ```toml
/// [framework]
/// kind = "makerkit"
/// version = "v3"
/// personal_accounts = true
/// team_accounts = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrameworkProfile {
    /// Accounts-based MakerKit schema.
    #[serde(rename = "makerkit")]
    MakerKit {
        version: FrameworkVersion,
        #[serde(default)]
        personal_accounts: bool,
        #[serde(default)]
        team_accounts: bool,
    },
    /// Plain user table.
    Generic { user_table: String },
}

impl FrameworkProfile {
    pub fn generic(user_table: impl Into<String>) -> Self {
        Self::Generic {
            user_table: user_table.into(),
        }
    }

    /// Build a MakerKit profile, checking it is consistent.
    pub fn makerkit(
        version: FrameworkVersion,
        personal_accounts: bool,
        team_accounts: bool,
    ) -> Result<Self, ProfileError> {
        let profile = Self::MakerKit {
            version,
            personal_accounts,
            team_accounts,
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        match self {
            Self::MakerKit { version, .. } if !version.is_versioned() => {
                Err(ProfileError::UnversionedMakerKit(*version))
            }
            Self::MakerKit {
                personal_accounts: false,
                team_accounts: false,
                ..
            } => Err(ProfileError::NoAccountKinds),
            Self::Generic { user_table } if user_table.trim().is_empty() => {
                Err(ProfileError::MissingUserTable)
            }
            _ => Ok(()),
        }
    }

    pub fn is_makerkit(&self) -> bool {
        matches!(self, Self::MakerKit { .. })
    }

    /// The `kind` tag as written in settings files.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::MakerKit { .. } => "makerkit",
            Self::Generic { .. } => "generic",
        }
    }

    /// Table that holds the seeded users.
    pub fn user_table(&self) -> &str {
        match self {
            Self::MakerKit { .. } => "accounts",
            Self::Generic { user_table } => user_table,
        }
    }
}

impl Default for FrameworkProfile {
    fn default() -> Self {
        Self::generic("users")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_makerkit_validation() {
        assert!(FrameworkProfile::makerkit(FrameworkVersion::V3, true, true).is_ok());
        assert_eq!(
            FrameworkProfile::makerkit(FrameworkVersion::Absent, true, false),
            Err(ProfileError::UnversionedMakerKit(FrameworkVersion::Absent))
        );
        assert_eq!(
            FrameworkProfile::makerkit(FrameworkVersion::V1, false, false),
            Err(ProfileError::NoAccountKinds)
        );
        assert_eq!(
            FrameworkProfile::generic(" ").validate(),
            Err(ProfileError::MissingUserTable)
        );
    }

    #[test]
    fn test_tagged_toml() {
        let profile: FrameworkProfile = toml::from_str(
            r#"
kind = "makerkit"
version = "v2"
team_accounts = true
"#,
        )
        .unwrap();
        assert_eq!(
            profile,
            FrameworkProfile::MakerKit {
                version: FrameworkVersion::V2,
                personal_accounts: false,
                team_accounts: true,
            }
        );

        let generic: FrameworkProfile = toml::from_str("kind = \"generic\"\nuser_table = \"profiles\"").unwrap();
        assert_eq!(generic.user_table(), "profiles");
        assert!(!generic.is_makerkit());
    }
}
