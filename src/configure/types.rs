//! Seed configuration model.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{ConfigurationError, ConfigurationResult};
use crate::detection::{Architecture, ConfidenceLevel, Domain};
use crate::strategy::FrameworkProfile;

/// Upper bound on seeded users.
pub const MAX_USER_COUNT: u32 = 10_000;

/// Concrete seed configuration consumed by the seeding pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedConfiguration {
    pub architecture: Architecture,
    pub domain: Domain,
    pub user_count: u32,
    pub content_per_user: u32,
    pub images_per_content: u32,
    pub enable_real_images: bool,
    pub create_team_accounts: bool,
    pub teams_count: u32,
    pub members_per_team: u32,
    pub create_personal_accounts: bool,
    pub content_types: Vec<String>,
    pub categories: Vec<String>,
    pub enable_social_features: bool,
    pub enable_billing_data: bool,
    pub enable_notifications: bool,
    /// Fraction of content marked public (0.0 to 1.0).
    pub public_content_ratio: f64,
    /// Seeding strategy name.
    pub strategy: String,
    pub framework: FrameworkProfile,
}

impl Default for SeedConfiguration {
    fn default() -> Self {
        Self {
            architecture: Architecture::Individual,
            domain: Domain::Generic,
            user_count: 5,
            content_per_user: 3,
            images_per_content: 0,
            enable_real_images: false,
            create_team_accounts: false,
            teams_count: 0,
            members_per_team: 0,
            create_personal_accounts: true,
            content_types: vec!["items".to_string()],
            categories: vec!["general".to_string()],
            enable_social_features: false,
            enable_billing_data: false,
            enable_notifications: false,
            public_content_ratio: 0.5,
            strategy: "generic".to_string(),
            framework: FrameworkProfile::default(),
        }
    }
}

impl SeedConfiguration {
    /// Layer `overrides` on top of this configuration.
    pub fn apply(mut self, overrides: &ConfigOverrides) -> Self {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = &overrides.$field {
                    self.$field = value.clone();
                })*
            };
        }
        take!(
            architecture,
            domain,
            user_count,
            content_per_user,
            images_per_content,
            enable_real_images,
            create_team_accounts,
            teams_count,
            members_per_team,
            create_personal_accounts,
            content_types,
            categories,
            enable_social_features,
            enable_billing_data,
            enable_notifications,
            public_content_ratio,
            strategy,
            framework,
        );
        self
    }

    pub fn validate(&self) -> ConfigurationResult<()> {
        if self.user_count == 0 || self.user_count > MAX_USER_COUNT {
            return Err(ConfigurationError::invalid(
                "user_count",
                format!("must be within 1..={}, got {}", MAX_USER_COUNT, self.user_count),
            ));
        }
        if !(0.0..=1.0).contains(&self.public_content_ratio) {
            return Err(ConfigurationError::invalid(
                "public_content_ratio",
                format!("must be within [0, 1], got {}", self.public_content_ratio),
            ));
        }
        if self.create_team_accounts && (self.teams_count == 0 || self.members_per_team == 0) {
            return Err(ConfigurationError::invalid(
                "teams_count",
                "team accounts need at least one team with one member",
            ));
        }
        if !self.create_team_accounts && !self.create_personal_accounts {
            return Err(ConfigurationError::invalid(
                "create_personal_accounts",
                "either personal or team accounts must be created",
            ));
        }
        if self.content_types.is_empty() {
            return Err(ConfigurationError::invalid("content_types", "must not be empty"));
        }
        self.framework
            .validate()
            .map_err(|e| ConfigurationError::invalid("framework", e.to_string()))
    }
}

/// Partial configuration used for layering. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<Architecture>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_per_user: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images_per_content: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_real_images: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_team_accounts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members_per_team: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_personal_accounts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_social_features: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_billing_data: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_notifications: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_content_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<FrameworkProfile>,
}

/// Fields that decide how much data a seeding run produces.
pub const ESSENTIAL_FIELDS: &[&str] = &[
    "user_count",
    "content_per_user",
    "create_team_accounts",
    "create_personal_accounts",
    "content_types",
    "enable_real_images",
];

impl ConfigOverrides {
    /// Shallow merge: fields set in `other` win.
    pub fn merge(mut self, other: &ConfigOverrides) -> Self {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field.clone();
                })*
            };
        }
        take!(
            architecture,
            domain,
            user_count,
            content_per_user,
            images_per_content,
            enable_real_images,
            create_team_accounts,
            teams_count,
            members_per_team,
            create_personal_accounts,
            content_types,
            categories,
            enable_social_features,
            enable_billing_data,
            enable_notifications,
            public_content_ratio,
            strategy,
            framework,
        );
        self
    }

    /// Only the essential fields of this layer.
    pub fn essentials(&self) -> Self {
        Self {
            user_count: self.user_count,
            content_per_user: self.content_per_user,
            create_team_accounts: self.create_team_accounts,
            create_personal_accounts: self.create_personal_accounts,
            content_types: self.content_types.clone(),
            enable_real_images: self.enable_real_images,
            ..Self::default()
        }
    }

    /// Number of [`ESSENTIAL_FIELDS`] that are set.
    pub fn populated_essentials(&self) -> usize {
        [
            self.user_count.is_some(),
            self.content_per_user.is_some(),
            self.create_team_accounts.is_some(),
            self.create_personal_accounts.is_some(),
            self.content_types.is_some(),
            self.enable_real_images.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Range checks on the fields that are set.
    pub fn check(&self) -> ConfigurationResult<()> {
        if let Some(count) = self.user_count {
            if count == 0 || count > MAX_USER_COUNT {
                return Err(ConfigurationError::invalid(
                    "user_count",
                    format!("must be within 1..={}, got {}", MAX_USER_COUNT, count),
                ));
            }
        }
        if let Some(ratio) = self.public_content_ratio {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(ConfigurationError::invalid(
                    "public_content_ratio",
                    format!("must be within [0, 1], got {}", ratio),
                ));
            }
        }
        if let Some(profile) = &self.framework {
            profile
                .validate()
                .map_err(|e| ConfigurationError::invalid("framework", e.to_string()))?;
        }
        Ok(())
    }
}

/// How thoroughly detection results shape the configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Defaults plus every matching template.
    #[default]
    Comprehensive,
    /// Essential defaults only.
    Minimal,
    /// Defaults only where detection is very confident.
    Conservative,
    /// Comprehensive, then volumes tuned from lookup tables.
    Optimized,
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Comprehensive => "comprehensive",
            Self::Minimal => "minimal",
            Self::Conservative => "conservative",
            Self::Optimized => "optimized",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "comprehensive" => Ok(Self::Comprehensive),
            "minimal" => Ok(Self::Minimal),
            "conservative" => Ok(Self::Conservative),
            "optimized" => Ok(Self::Optimized),
            other => Err(format!(
                "unknown generation mode '{}' (expected comprehensive, minimal, conservative or optimized)",
                other
            )),
        }
    }
}

/// Timing and provenance of a generated configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutoConfigMetrics {
    pub execution_time_ms: u64,
    /// Template ids in application order.
    pub templates_applied: Vec<String>,
    /// Generation mode, or `fallback`.
    pub strategy_used: String,
}

/// A generated configuration with its confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoConfigurationResult {
    pub configuration: SeedConfiguration,
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub reasoning: Vec<String>,
    pub warnings: Vec<String>,
    pub metrics: AutoConfigMetrics,
}
