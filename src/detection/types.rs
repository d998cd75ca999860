//! Classification labels, evidence and results.

use std::collections::BTreeMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::thresholds;

/// A label produced by one classification question.
///
/// `ALL` is the declaration order, which is also the tie-break order when
/// two labels score the same.
pub trait ClassLabel:
    Copy + Ord + Hash + Debug + Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Every label, in declaration order.
    const ALL: &'static [Self];

    /// Label returned when there is no evidence at all.
    fn neutral() -> Self;

    /// Label preferred when the top two labels are nearly balanced.
    fn ambiguity_fallback() -> Option<Self> {
        None
    }

    fn as_str(&self) -> &'static str;
}

/// Platform architecture implied by ownership structure.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    /// Content owned by individual users.
    #[default]
    Individual,
    /// Content owned by teams/organizations.
    Team,
    /// Both personal and team ownership.
    Hybrid,
}

impl ClassLabel for Architecture {
    const ALL: &'static [Self] = &[Self::Individual, Self::Team, Self::Hybrid];

    fn neutral() -> Self {
        Self::Individual
    }

    fn ambiguity_fallback() -> Option<Self> {
        Some(Self::Hybrid)
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Team => "team",
            Self::Hybrid => "hybrid",
        }
    }
}

/// Content domain implied by table vocabulary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Outdoor,
    Saas,
    Ecommerce,
    Social,
    #[default]
    Generic,
}

impl ClassLabel for Domain {
    const ALL: &'static [Self] = &[
        Self::Outdoor,
        Self::Saas,
        Self::Ecommerce,
        Self::Social,
        Self::Generic,
    ];

    fn neutral() -> Self {
        Self::Generic
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Outdoor => "outdoor",
            Self::Saas => "saas",
            Self::Ecommerce => "ecommerce",
            Self::Social => "social",
            Self::Generic => "generic",
        }
    }
}

/// MakerKit-style framework version.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum FrameworkVersion {
    #[serde(rename = "v1")]
    V1,
    #[serde(rename = "v2")]
    V2,
    #[serde(rename = "v3")]
    V3,
    /// Framework signals present, but not a known layout.
    #[serde(rename = "custom")]
    Custom,
    /// No framework detected.
    #[default]
    #[serde(rename = "none")]
    Absent,
}

impl FrameworkVersion {
    /// True for the structured `v1`..`v3` tiers.
    pub fn is_versioned(&self) -> bool {
        matches!(self, Self::V1 | Self::V2 | Self::V3)
    }
}

impl ClassLabel for FrameworkVersion {
    const ALL: &'static [Self] = &[Self::V1, Self::V2, Self::V3, Self::Custom, Self::Absent];

    fn neutral() -> Self {
        Self::Absent
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
            Self::V3 => "v3",
            Self::Custom => "custom",
            Self::Absent => "none",
        }
    }
}

macro_rules! impl_label_display {
    ($($ty:ty),*) => {
        $(
            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(self.as_str())
                }
            }

            impl std::str::FromStr for $ty {
                type Err = String;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    let wanted = s.trim().to_lowercase();
                    <$ty as ClassLabel>::ALL
                        .iter()
                        .copied()
                        .find(|label| label.as_str() == wanted)
                        .ok_or_else(|| format!("unknown {}: {}", stringify!($ty), s))
                }
            }
        )*
    };
}

impl_label_display!(Architecture, Domain, FrameworkVersion);

/// Bucketed, human-readable confidence tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        use thresholds::level;
        if score >= level::VERY_HIGH {
            Self::VeryHigh
        } else if score >= level::HIGH {
            Self::High
        } else if score >= level::MEDIUM {
            Self::Medium
        } else if score >= level::LOW {
            Self::Low
        } else {
            Self::VeryLow
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VeryLow => write!(f, "very_low"),
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::VeryHigh => write!(f, "very_high"),
        }
    }
}

/// A single weighted observation supporting a classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "L: ClassLabel"))]
pub struct Evidence<L: ClassLabel> {
    /// Evidence kind (the pattern rule id, or `framework_feature`).
    pub kind: String,
    pub description: String,
    /// How well the observation matched (0.0 to 1.0).
    pub confidence: f64,
    /// How much the observation counts (0.0 to 1.0).
    pub weight: f64,
    /// Names that matched, for display.
    pub supporting_data: serde_json::Value,
    /// Strength of the indication for each label.
    pub per_class_strength: BTreeMap<L, f64>,
}

/// A ranked runner-up label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "L: ClassLabel"))]
pub struct Alternative<L: ClassLabel> {
    pub label: L,
    pub confidence: f64,
    pub reasoning: String,
}

/// Execution metrics attached to a classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub execution_time_ms: u64,
    pub evidence_count: usize,
    pub tables_analyzed: usize,
    pub strategy_used: String,
}

/// Answer to one classification question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "L: ClassLabel"))]
pub struct ClassificationResult<L: ClassLabel> {
    pub primary_label: L,
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub evidence: Vec<Evidence<L>>,
    /// Other labels, best first.
    pub alternatives: Vec<Alternative<L>>,
    /// Ordered, reproducible explanation of how the result was reached.
    pub reasoning_trace: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub metrics: ClassificationMetrics,
}

impl<L: ClassLabel> ClassificationResult<L> {
    /// Neutral label, zero confidence.
    pub fn neutral(strategy_used: impl Into<String>, tables_analyzed: usize) -> Self {
        Self {
            primary_label: L::neutral(),
            confidence: 0.0,
            confidence_level: ConfidenceLevel::VeryLow,
            evidence: Vec::new(),
            alternatives: Vec::new(),
            reasoning_trace: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            metrics: ClassificationMetrics {
                execution_time_ms: 0,
                evidence_count: 0,
                tables_analyzed,
                strategy_used: strategy_used.into(),
            },
        }
    }

    /// Low-confidence result for a classification that failed internally.
    pub fn fallback(error: impl Display, tables_analyzed: usize) -> Self {
        let mut result = Self::neutral("fallback", tables_analyzed);
        result.reasoning_trace.push(format!(
            "Classification failed; defaulting to {}",
            L::neutral()
        ));
        result.errors.push(error.to_string());
        result
    }

    pub fn is_confident(&self, threshold: f64) -> bool {
        self.confidence >= threshold
    }

    /// Confidence of a specific label, whether primary or alternative.
    pub fn confidence_of(&self, label: L) -> f64 {
        if self.primary_label == label {
            return self.confidence;
        }
        self.alternatives
            .iter()
            .find(|alt| alt.label == label)
            .map(|alt| alt.confidence)
            .unwrap_or(0.0)
    }
}
