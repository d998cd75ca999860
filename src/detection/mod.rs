//! Schema pattern classification.
//!
//! Answers three questions about a schema, each as a
//! [`ClassificationResult`]:
//!
//! - **architecture**: individual, team or hybrid ownership
//! - **domain**: outdoor, saas, ecommerce, social or generic content
//! - **framework**: which MakerKit version (if any) produced the schema
//!
//! # Architecture
//!
//! ```text
//! DetectionAnalysisContext
//!        │
//!        ├─► analyzer (rayon, pure) ─► PatternAnalysisResult[] ─► aggregator ─► ClassificationResult
//!        │        ▲
//!        │        └── patterns (static PatternRule tables)
//!        │
//!        └─► framework (feature ladder) ─► FrameworkClassification
//! ```
//!
//! [`Detector`] is the entry point and the error boundary: internal
//! failures become low-confidence fallback results, never errors.
//!
//! # Example
//!
//! ```ignore
//! use seedscope::detection::Detector;
//!
//! let detector = Detector::default();
//! let architecture = detector.detect_architecture(&context);
//! println!("{} ({:.2})", architecture.primary_label, architecture.confidence);
//! ```

pub mod aggregator;
pub mod analyzer;
mod error;
pub mod framework;
mod inflection;
mod orchestrator;
pub mod patterns;
mod types;

pub use aggregator::{AggregationWeights, EvidenceAggregator};
pub use analyzer::{MatchDetails, PatternAnalysisResult};
pub use error::{DetectionError, DetectionResult};
pub use framework::{classify_framework, FrameworkClassification};
pub use orchestrator::{DetectionConfig, DetectionSummary, Detector};
pub use patterns::PATTERN_LIBRARY_VERSION;
pub use types::{
    Alternative, Architecture, ClassLabel, ClassificationMetrics, ClassificationResult,
    ConfidenceLevel, Domain, Evidence, FrameworkVersion,
};

/// Centralized confidence thresholds and adjustment values.
pub mod thresholds {
    /// Confidence level buckets.
    pub mod level {
        pub const VERY_HIGH: f64 = 0.9;
        pub const HIGH: f64 = 0.7;
        pub const MEDIUM: f64 = 0.5;
        pub const LOW: f64 = 0.3;
    }

    /// Evidence aggregation.
    pub mod aggregation {
        /// Multiplier in `min(1, Σ(confidence × weight) × factor)`.
        pub const DIMINISHING_FACTOR: f64 = 0.8;
        /// Both top labels must score at least this for the ambiguity fallback.
        pub const AMBIGUITY_MIN_SCORE: f64 = 0.3;
        /// Minimum balance between the top two labels for the ambiguity fallback.
        pub const AMBIGUITY_MIN_BALANCE: f64 = 0.8;
    }

    /// Framework recommendations and ladder limits.
    pub mod framework {
        /// Above this: adopt the MakerKit strategy.
        pub const STRONG: f64 = 0.7;
        /// From here up to `STRONG`: verify manually.
        pub const MODERATE: f64 = 0.4;
        /// From here up to `MODERATE`: suggest a manual override.
        pub const WEAK: f64 = 0.1;
        /// Ceiling for `custom` layouts.
        pub const CUSTOM_CAP: f64 = 0.4;
        /// Bonus for supporting signals (helper functions, caller hint).
        pub const SUPPORTING_BONUS: f64 = 0.05;
        /// Account-level fields required for v3.
        pub const MIN_ACCOUNT_FIELDS: usize = 2;
    }

    /// Strategy selection.
    pub mod strategy {
        /// Default minimum confidence for automatic selection.
        pub const MIN_STRATEGY_CONFIDENCE: f64 = 0.5;
        /// Below this a strategy is reported as invalid for the schema.
        pub const VALIDATION_MIN: f64 = 0.3;
    }

    /// Auto-configuration.
    pub mod configuration {
        /// Conservative mode applies a setting only above this confidence.
        pub const CONSERVATIVE_MIN: f64 = 0.8;
        /// Completeness used when no essential field is populated.
        pub const COMPLETENESS_FLOOR: f64 = 0.5;
        /// Multiplier when architecture and domain agree.
        pub const AGREEMENT_BOOST: f64 = 1.1;
        /// Multiplier when they diverge.
        pub const DIVERGENCE_PENALTY: f64 = 0.9;
        /// Confidence gap that counts as divergence.
        pub const DIVERGENCE_GAP: f64 = 0.4;
        /// Confidence of the fixed fallback configuration.
        pub const FALLBACK_CONFIDENCE: f64 = 0.3;
    }
}
