//! MakerKit framework/version classification.
//!
//! Resolves a discrete version from an ordered ladder of feature-set checks,
//! most specific first:
//!
//! ```text
//! no accounts table                                  -> none
//! v2 set + notifications/role_permissions/billing
//!        + at least two account-level fields         -> v3
//! accounts + memberships + subscriptions/roles/inv.  -> v2
//! accounts + memberships                             -> v1
//! accounts, nothing else fits                        -> custom
//! ```
//!
//! Confidence is the weighted fraction of the resolved version's expected
//! features that are present.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::analyzer::{evaluate_all, PatternAnalysisResult};
use super::error::{check_unit, DetectionResult};
use super::patterns::{
    expected_features, framework_features, ACCOUNT_FIELD_FEATURES, FRAMEWORK_FUNCTIONS_FEATURE,
    PERSONAL_SLUG_CHECK_FEATURE,
};
use super::thresholds::framework as limits;
use super::types::{Alternative, ClassLabel, ClassificationResult, ConfidenceLevel, FrameworkVersion};
use crate::introspect::DetectionAnalysisContext;

/// Framework classification with feature diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkClassification {
    #[serde(flatten)]
    pub classification: ClassificationResult<FrameworkVersion>,
    /// True for the structured `v1`..`v3` layouts.
    pub is_makerkit: bool,
    pub matched_features: Vec<String>,
    /// Expected features of the resolved version that were not found.
    pub missing_features: Vec<String>,
    pub recommendations: Vec<String>,
}

impl FrameworkClassification {
    pub fn version(&self) -> FrameworkVersion {
        self.classification.primary_label
    }

    pub fn confidence(&self) -> f64 {
        self.classification.confidence
    }

    /// Low-confidence result for a classification that failed internally.
    pub fn fallback(error: impl std::fmt::Display, tables_analyzed: usize) -> Self {
        Self {
            classification: ClassificationResult::fallback(error, tables_analyzed),
            is_makerkit: false,
            matched_features: Vec::new(),
            missing_features: Vec::new(),
            recommendations: vec![recommendation(0.0, FrameworkVersion::Absent)],
        }
    }
}

/// Weighted fraction of `version`'s expected features present in `matched`.
fn feature_coverage(
    version: FrameworkVersion,
    matched: &BTreeSet<&str>,
    results: &[PatternAnalysisResult<FrameworkVersion>],
) -> f64 {
    let expected = expected_features(version);
    let weight_of = |id: &str| {
        results
            .iter()
            .find(|r| r.rule_id == id)
            .map(|r| r.confidence_weight)
            .unwrap_or(0.0)
    };
    let total: f64 = expected.iter().map(|id| weight_of(*id)).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let present: f64 = expected
        .iter()
        .filter(|id| matched.contains(*id))
        .map(|id| weight_of(*id))
        .sum();
    (present / total).clamp(0.0, 1.0)
}

fn has_all(matched: &BTreeSet<&str>, version: FrameworkVersion) -> bool {
    expected_features(version)
        .iter()
        .filter(|id| !ACCOUNT_FIELD_FEATURES.contains(*id))
        .all(|id| matched.contains(id))
}

/// Walk the ladder, most specific first.
fn resolve_version(matched: &BTreeSet<&str>, trace: &mut Vec<String>) -> FrameworkVersion {
    if !matched.contains("accounts_table") {
        trace.push("No accounts table; not a MakerKit schema".to_string());
        return FrameworkVersion::Absent;
    }

    let account_fields = ACCOUNT_FIELD_FEATURES
        .iter()
        .filter(|id| matched.contains(*id))
        .count();
    if has_all(matched, FrameworkVersion::V3) && account_fields >= limits::MIN_ACCOUNT_FIELDS {
        trace.push(format!(
            "Full companion table set with {} of {} account fields: v3",
            account_fields,
            ACCOUNT_FIELD_FEATURES.len()
        ));
        return FrameworkVersion::V3;
    }
    if has_all(matched, FrameworkVersion::V2) {
        trace.push("Accounts with memberships, subscriptions, roles and invitations: v2".to_string());
        return FrameworkVersion::V2;
    }
    if has_all(matched, FrameworkVersion::V1) {
        trace.push("Accounts with memberships: v1".to_string());
        return FrameworkVersion::V1;
    }

    trace.push("Accounts table without a known companion layout: custom".to_string());
    FrameworkVersion::Custom
}

fn recommendation(confidence: f64, version: FrameworkVersion) -> String {
    if confidence > limits::STRONG {
        format!(
            "Strong MakerKit {} signature: use the makerkit seeding strategy",
            version
        )
    } else if confidence >= limits::MODERATE {
        "Moderate MakerKit signature: verify the framework version manually before seeding"
            .to_string()
    } else if confidence >= limits::WEAK {
        "Weak MakerKit signature: consider a manual strategy override".to_string()
    } else {
        "No MakerKit schema detected: the generic seeding strategy applies".to_string()
    }
}

/// Classify the MakerKit version of a schema.
///
/// Pure: the same context always yields the same classification.
pub fn classify_framework(context: &DetectionAnalysisContext) -> DetectionResult<FrameworkClassification> {
    let results = evaluate_all(framework_features(), context);
    let mut trace = Vec::new();
    let matched: BTreeSet<&str> = results
        .iter()
        .filter(|r| r.matched)
        .map(|r| r.rule_id)
        .collect();

    for result in &results {
        check_unit(result.rule_id, "confidence weight", result.confidence_weight)?;
        trace.push(format!(
            "Feature '{}' {}",
            result.rule_id,
            if result.matched { "present" } else { "absent" }
        ));
    }

    let version = resolve_version(&matched, &mut trace);
    let mut classification = ClassificationResult::neutral("framework_ladder", context.table_count());
    classification.evidence = results
        .iter()
        .filter(|r| r.matched)
        .map(PatternAnalysisResult::to_evidence)
        .collect();
    classification.metrics.evidence_count = classification.evidence.len();

    let mut confidence = match version {
        FrameworkVersion::Absent => 0.0,
        FrameworkVersion::Custom => {
            feature_coverage(version, &matched, &results).min(limits::CUSTOM_CAP)
        }
        _ => feature_coverage(version, &matched, &results),
    };

    if version.is_versioned() {
        if matched.contains(FRAMEWORK_FUNCTIONS_FEATURE) {
            confidence += limits::SUPPORTING_BONUS;
            trace.push("Account helper functions present".to_string());
        }
        if matched.contains(PERSONAL_SLUG_CHECK_FEATURE) {
            confidence += limits::SUPPORTING_BONUS;
            trace.push("Personal account slug check present".to_string());
        }
        let hinted = context
            .hints()
            .framework
            .as_deref()
            .map(|hint| hint.eq_ignore_ascii_case("makerkit"))
            .unwrap_or(false);
        if hinted {
            confidence += limits::SUPPORTING_BONUS;
            trace.push("Caller hint agrees: makerkit".to_string());
        }
    }
    let confidence = check_unit("framework_ladder", "confidence", confidence.clamp(0.0, 1.0))?;

    let level = ConfidenceLevel::from_score(confidence);
    trace.push(format!(
        "Resolved {} with confidence {:.2} ({})",
        version, confidence, level
    ));

    if version != FrameworkVersion::Absent {
        let mut alternatives: Vec<Alternative<FrameworkVersion>> = FrameworkVersion::ALL
            .iter()
            .copied()
            .filter(|v| v.is_versioned() && *v != version)
            .map(|v| {
                let coverage = feature_coverage(v, &matched, &results);
                let expected = expected_features(v);
                let present = expected.iter().filter(|id| matched.contains(*id)).count();
                Alternative {
                    label: v,
                    confidence: coverage,
                    reasoning: format!("{} of {} expected features present", present, expected.len()),
                }
            })
            .filter(|alt| alt.confidence > 0.0)
            .collect();
        alternatives.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.label.cmp(&b.label))
        });
        classification.alternatives = alternatives;
    }

    let missing_features: Vec<String> = expected_features(version)
        .into_iter()
        .filter(|id| !matched.contains(id))
        .map(str::to_string)
        .collect();

    let mut recommendations = vec![recommendation(confidence, version)];
    if version.is_versioned() && !missing_features.is_empty() {
        recommendations.push(format!(
            "Missing expected {} features: {}",
            version,
            missing_features.join(", ")
        ));
    }

    classification.primary_label = version;
    classification.confidence = confidence;
    classification.confidence_level = level;
    classification.reasoning_trace = trace;

    Ok(FrameworkClassification {
        classification,
        is_makerkit: version.is_versioned(),
        matched_features: matched.iter().map(|id| id.to_string()).collect(),
        missing_features,
        recommendations,
    })
}
