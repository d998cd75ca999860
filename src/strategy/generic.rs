//! Fallback strategy for schemas no framework claims.

use async_trait::async_trait;

use super::profile::FrameworkProfile;
use super::seeding::SeedingStrategy;
use crate::detection::patterns::USER_TABLES;
use crate::detection::{ClassificationResult, ConfidenceLevel, Evidence, FrameworkVersion};
use crate::introspect::DetectionAnalysisContext;

/// Confidence when the schema has any tables at all.
const NONEMPTY_CONFIDENCE: f64 = 0.3;
const EMPTY_CONFIDENCE: f64 = 0.1;

/// Seeds any schema through a plain user table.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericStrategy;

impl GenericStrategy {
    pub const NAME: &'static str = "generic";

    fn user_table(context: &DetectionAnalysisContext) -> Option<&'static str> {
        USER_TABLES.iter().copied().find(|t| context.has_table(t))
    }
}

#[async_trait]
impl SeedingStrategy for GenericStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Framework-agnostic seeding through a user table"
    }

    async fn detect(&self, context: &DetectionAnalysisContext) -> ClassificationResult<FrameworkVersion> {
        let mut result = ClassificationResult::neutral(Self::NAME, context.table_count());
        result.confidence = if context.is_empty() {
            EMPTY_CONFIDENCE
        } else {
            NONEMPTY_CONFIDENCE
        };
        result.confidence_level = ConfidenceLevel::from_score(result.confidence);

        if let Some(table) = Self::user_table(context) {
            result.evidence.push(Evidence {
                kind: "user_table".to_string(),
                description: format!("User table '{}' present", table),
                confidence: 1.0,
                weight: 0.5,
                supporting_data: serde_json::json!({ "table": table }),
                per_class_strength: Default::default(),
            });
        }
        result.metrics.evidence_count = result.evidence.len();
        result.reasoning_trace.push(format!(
            "Generic strategy applies to any schema ({} table(s)); confidence {:.2}",
            context.table_count(),
            result.confidence
        ));
        result
    }

    fn framework_profile(
        &self,
        _classification: &ClassificationResult<FrameworkVersion>,
        context: &DetectionAnalysisContext,
    ) -> FrameworkProfile {
        FrameworkProfile::generic(Self::user_table(context).unwrap_or("users"))
    }
}
