use async_trait::async_trait;
use seedscope::detection::{ClassificationResult, ConfidenceLevel, FrameworkVersion};
use seedscope::introspect::{
    DetectionAnalysisContext, ProbeOptions, ProbePlan, SchemaSnapshot, SnapshotIntrospector,
};
use seedscope::strategy::{
    FrameworkProfile, GenericStrategy, MakerKitStrategy, SeedingStrategy, SelectionReason,
    StrategyRegistry,
};
use seedscope::telemetry::Reporter;
use std::sync::Arc;

/// Claims any schema with a `wp_posts` table.
struct WordpressStrategy;

#[async_trait]
impl SeedingStrategy for WordpressStrategy {
    fn name(&self) -> &'static str {
        "wordpress"
    }

    fn description(&self) -> &'static str {
        "WordPress posts and users"
    }

    async fn detect(&self, context: &DetectionAnalysisContext) -> ClassificationResult<FrameworkVersion> {
        let mut result = ClassificationResult::neutral(self.name(), context.table_count());
        if context.has_table("wp_posts") {
            result.primary_label = FrameworkVersion::Custom;
            result.confidence = 0.85;
            result.confidence_level = ConfidenceLevel::from_score(0.85);
        }
        result
    }

    fn framework_profile(
        &self,
        _classification: &ClassificationResult<FrameworkVersion>,
        _context: &DetectionAnalysisContext,
    ) -> FrameworkProfile {
        FrameworkProfile::generic("wp_users")
    }
}

async fn context_from(snapshot: SchemaSnapshot) -> DetectionAnalysisContext {
    DetectionAnalysisContext::build(
        &SnapshotIntrospector::new(snapshot),
        &ProbePlan::from_pattern_library(),
        &ProbeOptions::default(),
        Reporter::quiet(),
    )
    .await
    .unwrap()
}

fn makerkit_v2() -> SchemaSnapshot {
    SchemaSnapshot::new()
        .with_table("accounts", &["id", "name"])
        .with_table("accounts_memberships", &["account_id", "user_id"])
        .with_table("subscriptions", &["id", "account_id"])
        .with_table("roles", &["name"])
        .with_table("invitations", &["id", "account_id"])
}

#[tokio::test]
async fn test_makerkit_snapshot_selects_makerkit_profile() {
    let context = context_from(makerkit_v2()).await;
    let selection = StrategyRegistry::with_defaults().select_strategy(&context, None).await;

    assert_eq!(selection.strategy_name, MakerKitStrategy::NAME);
    assert_eq!(selection.reason, SelectionReason::HighConfidence);
    assert_eq!(
        selection.profile,
        FrameworkProfile::MakerKit {
            version: FrameworkVersion::V2,
            personal_accounts: false,
            team_accounts: true,
        }
    );
    assert!(selection.warnings.is_empty());
}

#[tokio::test]
async fn test_lower_threshold_selects_generic_on_merit() {
    let context = context_from(SchemaSnapshot::new().with_table("users", &["id"]).with_table("posts", &["id"])).await;

    let strict = StrategyRegistry::with_defaults().select_strategy(&context, None).await;
    assert_eq!(strict.strategy_name, GenericStrategy::NAME);
    assert_eq!(strict.reason, SelectionReason::Fallback);

    let lenient = StrategyRegistry::with_min_confidence(0.2)
        .select_strategy(&context, None)
        .await;
    assert_eq!(lenient.strategy_name, GenericStrategy::NAME);
    assert_eq!(lenient.reason, SelectionReason::HighConfidence);
    assert_eq!(lenient.profile, FrameworkProfile::generic("users"));
}

#[tokio::test]
async fn test_registered_strategy_competes() {
    let mut registry = StrategyRegistry::with_defaults();
    registry.register(Arc::new(WordpressStrategy));
    assert_eq!(registry.names(), vec!["generic", "makerkit", "wordpress"]);

    let context = DetectionAnalysisContext::builder()
        .tables(&["wp_posts", "wp_users"])
        .build();
    let selection = registry.select_strategy(&context, None).await;
    assert_eq!(selection.strategy_name, "wordpress");
    assert_eq!(selection.profile.user_table(), "wp_users");

    let forced = registry.select_strategy(&context, Some("makerkit")).await;
    assert_eq!(forced.reason, SelectionReason::ManualOverride);
    assert!(forced.warnings.iter().any(|w| w.contains("low confidence")));
    assert!(forced.warnings.iter().any(|w| w.contains("favors 'wordpress'")));
}

#[tokio::test]
async fn test_selection_serializes_reason() {
    let context = context_from(makerkit_v2()).await;
    let selection = StrategyRegistry::with_defaults().select_strategy(&context, Some("makerkit")).await;
    let json = serde_json::to_value(&selection).unwrap();
    assert_eq!(json["reason"], "manual_override");
    assert_eq!(json["profile"]["kind"], "makerkit");
}
