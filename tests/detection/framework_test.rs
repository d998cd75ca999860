use seedscope::detection::{ConfidenceLevel, Detector, FrameworkVersion};
use seedscope::introspect::{
    ContextHints, DetectionAnalysisContext, ProbeOptions, ProbePlan, SchemaSnapshot,
    SnapshotIntrospector,
};
use seedscope::telemetry::Reporter;

const MAKERKIT_V3: &str = r#"{
    "tables": {
        "accounts": ["id", "name", "is_personal_account", "primary_owner_user_id", "slug"],
        "accounts_memberships": ["account_id", "user_id", "account_role"],
        "subscriptions": ["id", "account_id"],
        "roles": ["name", "hierarchy_level"],
        "invitations": ["id", "account_id", "email"],
        "notifications": ["id", "account_id"],
        "role_permissions": ["role", "permission"],
        "billing_customers": ["id", "account_id"]
    }
}"#;

const MAKERKIT_V1: &str = r#"{
    "tables": {
        "Accounts": ["id", "name"],
        "accounts_memberships": ["account_id", "user_id"]
    }
}"#;

async fn context_from(json: &str) -> DetectionAnalysisContext {
    let snapshot = SchemaSnapshot::from_json(json).unwrap();
    DetectionAnalysisContext::build(
        &SnapshotIntrospector::new(snapshot),
        &ProbePlan::from_pattern_library(),
        &ProbeOptions::default(),
        Reporter::quiet(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_full_makerkit_layout_is_top_tier() {
    let context = context_from(MAKERKIT_V3).await;
    let framework = Detector::default().detect_framework(&context);

    assert_eq!(framework.version(), FrameworkVersion::V3);
    assert!(framework.is_makerkit);
    assert!(framework.confidence() > 0.7);
    assert_eq!(framework.classification.confidence_level, ConfidenceLevel::VeryHigh);
    assert!(framework.missing_features.is_empty());
    assert!(framework
        .matched_features
        .iter()
        .any(|f| f == "personal_account_field"));
}

#[tokio::test]
async fn test_accounts_and_memberships_are_entry_tier() {
    let context = context_from(MAKERKIT_V1).await;
    let framework = Detector::default().detect_framework(&context);

    assert_eq!(framework.version(), FrameworkVersion::V1);
    assert!(framework.is_makerkit);
}

#[tokio::test]
async fn test_empty_snapshot_is_not_makerkit() {
    let context = context_from("{}").await;
    let framework = Detector::default().detect_framework(&context);

    assert!(!framework.is_makerkit);
    assert_eq!(framework.version(), FrameworkVersion::Absent);
    assert_eq!(framework.confidence(), 0.0);
}

#[test]
fn test_makerkit_hint_is_traced() {
    let context = DetectionAnalysisContext::builder()
        .tables(&["accounts", "memberships"])
        .hints(ContextHints {
            framework: Some("makerkit".to_string()),
            business_logic: None,
        })
        .build();
    let framework = Detector::default().detect_framework(&context);

    assert!(framework.is_makerkit);
    assert!(framework
        .classification
        .reasoning_trace
        .iter()
        .any(|line| line.contains("hint")));
}

#[test]
fn test_framework_recommendation_follows_confidence() {
    let detector = Detector::default();

    let strong = detector.detect_framework(
        &DetectionAnalysisContext::builder()
            .tables(&["accounts", "accounts_memberships", "subscriptions", "roles", "invitations"])
            .build(),
    );
    assert_eq!(strong.version(), FrameworkVersion::V2);
    assert!(strong.recommendations.iter().any(|r| r.contains("Strong")));

    let weak = detector.detect_framework(&DetectionAnalysisContext::builder().table("accounts").build());
    assert_eq!(weak.version(), FrameworkVersion::Custom);
    assert!(weak.confidence() <= 0.4);
}
