use seedscope::cache::{schema_hash, DetectionCache};
use seedscope::detection::{
    Architecture, ConfidenceLevel, DetectionConfig, DetectionSummary, Detector, Domain,
};
use seedscope::introspect::{
    ConstraintInfo, ConstraintKind, DetectionAnalysisContext, ProbeOptions, RelationshipInfo,
    SchemaSnapshot, SnapshotIntrospector,
};
use seedscope::telemetry::Reporter;
use std::sync::Arc;
use std::time::Duration;

fn single_user_schema() -> SchemaSnapshot {
    SchemaSnapshot::new()
        .with_table("users", &["id", "email"])
        .with_table("posts", &["id", "user_id", "title"])
        .with_relationship(RelationshipInfo::new("posts", "user_id", "users", "id"))
}

fn team_schema() -> DetectionAnalysisContext {
    DetectionAnalysisContext::builder()
        .tables(&["teams", "team_members", "projects", "invitations", "roles"])
        .relationship(RelationshipInfo::new("team_members", "team_id", "teams", "id"))
        .relationship(RelationshipInfo::new("projects", "team_id", "teams", "id"))
        .build()
}

fn workspace_schema() -> SchemaSnapshot {
    SchemaSnapshot::new()
        .with_table("workspaces", &["id", "name"])
        .with_table("workspace_members", &["workspace_id", "user_id"])
        .with_table("projects", &["id", "workspace_id", "title"])
}

fn outdoor_schema() -> DetectionAnalysisContext {
    DetectionAnalysisContext::builder()
        .tables(&["profiles", "gear", "trips", "trip_gear", "reviews"])
        .relationship(RelationshipInfo::new("gear", "user_id", "profiles", "id"))
        .relationship(RelationshipInfo::new("trips", "user_id", "profiles", "id"))
        .build()
}

#[tokio::test]
async fn test_single_owner_schema_is_individual() {
    let introspector = SnapshotIntrospector::new(single_user_schema());
    let detector = Detector::default();

    let summary = detector
        .detect_all(&introspector, &ProbeOptions::default(), Reporter::quiet())
        .await
        .unwrap();

    assert_eq!(summary.architecture.primary_label, Architecture::Individual);
    assert!(summary.architecture.confidence > 0.5);
    assert!(summary
        .architecture
        .evidence
        .iter()
        .any(|e| e.kind == "individual_user_content"));
    assert!(!summary.framework.is_makerkit);
}

#[test]
fn test_empty_schema_is_neutral_everywhere() {
    let detector = Detector::default();
    let context = DetectionAnalysisContext::default();

    let architecture = detector.detect_architecture(&context);
    let domain = detector.detect_domain(&context);
    assert_eq!(architecture.primary_label, Architecture::Individual);
    assert_eq!(domain.primary_label, Domain::Generic);
    assert_eq!(architecture.confidence, 0.0);
    assert_eq!(domain.confidence, 0.0);
    assert_eq!(domain.confidence_level, ConfidenceLevel::VeryLow);
    assert!(architecture.evidence.is_empty());
}

#[test]
fn test_team_schema_is_team() {
    let detector = Detector::default();
    let result = detector.detect_architecture(&team_schema());
    assert_eq!(result.primary_label, Architecture::Team);
    assert!(result.confidence > 0.5);
}

#[test]
fn test_classification_is_reproducible() {
    let detector = Detector::default();
    for context in [team_schema(), outdoor_schema()] {
        let first = detector.classify_architecture(&context);
        let second = detector.classify_architecture(&context);
        assert_eq!(first, second);
        assert_eq!(first.reasoning_trace, second.reasoning_trace);
        assert_eq!(detector.classify_domain(&context), detector.classify_domain(&context));
    }
}

#[test]
fn test_confidences_stay_in_unit_range() {
    let detector = Detector::new(DetectionConfig::default());
    let everything = DetectionAnalysisContext::builder()
        .tables(&[
            "users",
            "profiles",
            "teams",
            "team_members",
            "accounts",
            "accounts_memberships",
            "posts",
            "gear",
            "trips",
            "products",
            "orders",
            "followers",
            "subscriptions",
        ])
        .column("accounts", "is_personal_account")
        .column("posts", "user_id")
        .column("posts", "team_id")
        .build();

    for context in [everything, team_schema(), outdoor_schema()] {
        let architecture = detector.classify_architecture(&context);
        let domain = detector.classify_domain(&context);
        for confidence in std::iter::once(architecture.confidence)
            .chain(architecture.alternatives.iter().map(|a| a.confidence))
            .chain(std::iter::once(domain.confidence))
            .chain(domain.alternatives.iter().map(|a| a.confidence))
            .chain(architecture.evidence.iter().map(|e| e.confidence))
        {
            assert!((0.0..=1.0).contains(&confidence), "confidence {} out of range", confidence);
        }
    }
}

#[test]
fn test_alternatives_exclude_primary() {
    let detector = Detector::default();
    let result = detector.classify_domain(&outdoor_schema());
    assert!(result
        .alternatives
        .iter()
        .all(|a| a.label != result.primary_label));
}

#[tokio::test]
async fn test_persisted_cache_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("detections.json");
    let introspector = SnapshotIntrospector::new(single_user_schema());

    let cache = Arc::new(DetectionCache::open(&path, Duration::from_secs(3600)).unwrap());
    let detector = Detector::default().with_cache(cache.clone());
    let summary = detector
        .detect_all(&introspector, &ProbeOptions::default(), Reporter::quiet())
        .await
        .unwrap();
    cache.persist().await.unwrap();

    let hash = summary.schema_hash.clone().unwrap();
    let reopened: DetectionCache<DetectionSummary> = DetectionCache::open(&path, Duration::from_secs(3600)).unwrap();
    let cached = reopened.get(&hash).unwrap();
    assert_eq!(cached.schema_hash, summary.schema_hash);
    assert_eq!(cached.architecture.primary_label, summary.architecture.primary_label);
    assert_eq!(cached.domain.primary_label, summary.domain.primary_label);
    assert_eq!(cached.framework.version(), summary.framework.version());
}

#[test]
fn test_schema_hash_tracks_facts() {
    let base = DetectionAnalysisContext::builder()
        .tables(&["users", "posts"])
        .build();
    let same = DetectionAnalysisContext::builder()
        .tables(&["posts", "users"])
        .build();
    let different = DetectionAnalysisContext::builder()
        .tables(&["users", "posts", "teams"])
        .build();

    assert_eq!(schema_hash(&base).unwrap(), schema_hash(&same).unwrap());
    assert_ne!(schema_hash(&base).unwrap(), schema_hash(&different).unwrap());
}

#[tokio::test]
async fn test_introspected_constraints_count_as_team_evidence() {
    let detector = Detector::default();
    let options = ProbeOptions::default();

    let bare = detector
        .detect_all(&SnapshotIntrospector::new(workspace_schema()), &options, Reporter::quiet())
        .await
        .unwrap();
    let keyed = detector
        .detect_all(
            &SnapshotIntrospector::new(
                workspace_schema()
                    .with_constraint(ConstraintInfo::new(
                        "workspace_members",
                        "workspace_members_workspace_id_user_id_key",
                        ConstraintKind::Unique,
                        "UNIQUE (workspace_id, user_id)",
                    ))
                    .with_constraint(ConstraintInfo::new(
                        "projects",
                        "projects_workspace_id_fkey",
                        ConstraintKind::ForeignKey,
                        "FOREIGN KEY (workspace_id) REFERENCES workspaces(id) ON DELETE CASCADE",
                    )),
            ),
            &options,
            Reporter::quiet(),
        )
        .await
        .unwrap();

    let kinds = |summary: &DetectionSummary| -> Vec<String> {
        summary.architecture.evidence.iter().map(|e| e.kind.clone()).collect()
    };
    assert!(!kinds(&bare).contains(&"membership_key_pair".to_string()));
    assert!(kinds(&keyed).contains(&"membership_key_pair".to_string()));
    assert!(kinds(&keyed).contains(&"tenant_foreign_keys".to_string()));
    assert_eq!(keyed.architecture.primary_label, Architecture::Team);
}

#[test]
fn test_personal_slug_check_indicates_hybrid() {
    let context = DetectionAnalysisContext::builder()
        .tables(&["accounts", "projects"])
        .constraint(ConstraintInfo::new(
            "accounts",
            "accounts_slug_null_if_personal_account_true",
            ConstraintKind::Check,
            "CHECK ((((is_personal_account = true) AND (slug IS NULL)) OR ((is_personal_account = false) AND (slug IS NOT NULL))))",
        ))
        .build();
    let result = Detector::default().detect_architecture(&context);

    assert_eq!(result.primary_label, Architecture::Hybrid);
    assert!(result
        .evidence
        .iter()
        .any(|e| e.kind == "personal_account_slug_check"));
}
