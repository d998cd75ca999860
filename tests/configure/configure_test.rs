use seedscope::configure::{
    write_configuration, AutoConfigOptions, AutoConfigurator, ConfigOverrides, ConfigurationTemplate,
    GenerationMode, SeedConfiguration,
};
use seedscope::detection::{Architecture, DetectionSummary, Detector, Domain, FrameworkVersion};
use seedscope::introspect::{DetectionAnalysisContext, RelationshipInfo};
use seedscope::strategy::{FrameworkProfile, StrategyRegistry, StrategySelection};

fn makerkit_v3() -> DetectionAnalysisContext {
    DetectionAnalysisContext::builder()
        .tables(&[
            "accounts",
            "accounts_memberships",
            "subscriptions",
            "roles",
            "invitations",
            "notifications",
            "role_permissions",
            "billing_customers",
        ])
        .column("accounts", "is_personal_account")
        .column("accounts", "primary_owner_user_id")
        .column("accounts", "slug")
        .build()
}

fn blog() -> DetectionAnalysisContext {
    DetectionAnalysisContext::builder()
        .tables(&["users", "posts"])
        .relationship(RelationshipInfo::new("posts", "user_id", "users", "id"))
        .build()
}

async fn detect_and_select(context: &DetectionAnalysisContext) -> (DetectionSummary, StrategySelection) {
    let summary = Detector::default().summarize(context);
    let selection = StrategyRegistry::with_defaults().select_strategy(context, None).await;
    (summary, selection)
}

#[tokio::test]
async fn test_makerkit_pipeline_configures_accounts() {
    let context = makerkit_v3();
    let (summary, selection) = detect_and_select(&context).await;
    let options = AutoConfigOptions::new(GenerationMode::Comprehensive).with_selection(selection);

    let result = AutoConfigurator::new().generate_configuration(&summary, &options);
    let configuration = &result.configuration;

    assert!(result
        .metrics
        .templates_applied
        .contains(&"makerkit_accounts".to_string()));
    assert_eq!(result.metrics.strategy_used, "comprehensive");
    assert_eq!(configuration.strategy, "makerkit");
    assert_eq!(
        configuration.framework,
        FrameworkProfile::MakerKit {
            version: FrameworkVersion::V3,
            personal_accounts: true,
            team_accounts: true,
        }
    );
    assert!(configuration.create_personal_accounts);
    assert!(configuration.create_team_accounts);
    assert_eq!(configuration.teams_count, 3);
    assert_eq!(configuration.members_per_team, 4);
    assert!(configuration.enable_billing_data);
    assert!(configuration.enable_notifications);
    assert!((0.0..=1.0).contains(&result.confidence));
}

#[tokio::test]
async fn test_highest_priority_template_wins() {
    let context = blog();
    let (summary, selection) = detect_and_select(&context).await;

    let mut configurator = AutoConfigurator::new();
    configurator.add_template(
        ConfigurationTemplate::new("house_style_small", "Small runs", 1).with_overrides(ConfigOverrides {
            user_count: Some(3),
            ..ConfigOverrides::default()
        }),
    );
    configurator.add_template(
        ConfigurationTemplate::new("house_style_large", "Large runs", 200).with_overrides(ConfigOverrides {
            user_count: Some(77),
            ..ConfigOverrides::default()
        }),
    );

    let options = AutoConfigOptions::new(GenerationMode::Comprehensive).with_selection(selection);
    let result = configurator.generate_configuration(&summary, &options);

    assert_eq!(result.configuration.user_count, 77);
    let applied = &result.metrics.templates_applied;
    let small = applied.iter().position(|id| id == "house_style_small").unwrap();
    let large = applied.iter().position(|id| id == "house_style_large").unwrap();
    assert!(small < large);
    assert_eq!(applied.last().map(String::as_str), Some("house_style_large"));
}

#[tokio::test]
async fn test_caller_overrides_apply_last() {
    let context = blog();
    let (summary, selection) = detect_and_select(&context).await;

    for mode in [
        GenerationMode::Comprehensive,
        GenerationMode::Minimal,
        GenerationMode::Conservative,
        GenerationMode::Optimized,
    ] {
        let options = AutoConfigOptions::new(mode)
            .with_selection(selection.clone())
            .with_overrides(ConfigOverrides {
                user_count: Some(42),
                enable_real_images: Some(true),
                ..ConfigOverrides::default()
            });
        let result = AutoConfigurator::new().generate_configuration(&summary, &options);
        assert_eq!(result.configuration.user_count, 42, "mode {}", mode);
        assert!(result.configuration.enable_real_images, "mode {}", mode);
        assert_eq!(result.metrics.strategy_used, mode.to_string());
    }
}

#[tokio::test]
async fn test_invalid_override_yields_fallback() {
    let context = blog();
    let (summary, _) = detect_and_select(&context).await;
    let options = AutoConfigOptions::new(GenerationMode::Comprehensive).with_overrides(ConfigOverrides {
        user_count: Some(0),
        ..ConfigOverrides::default()
    });

    let result = AutoConfigurator::new().generate_configuration(&summary, &options);
    assert_eq!(result.metrics.strategy_used, "fallback");
    assert_eq!(result.confidence, 0.3);
    assert_eq!(result.configuration, SeedConfiguration::default());
    assert!(result.warnings[0].contains("generation failed"));
}

#[tokio::test]
async fn test_conservative_mode_neutralizes_uncertain_labels() {
    let context = DetectionAnalysisContext::builder().tables(&["teams", "widgets"]).build();
    let (summary, selection) = detect_and_select(&context).await;
    let options = AutoConfigOptions::new(GenerationMode::Conservative).with_selection(selection);

    let result = AutoConfigurator::new().generate_configuration(&summary, &options);
    assert_eq!(result.configuration.architecture, Architecture::Individual);
    assert_eq!(result.configuration.domain, Domain::Generic);
    assert!(!result.configuration.create_team_accounts);
    assert!(result.warnings.iter().any(|w| w.contains("using individual accounts")));
    assert!(result.reasoning.iter().any(|r| r == "Applied safe defaults"));
}

#[tokio::test]
async fn test_written_configuration_reads_back() {
    let context = makerkit_v3();
    let (summary, selection) = detect_and_select(&context).await;
    let options = AutoConfigOptions::new(GenerationMode::Optimized).with_selection(selection);
    let result = AutoConfigurator::new().generate_configuration(&summary, &options);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("seed.json");
    write_configuration(&result.configuration, &path).unwrap();

    let read: SeedConfiguration = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(read.user_count, result.configuration.user_count);
    assert_eq!(read.framework, result.configuration.framework);
    assert_eq!(read.content_types, result.configuration.content_types);
}
