//! Configuration templates.
//!
//! A template is a scoped override layer. It applies when its architecture
//! and domain scopes match the detection, the scoped confidence reaches
//! `minimum_confidence`, and `should_apply` agrees. Templates are data: new
//! platform shapes are added to [`builtin_templates`], not to the
//! configurator.

use std::sync::LazyLock;

use super::types::{ConfigOverrides, SeedConfiguration};
use crate::detection::{Architecture, DetectionSummary, Domain, FrameworkVersion};
use crate::strategy::FrameworkProfile;

/// What a template can see.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub architecture: Architecture,
    pub architecture_confidence: f64,
    pub domain: Domain,
    pub domain_confidence: f64,
    pub framework: &'a FrameworkProfile,
    pub detection: &'a DetectionSummary,
}

impl<'a> TemplateContext<'a> {
    pub fn new(detection: &'a DetectionSummary, framework: &'a FrameworkProfile) -> Self {
        Self {
            architecture: detection.architecture.primary_label,
            architecture_confidence: detection.architecture.confidence,
            domain: detection.domain.primary_label,
            domain_confidence: detection.domain.confidence,
            framework,
            detection,
        }
    }

    /// Mean of the architecture and domain confidences.
    pub fn detection_confidence(&self) -> f64 {
        ((self.architecture_confidence + self.domain_confidence) / 2.0).clamp(0.0, 1.0)
    }

    /// Whether a pattern rule with this id contributed evidence.
    pub fn has_evidence(&self, kind: &str) -> bool {
        self.detection.architecture.evidence.iter().any(|e| e.kind == kind)
            || self.detection.domain.evidence.iter().any(|e| e.kind == kind)
    }
}

pub type ApplyFn = fn(&TemplateContext<'_>) -> bool;
pub type GenerateFn = fn(&TemplateContext<'_>, &SeedConfiguration) -> ConfigOverrides;

/// A scoped, prioritized override layer.
#[derive(Debug, Clone)]
pub struct ConfigurationTemplate {
    pub id: &'static str,
    pub description: &'static str,
    /// `None` matches any architecture.
    pub architecture: Option<Architecture>,
    /// `None` matches any domain.
    pub domain: Option<Domain>,
    pub minimum_confidence: f64,
    /// Higher wins when templates overlap.
    pub priority: i32,
    pub overrides: ConfigOverrides,
    pub should_apply: ApplyFn,
    /// Computes further overrides from the configuration built so far.
    pub generate: Option<GenerateFn>,
}

fn always(_: &TemplateContext<'_>) -> bool {
    true
}

impl ConfigurationTemplate {
    pub fn new(id: &'static str, description: &'static str, priority: i32) -> Self {
        Self {
            id,
            description,
            architecture: None,
            domain: None,
            minimum_confidence: 0.0,
            priority,
            overrides: ConfigOverrides::default(),
            should_apply: always,
            generate: None,
        }
    }

    pub fn for_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = Some(architecture);
        self
    }

    pub fn for_domain(mut self, domain: Domain) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn min_confidence(mut self, confidence: f64) -> Self {
        self.minimum_confidence = confidence;
        self
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn when(mut self, should_apply: ApplyFn) -> Self {
        self.should_apply = should_apply;
        self
    }

    pub fn generating(mut self, generate: GenerateFn) -> Self {
        self.generate = Some(generate);
        self
    }

    /// Confidence of the scopes this template names.
    ///
    /// Unscoped templates use the overall detection confidence.
    pub fn scoped_confidence(&self, context: &TemplateContext<'_>) -> f64 {
        match (self.architecture, self.domain) {
            (Some(_), Some(_)) => context.architecture_confidence.min(context.domain_confidence),
            (Some(_), None) => context.architecture_confidence,
            (None, Some(_)) => context.domain_confidence,
            (None, None) => context.detection_confidence(),
        }
    }

    pub fn matches(&self, context: &TemplateContext<'_>) -> bool {
        self.architecture.map_or(true, |a| a == context.architecture)
            && self.domain.map_or(true, |d| d == context.domain)
            && self.scoped_confidence(context) >= self.minimum_confidence
            && (self.should_apply)(context)
    }
}

fn strings(values: &[&str]) -> Option<Vec<String>> {
    Some(values.iter().map(|v| v.to_string()).collect())
}

fn low_confidence(context: &TemplateContext<'_>) -> bool {
    context.architecture_confidence < 0.5 && context.domain_confidence < 0.5
}

fn makerkit_accounts(context: &TemplateContext<'_>, _base: &SeedConfiguration) -> ConfigOverrides {
    match context.framework {
        FrameworkProfile::MakerKit {
            version,
            personal_accounts,
            team_accounts,
        } => ConfigOverrides {
            create_personal_accounts: Some(*personal_accounts),
            create_team_accounts: Some(*team_accounts),
            teams_count: team_accounts.then_some(3),
            members_per_team: team_accounts.then_some(4),
            enable_billing_data: Some(matches!(version, FrameworkVersion::V2 | FrameworkVersion::V3)),
            enable_notifications: Some(*version == FrameworkVersion::V3),
            ..ConfigOverrides::default()
        },
        FrameworkProfile::Generic { .. } => ConfigOverrides::default(),
    }
}

fn ecommerce_volume(_context: &TemplateContext<'_>, base: &SeedConfiguration) -> ConfigOverrides {
    ConfigOverrides {
        content_per_user: Some((base.categories.len() as u32).max(1) * 3),
        ..ConfigOverrides::default()
    }
}

fn social_audience(_context: &TemplateContext<'_>, base: &SeedConfiguration) -> ConfigOverrides {
    ConfigOverrides {
        user_count: Some(base.user_count.max(30)),
        ..ConfigOverrides::default()
    }
}

static BUILTIN: LazyLock<Vec<ConfigurationTemplate>> = LazyLock::new(|| {
    vec![
        ConfigurationTemplate::new("outdoor_gear_showcase", "Image-rich gear catalog", 80)
            .for_domain(Domain::Outdoor)
            .min_confidence(0.5)
            .when(|c| c.has_evidence("outdoor_gear_catalog"))
            .with_overrides(ConfigOverrides {
                images_per_content: Some(5),
                enable_real_images: Some(true),
                categories: strings(&["tents", "backpacks", "footwear", "climbing", "navigation"]),
                ..ConfigOverrides::default()
            }),
        ConfigurationTemplate::new("outdoor_community", "Shared trips and reviews", 60)
            .for_domain(Domain::Outdoor)
            .min_confidence(0.4)
            .with_overrides(ConfigOverrides {
                images_per_content: Some(2),
                enable_social_features: Some(true),
                public_content_ratio: Some(0.9),
                content_types: strings(&["gear", "trips", "reviews", "trip_reports"]),
                ..ConfigOverrides::default()
            }),
        ConfigurationTemplate::new("saas_team_workspace", "Team workspaces with billing", 90)
            .for_architecture(Architecture::Team)
            .for_domain(Domain::Saas)
            .min_confidence(0.5)
            .with_overrides(ConfigOverrides {
                teams_count: Some(5),
                members_per_team: Some(8),
                enable_notifications: Some(true),
                enable_billing_data: Some(true),
                ..ConfigOverrides::default()
            }),
        ConfigurationTemplate::new("saas_hybrid_accounts", "Personal and team workspaces", 85)
            .for_architecture(Architecture::Hybrid)
            .for_domain(Domain::Saas)
            .min_confidence(0.5)
            .with_overrides(ConfigOverrides {
                create_personal_accounts: Some(true),
                create_team_accounts: Some(true),
                teams_count: Some(3),
                members_per_team: Some(4),
                ..ConfigOverrides::default()
            }),
        ConfigurationTemplate::new("ecommerce_catalog", "Product catalog with orders", 70)
            .for_domain(Domain::Ecommerce)
            .min_confidence(0.5)
            .with_overrides(ConfigOverrides {
                images_per_content: Some(5),
                enable_billing_data: Some(true),
                ..ConfigOverrides::default()
            })
            .generating(ecommerce_volume),
        ConfigurationTemplate::new("social_network", "Follower graph and feeds", 75)
            .for_domain(Domain::Social)
            .min_confidence(0.5)
            .with_overrides(ConfigOverrides {
                enable_social_features: Some(true),
                enable_notifications: Some(true),
                ..ConfigOverrides::default()
            })
            .generating(social_audience),
        ConfigurationTemplate::new("makerkit_accounts", "MakerKit account layout", 95)
            .when(|c| c.framework.is_makerkit())
            .generating(makerkit_accounts),
        ConfigurationTemplate::new("low_confidence_safety", "Small run for uncertain schemas", 10)
            .when(low_confidence)
            .with_overrides(ConfigOverrides {
                user_count: Some(5),
                enable_real_images: Some(false),
                ..ConfigOverrides::default()
            }),
        ConfigurationTemplate::new("generic_baseline", "Plain items and notes", 5)
            .for_domain(Domain::Generic)
            .with_overrides(ConfigOverrides {
                content_types: strings(&["items", "notes"]),
                categories: strings(&["general"]),
                ..ConfigOverrides::default()
            }),
    ]
});

/// The built-in templates in declaration order.
pub fn builtin_templates() -> &'static [ConfigurationTemplate] {
    &BUILTIN
}
