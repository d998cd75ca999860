//! MakerKit accounts-based strategy.

use async_trait::async_trait;

use super::profile::FrameworkProfile;
use super::seeding::SeedingStrategy;
use crate::detection::{ClassificationResult, Detector, FrameworkVersion};
use crate::introspect::DetectionAnalysisContext;

/// Seeds `accounts`-based MakerKit schemas.
#[derive(Default)]
pub struct MakerKitStrategy {
    detector: Detector,
}

impl MakerKitStrategy {
    pub const NAME: &'static str = "makerkit";

    pub fn new(detector: Detector) -> Self {
        Self { detector }
    }
}

#[async_trait]
impl SeedingStrategy for MakerKitStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "MakerKit accounts with personal and team ownership"
    }

    async fn detect(&self, context: &DetectionAnalysisContext) -> ClassificationResult<FrameworkVersion> {
        let framework = self.detector.classify_framework(context);
        let mut classification = framework.classification;
        classification
            .reasoning_trace
            .extend(framework.recommendations.into_iter().map(|r| format!("Recommendation: {}", r)));
        classification
    }

    fn framework_profile(
        &self,
        classification: &ClassificationResult<FrameworkVersion>,
        context: &DetectionAnalysisContext,
    ) -> FrameworkProfile {
        let version = classification.primary_label;
        let team_accounts = context.tables().iter().any(|t| t.ends_with("memberships"));
        let personal_accounts = version == FrameworkVersion::V3
            || context.has_column("accounts", "is_personal_account")
            || !team_accounts;

        match FrameworkProfile::makerkit(version, personal_accounts, team_accounts) {
            Ok(profile) => profile,
            Err(error) => {
                tracing::warn!(%error, "MakerKit profile does not fit this schema; using a generic profile");
                let user_table = if context.has_table("accounts") { "accounts" } else { "users" };
                FrameworkProfile::generic(user_table)
            }
        }
    }
}
