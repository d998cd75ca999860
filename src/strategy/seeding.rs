//! The seeding strategy capability.

use async_trait::async_trait;

use super::profile::FrameworkProfile;
use crate::detection::{ClassificationResult, FrameworkVersion};
use crate::introspect::DetectionAnalysisContext;

/// A way of seeding a family of schemas.
///
/// `detect` answers how well the schema fits this strategy; the registry
/// compares those answers to pick one.
#[async_trait]
pub trait SeedingStrategy: Send + Sync {
    /// Registry key.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Classify the schema from this strategy's point of view.
    async fn detect(&self, context: &DetectionAnalysisContext) -> ClassificationResult<FrameworkVersion>;

    /// Seeding profile for a schema this strategy was selected for.
    fn framework_profile(
        &self,
        classification: &ClassificationResult<FrameworkVersion>,
        context: &DetectionAnalysisContext,
    ) -> FrameworkProfile;
}
