//! Detection entry point.
//!
//! [`Detector`] runs analyzers and aggregation for each question and is the
//! error boundary of the detection layer: anything that goes wrong inside
//! aggregation comes back as a fallback result with `errors[]` populated.
//! Only fatal introspection failures (authentication, connectivity) escape
//! [`Detector::detect_all`].

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::aggregator::{AggregationWeights, EvidenceAggregator};
use super::analyzer::analyze;
use super::error::DetectionResult;
use super::framework::{self, FrameworkClassification};
use super::patterns::{architecture_rules, domain_rules, PatternRule};
use super::thresholds;
use super::types::{Architecture, ClassLabel, ClassificationResult, Domain};
use crate::cache::{schema_hash, CacheStatus, DetectionCache};
use crate::introspect::{DetectionAnalysisContext, ProbeOptions, SchemaIntrospector};
use crate::telemetry::Reporter;

/// Detection tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub weights: AggregationWeights,
    /// Results below this confidence carry a warning.
    pub low_confidence_warning: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            weights: AggregationWeights::default(),
            low_confidence_warning: thresholds::level::LOW,
        }
    }
}

/// All three classifications of one schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
    /// Absent when the context was partial and therefore not cacheable.
    pub schema_hash: Option<String>,
    pub architecture: ClassificationResult<Architecture>,
    pub domain: ClassificationResult<Domain>,
    pub framework: FrameworkClassification,
    /// Context-level warnings (gaps, partial probing).
    pub warnings: Vec<String>,
}

/// Runs schema classification.
#[derive(Default)]
pub struct Detector {
    config: DetectionConfig,
    aggregator: EvidenceAggregator,
    cache: Option<Arc<DetectionCache<DetectionSummary>>>,
}

impl Detector {
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            aggregator: EvidenceAggregator::with_weights(config.weights),
            cache: None,
        }
    }

    /// Share a result cache keyed by schema hash.
    pub fn with_cache(mut self, cache: Arc<DetectionCache<DetectionSummary>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    fn classify_labels<L: ClassLabel>(
        &self,
        rules: &[PatternRule<L>],
        context: &DetectionAnalysisContext,
    ) -> ClassificationResult<L> {
        let results = analyze(rules, context);
        let mut result = match self.aggregator.classify(&results, context.table_count()) {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(%error, "aggregation failed; returning fallback result");
                ClassificationResult::fallback(error, context.table_count())
            }
        };
        self.annotate(context, &mut result.warnings, result.confidence);
        result
    }

    fn annotate(&self, context: &DetectionAnalysisContext, warnings: &mut Vec<String>, confidence: f64) {
        warnings.extend(context_warnings(context));
        if confidence < self.config.low_confidence_warning {
            warnings.push(format!(
                "Low detection confidence ({:.2}); consider a manual override",
                confidence
            ));
        }
    }

    /// Architecture classification without timing. Deterministic.
    pub fn classify_architecture(&self, context: &DetectionAnalysisContext) -> ClassificationResult<Architecture> {
        self.classify_labels(architecture_rules(), context)
    }

    /// Domain classification without timing. Deterministic.
    pub fn classify_domain(&self, context: &DetectionAnalysisContext) -> ClassificationResult<Domain> {
        self.classify_labels(domain_rules(), context)
    }

    /// Framework classification without timing. Deterministic.
    pub fn classify_framework(&self, context: &DetectionAnalysisContext) -> FrameworkClassification {
        let mut result = match framework::classify_framework(context) {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(%error, "framework classification failed; returning fallback result");
                FrameworkClassification::fallback(error, context.table_count())
            }
        };
        let confidence = result.confidence();
        self.annotate(context, &mut result.classification.warnings, confidence);
        result
    }

    pub fn detect_architecture(&self, context: &DetectionAnalysisContext) -> ClassificationResult<Architecture> {
        let started = Instant::now();
        let mut result = self.classify_architecture(context);
        result.metrics.execution_time_ms = elapsed_ms(started);
        tracing::info!(
            architecture = %result.primary_label,
            confidence = result.confidence,
            "architecture detected"
        );
        result
    }

    pub fn detect_domain(&self, context: &DetectionAnalysisContext) -> ClassificationResult<Domain> {
        let started = Instant::now();
        let mut result = self.classify_domain(context);
        result.metrics.execution_time_ms = elapsed_ms(started);
        tracing::info!(domain = %result.primary_label, confidence = result.confidence, "domain detected");
        result
    }

    pub fn detect_framework(&self, context: &DetectionAnalysisContext) -> FrameworkClassification {
        let started = Instant::now();
        let mut result = self.classify_framework(context);
        result.classification.metrics.execution_time_ms = elapsed_ms(started);
        tracing::info!(
            framework = %result.version(),
            confidence = result.confidence(),
            "framework detected"
        );
        result
    }

    /// Run all three classifications on a built context.
    pub fn summarize(&self, context: &DetectionAnalysisContext) -> DetectionSummary {
        DetectionSummary {
            schema_hash: None,
            architecture: self.detect_architecture(context),
            domain: self.detect_domain(context),
            framework: self.detect_framework(context),
            warnings: context_warnings(context),
        }
    }

    /// Summarize a context, reusing a cached summary for the same schema.
    ///
    /// Partial contexts bypass the cache.
    pub async fn detect_context(&self, context: &DetectionAnalysisContext) -> DetectionResult<DetectionSummary> {
        let cache = match &self.cache {
            Some(cache) if !context.is_partial() => cache,
            _ => return Ok(self.summarize(context)),
        };

        let hash = match schema_hash(context) {
            Ok(hash) => hash,
            Err(error) => {
                tracing::warn!(%error, "could not hash schema; skipping cache");
                return Ok(self.summarize(context));
            }
        };
        let config_used = serde_json::to_value(self.config).unwrap_or_default();

        let (summary, status) = cache
            .get_or_compute(&hash, config_used, || async {
                let mut summary = self.summarize(context);
                summary.schema_hash = Some(hash.clone());
                Ok::<_, super::DetectionError>(summary)
            })
            .await?;

        if status == CacheStatus::Hit {
            tracing::debug!(schema_hash = %hash, "detection cache hit");
            context.reporter().detail("Using cached detection results");
        }
        Ok(summary)
    }

    /// Probe a schema and classify it.
    ///
    /// # Errors
    ///
    /// Only fatal introspection failures (authentication, connectivity).
    pub async fn detect_all(
        &self,
        introspector: &dyn SchemaIntrospector,
        options: &ProbeOptions,
        reporter: Reporter,
    ) -> DetectionResult<DetectionSummary> {
        let context = DetectionAnalysisContext::build(
            introspector,
            &crate::introspect::ProbePlan::from_pattern_library(),
            options,
            reporter,
        )
        .await?;
        self.detect_context(&context).await
    }
}

fn context_warnings(context: &DetectionAnalysisContext) -> Vec<String> {
    let mut warnings = Vec::new();
    if context.is_partial() {
        warnings.push("Schema probing hit the overall time limit; results are partial".to_string());
    }
    if !context.gaps().is_empty() {
        warnings.push(format!(
            "{} schema probe(s) failed and were treated as absent",
            context.gaps().len()
        ));
    }
    warnings
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{ConfidenceLevel, FrameworkVersion};
    use crate::introspect::{RelationshipInfo, SchemaSnapshot, SnapshotIntrospector};
    use std::time::Duration;

    fn individual_context() -> DetectionAnalysisContext {
        DetectionAnalysisContext::builder()
            .tables(&["profiles", "posts", "trips"])
            .relationship(RelationshipInfo::new("posts", "user_id", "profiles", "id"))
            .relationship(RelationshipInfo::new("trips", "user_id", "profiles", "id"))
            .build()
    }

    #[test]
    fn test_empty_context_is_neutral() {
        let detector = Detector::default();
        let context = DetectionAnalysisContext::builder().build();

        let architecture = detector.detect_architecture(&context);
        assert_eq!(architecture.primary_label, Architecture::Individual);
        assert_eq!(architecture.confidence, 0.0);
        assert_eq!(architecture.confidence_level, ConfidenceLevel::VeryLow);
        assert!(architecture.warnings.iter().any(|w| w.contains("Low detection confidence")));

        let domain = detector.detect_domain(&context);
        assert_eq!(domain.primary_label, Domain::Generic);
        assert_eq!(domain.confidence, 0.0);

        let framework = detector.detect_framework(&context);
        assert_eq!(framework.version(), FrameworkVersion::Absent);
        assert!(!framework.is_makerkit);
    }

    #[test]
    fn test_individual_schema() {
        let detector = Detector::default();
        let result = detector.detect_architecture(&individual_context());
        assert_eq!(result.primary_label, Architecture::Individual);
        assert!(result.confidence > 0.5);
        assert!(!result.evidence.is_empty());
        assert!(result.alternatives.iter().all(|a| a.label != Architecture::Individual));
    }

    #[test]
    fn test_classification_is_deterministic() {
        let detector = Detector::default();
        let context = individual_context();
        let first = detector.classify_architecture(&context);
        let second = detector.classify_architecture(&context);
        assert_eq!(first, second);
        assert_eq!(detector.classify_domain(&context), detector.classify_domain(&context));
        assert_eq!(detector.classify_framework(&context), detector.classify_framework(&context));
    }

    #[test]
    fn test_invalid_weights_degrade_to_fallback() {
        let detector = Detector::new(DetectionConfig {
            weights: AggregationWeights {
                diminishing_factor: f64::NAN,
                ..AggregationWeights::default()
            },
            ..DetectionConfig::default()
        });
        let result = detector.detect_architecture(&individual_context());
        assert_eq!(result.primary_label, Architecture::Individual);
        assert_eq!(result.confidence, 0.0);
        assert!(!result.errors.is_empty());
        assert_eq!(result.metrics.strategy_used, "fallback");
    }

    #[tokio::test]
    async fn test_detect_all_uses_cache() {
        let snapshot = SchemaSnapshot::default()
            .with_table("profiles", &["id"])
            .with_table("posts", &["id", "user_id"])
            .with_relationship(RelationshipInfo::new("posts", "user_id", "profiles", "id"));
        let introspector = SnapshotIntrospector::new(snapshot);
        let cache = Arc::new(DetectionCache::new(Duration::from_secs(60)));
        let detector = Detector::default().with_cache(cache.clone());

        let first = detector
            .detect_all(&introspector, &ProbeOptions::default(), Reporter::quiet())
            .await
            .unwrap();
        assert!(first.schema_hash.is_some());
        assert_eq!(cache.len(), 1);

        let second = detector
            .detect_all(&introspector, &ProbeOptions::default(), Reporter::quiet())
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_detect_context_without_cache_has_no_hash() {
        let detector = Detector::default();
        let summary = detector.detect_context(&individual_context()).await.unwrap();
        assert!(summary.schema_hash.is_none());
        assert_eq!(summary.architecture.primary_label, Architecture::Individual);
        assert!(summary.warnings.is_empty());
    }
}
