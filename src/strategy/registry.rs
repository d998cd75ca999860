//! Strategy registry and selection.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use super::generic::GenericStrategy;
use super::makerkit::MakerKitStrategy;
use super::profile::FrameworkProfile;
use super::seeding::SeedingStrategy;
use crate::detection::thresholds::strategy as limits;
use crate::detection::{ClassificationResult, FrameworkVersion};
use crate::introspect::DetectionAnalysisContext;

/// Why a strategy was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    ManualOverride,
    HighConfidence,
    Fallback,
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManualOverride => write!(f, "manual_override"),
            Self::HighConfidence => write!(f, "high_confidence"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Outcome of strategy selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySelection {
    pub strategy_name: String,
    /// The chosen strategy's own view of the schema.
    pub classification: ClassificationResult<FrameworkVersion>,
    pub reason: SelectionReason,
    pub profile: FrameworkProfile,
    pub warnings: Vec<String>,
}

/// Fitness of one strategy for a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyValidation {
    pub valid: bool,
    pub confidence: f64,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

struct Candidate {
    strategy: Arc<dyn SeedingStrategy>,
    classification: ClassificationResult<FrameworkVersion>,
}

/// Named seeding strategies with a designated fallback.
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn SeedingStrategy>>,
    fallback: Arc<dyn SeedingStrategy>,
    min_confidence: f64,
}

impl StrategyRegistry {
    /// Registry holding only `fallback`.
    pub fn new(fallback: Arc<dyn SeedingStrategy>, min_confidence: f64) -> Self {
        Self {
            strategies: vec![fallback.clone()],
            fallback,
            min_confidence: min_confidence.clamp(0.0, 1.0),
        }
    }

    /// MakerKit plus the generic fallback.
    pub fn with_defaults() -> Self {
        Self::with_min_confidence(limits::MIN_STRATEGY_CONFIDENCE)
    }

    /// Default strategies with a custom selection threshold.
    pub fn with_min_confidence(min_confidence: f64) -> Self {
        let mut registry = Self::new(Arc::new(GenericStrategy), min_confidence);
        registry.register(Arc::new(MakerKitStrategy::default()));
        registry
    }

    /// Add a strategy, replacing any with the same name.
    pub fn register(&mut self, strategy: Arc<dyn SeedingStrategy>) {
        if strategy.name() == self.fallback.name() {
            self.fallback = strategy.clone();
        }
        match self.strategies.iter_mut().find(|s| s.name() == strategy.name()) {
            Some(slot) => *slot = strategy,
            None => self.strategies.push(strategy),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SeedingStrategy>> {
        self.strategies.iter().find(|s| s.name() == name).cloned()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn fallback_name(&self) -> &'static str {
        self.fallback.name()
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    async fn candidates(&self, context: &DetectionAnalysisContext) -> Vec<Candidate> {
        let detections = join_all(self.strategies.iter().map(|s| s.detect(context))).await;
        self.strategies
            .iter()
            .cloned()
            .zip(detections)
            .map(|(strategy, classification)| Candidate {
                strategy,
                classification,
            })
            .collect()
    }

    fn selection(
        candidate: &Candidate,
        reason: SelectionReason,
        context: &DetectionAnalysisContext,
        warnings: Vec<String>,
    ) -> StrategySelection {
        tracing::info!(
            strategy = candidate.strategy.name(),
            %reason,
            confidence = candidate.classification.confidence,
            "seeding strategy selected"
        );
        StrategySelection {
            strategy_name: candidate.strategy.name().to_string(),
            profile: candidate
                .strategy
                .framework_profile(&candidate.classification, context),
            classification: candidate.classification.clone(),
            reason,
            warnings,
        }
    }

    /// Choose a strategy for the schema.
    ///
    /// An override naming a registered strategy always wins; evidence that
    /// favors another strategy is reported as warnings. Otherwise the most
    /// confident strategy at or above the threshold is chosen (registration
    /// order breaks ties), else the fallback.
    pub async fn select_strategy(
        &self,
        context: &DetectionAnalysisContext,
        override_name: Option<&str>,
    ) -> StrategySelection {
        let mut candidates = self.candidates(context).await;
        let mut warnings = Vec::new();

        if let Some(name) = override_name {
            match candidates.iter().find(|c| c.strategy.name() == name) {
                Some(chosen) => {
                    let own = chosen.classification.confidence;
                    if own < limits::VALIDATION_MIN {
                        warnings.push(format!(
                            "Strategy '{}' has low confidence ({:.2}) for this schema",
                            name, own
                        ));
                    }
                    for other in candidates.iter().filter(|c| c.strategy.name() != name) {
                        let theirs = other.classification.confidence;
                        if theirs > own && theirs >= self.min_confidence {
                            warnings.push(format!(
                                "Schema evidence favors '{}' ({:.2}) over the requested '{}' ({:.2})",
                                other.strategy.name(),
                                theirs,
                                name,
                                own
                            ));
                        }
                    }
                    return Self::selection(chosen, SelectionReason::ManualOverride, context, warnings);
                }
                None => {
                    tracing::warn!(strategy = name, "unknown strategy override");
                    warnings.push(format!(
                        "Unknown strategy '{}'; available: {}. Selecting automatically",
                        name,
                        self.names().join(", ")
                    ));
                }
            }
        }

        let best = candidates.iter().fold(None::<&Candidate>, |best, candidate| match best {
            Some(b) if b.classification.confidence >= candidate.classification.confidence => Some(b),
            _ => Some(candidate),
        });

        if let Some(best) = best.filter(|b| b.classification.confidence >= self.min_confidence) {
            return Self::selection(best, SelectionReason::HighConfidence, context, warnings);
        }

        warnings.push(format!(
            "No strategy reached confidence {:.2}; using '{}'",
            self.min_confidence,
            self.fallback.name()
        ));
        let fallback = match candidates
            .iter()
            .position(|c| c.strategy.name() == self.fallback.name())
        {
            Some(index) => candidates.swap_remove(index),
            None => Candidate {
                strategy: self.fallback.clone(),
                classification: self.fallback.detect(context).await,
            },
        };
        Self::selection(&fallback, SelectionReason::Fallback, context, warnings)
    }

    /// Check how well a named strategy fits the schema. Never fails.
    pub async fn validate_strategy(&self, name: &str, context: &DetectionAnalysisContext) -> StrategyValidation {
        let candidates = self.candidates(context).await;
        let Some(target) = candidates.iter().find(|c| c.strategy.name() == name) else {
            return StrategyValidation {
                valid: false,
                confidence: 0.0,
                issues: vec![format!("Unknown strategy '{}'", name)],
                recommendations: vec![format!("Use one of: {}", self.names().join(", "))],
            };
        };

        let confidence = target.classification.confidence;
        let valid = confidence >= limits::VALIDATION_MIN;
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();

        if !valid {
            issues.push(format!(
                "Confidence {:.2} is below the validation minimum {:.2}",
                confidence,
                limits::VALIDATION_MIN
            ));
        }
        issues.extend(target.classification.errors.iter().cloned());

        let better = candidates
            .iter()
            .filter(|c| c.strategy.name() != name && c.classification.confidence > confidence)
            .max_by(|a, b| a.classification.confidence.total_cmp(&b.classification.confidence));
        if let Some(better) = better {
            recommendations.push(format!(
                "Consider '{}' (confidence {:.2})",
                better.strategy.name(),
                better.classification.confidence
            ));
        }
        if !valid {
            recommendations.push("The strategy remains selectable through a manual override".to_string());
        }

        StrategyValidation {
            valid,
            confidence,
            issues,
            recommendations,
        }
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
