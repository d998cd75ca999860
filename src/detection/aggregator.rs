//! Evidence aggregation.
//!
//! Combines matched [`PatternAnalysisResult`]s into a single
//! [`ClassificationResult`]:
//!
//! 1. For each label, collect results that indicate it, weighting each by
//!    `confidence_weight × class strength`
//! 2. Score = weighted average, capped by a diminishing-return bound
//!    `min(1, Σ(confidence × weight) × factor)` so a single weak pattern
//!    cannot claim full confidence
//! 3. Rank labels (ties broken by declaration order)
//! 4. Prefer the ambiguity fallback label when the top two are balanced
//!
//! Every step appends to the reasoning trace, which is part of the output.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::analyzer::PatternAnalysisResult;
use super::error::{check_unit, DetectionResult};
use super::thresholds;
use super::types::{Alternative, ClassLabel, ClassificationResult, ConfidenceLevel};

/// Tunable aggregation constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationWeights {
    /// Multiplier in the diminishing-return cap.
    pub diminishing_factor: f64,
    /// Both top labels must reach this score for the ambiguity fallback.
    pub ambiguity_min_score: f64,
    /// Minimum balance (`1 - |a - b|`) for the ambiguity fallback.
    pub ambiguity_min_balance: f64,
}

impl Default for AggregationWeights {
    fn default() -> Self {
        Self {
            diminishing_factor: thresholds::aggregation::DIMINISHING_FACTOR,
            ambiguity_min_score: thresholds::aggregation::AMBIGUITY_MIN_SCORE,
            ambiguity_min_balance: thresholds::aggregation::AMBIGUITY_MIN_BALANCE,
        }
    }
}

/// Score of one label.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassScore<L: ClassLabel> {
    pub label: L,
    pub score: f64,
    pub weighted_average: f64,
    pub cap: f64,
    /// Number of results that indicated this label.
    pub contributors: usize,
}

/// Weight-normalized average of `(confidence, weight)` pairs.
///
/// Returns 0 when the total weight is 0.
pub fn weighted_confidence(items: &[(f64, f64)]) -> f64 {
    let total_weight: f64 = items.iter().map(|(_, w)| w).sum();
    if total_weight > 0.0 {
        let weighted: f64 = items.iter().map(|(c, w)| c * w).sum();
        (weighted / total_weight).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Diminishing-return cap: `min(1, Σ(confidence × weight) × factor)`.
pub fn diminishing_cap(items: &[(f64, f64)], factor: f64) -> f64 {
    let weighted: f64 = items.iter().map(|(c, w)| c * w).sum();
    (weighted * factor).clamp(0.0, 1.0)
}

/// How evenly two scores are matched: 1 when equal, 0 when 1 apart.
pub fn balance(a: f64, b: f64) -> f64 {
    (1.0 - (a - b).abs()).clamp(0.0, 1.0)
}

/// Folds analyzer output into classification results.
#[derive(Debug, Clone, Default)]
pub struct EvidenceAggregator {
    weights: AggregationWeights,
}

impl EvidenceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: AggregationWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &AggregationWeights {
        &self.weights
    }

    /// Per-label scores, best first.
    ///
    /// # Errors
    /// [`DetectionError::InvalidEvidence`](super::DetectionError::InvalidEvidence)
    /// when a confidence, weight, strength or the diminishing factor is not a
    /// finite value in [0, 1].
    pub fn score_classes<L: ClassLabel>(
        &self,
        results: &[PatternAnalysisResult<L>],
        trace: &mut Vec<String>,
    ) -> DetectionResult<Vec<ClassScore<L>>> {
        check_unit("aggregation", "diminishing factor", self.weights.diminishing_factor)?;
        let mut per_class: Vec<(L, Vec<(f64, f64)>)> =
            L::ALL.iter().map(|label| (*label, Vec::new())).collect();

        for result in results {
            let confidence = check_unit(result.rule_id, "match confidence", result.match_confidence)?;
            let weight = check_unit(result.rule_id, "confidence weight", result.confidence_weight)?;
            let mut indicated = Vec::new();
            for (label, strength) in &result.class_indication {
                let strength = check_unit(result.rule_id, "class strength", *strength)?;
                if strength <= 0.0 {
                    continue;
                }
                if let Some((_, items)) = per_class.iter_mut().find(|(l, _)| l == label) {
                    items.push((confidence, weight * strength));
                }
                indicated.push(format!("{} {:.2}", label, strength));
            }
            trace.push(format!(
                "Pattern '{}' matched with confidence {:.2} (weight {:.2}) indicating {}",
                result.rule_id,
                confidence,
                weight,
                indicated.join(", ")
            ));
        }

        let mut scores: Vec<ClassScore<L>> = per_class
            .into_iter()
            .map(|(label, items)| {
                let weighted_average = weighted_confidence(&items);
                let cap = diminishing_cap(&items, self.weights.diminishing_factor);
                ClassScore {
                    label,
                    score: weighted_average.min(cap),
                    weighted_average,
                    cap,
                    contributors: items.len(),
                }
            })
            .collect();

        for score in scores.iter().filter(|s| s.contributors > 0) {
            trace.push(format!(
                "{}: weighted average {:.3}, cap {:.3}, score {:.3} from {} pattern(s)",
                score.label, score.weighted_average, score.cap, score.score, score.contributors
            ));
        }

        scores.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.label.cmp(&b.label))
        });
        Ok(scores)
    }

    /// Build a classification from matched analyzer results.
    ///
    /// The result is a pure function of `results`; execution time is left at
    /// 0 for the caller to stamp.
    pub fn classify<L: ClassLabel>(
        &self,
        results: &[PatternAnalysisResult<L>],
        tables_analyzed: usize,
    ) -> DetectionResult<ClassificationResult<L>> {
        let mut trace = vec![format!(
            "Evaluated {} matched pattern(s) across {} table(s)",
            results.len(),
            tables_analyzed
        )];
        let scores = self.score_classes(results, &mut trace)?;

        let mut result = ClassificationResult::neutral("pattern_analysis", tables_analyzed);
        result.evidence = results.iter().map(PatternAnalysisResult::to_evidence).collect();

        let top = scores.first().filter(|s| s.score > 0.0);
        let Some(top) = top else {
            trace.push(format!(
                "No patterns matched; defaulting to {} with confidence 0",
                L::neutral()
            ));
            result.reasoning_trace = trace;
            result.metrics.evidence_count = result.evidence.len();
            return Ok(result);
        };

        let mut primary = top.label;
        let mut confidence = top.score;

        if let (Some(fallback), Some(runner_up)) = (L::ambiguity_fallback(), scores.get(1)) {
            let balanced = balance(top.score, runner_up.score);
            let both_strong = top.score >= self.weights.ambiguity_min_score
                && runner_up.score >= self.weights.ambiguity_min_score;
            let involves_fallback = top.label == fallback || runner_up.label == fallback;
            if both_strong && !involves_fallback && balanced >= self.weights.ambiguity_min_balance {
                primary = fallback;
                confidence = ((top.score + runner_up.score) / 2.0).clamp(0.0, 1.0);
                trace.push(format!(
                    "Balance between {} ({:.2}) and {} ({:.2}) is {:.2}; preferring {}",
                    top.label, top.score, runner_up.label, runner_up.score, balanced, fallback
                ));
            }
        }

        let level = ConfidenceLevel::from_score(confidence);
        trace.push(format!(
            "Selected {} with confidence {:.2} ({})",
            primary, confidence, level
        ));

        result.alternatives = scores
            .iter()
            .filter(|s| s.label != primary && s.score > 0.0)
            .map(|s| Alternative {
                label: s.label,
                confidence: s.score,
                reasoning: format!(
                    "{} supporting pattern(s), weighted average {:.2}",
                    s.contributors, s.weighted_average
                ),
            })
            .collect();
        result.primary_label = primary;
        result.confidence = confidence;
        result.confidence_level = level;
        result.reasoning_trace = trace;
        result.metrics.evidence_count = result.evidence.len();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::analyzer::MatchDetails;
    use crate::detection::{Architecture, DetectionError, Domain};
    use std::collections::BTreeMap;

    fn result<L: ClassLabel>(
        id: &'static str,
        confidence: f64,
        weight: f64,
        classes: &[(L, f64)],
    ) -> PatternAnalysisResult<L> {
        PatternAnalysisResult {
            rule_id: id,
            rule_name: id,
            matched: true,
            match_confidence: confidence,
            confidence_weight: weight,
            priority: 0,
            exclusive: false,
            match_details: MatchDetails::default(),
            class_indication: classes.iter().copied().collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_weighted_confidence() {
        assert_eq!(weighted_confidence(&[]), 0.0);
        assert_eq!(weighted_confidence(&[(0.9, 0.0)]), 0.0);
        let value = weighted_confidence(&[(1.0, 0.5), (0.5, 0.5)]);
        assert!((value - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_diminishing_cap_limits_single_weak_pattern() {
        let items = [(1.0, 0.2)];
        assert!((diminishing_cap(&items, 0.8) - 0.16).abs() < 1e-9);
        assert_eq!(diminishing_cap(&[(1.0, 1.0), (1.0, 1.0)], 0.8), 1.0);
    }

    #[test]
    fn test_balance() {
        assert_eq!(balance(0.5, 0.5), 1.0);
        assert!((balance(0.9, 0.2) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_empty_evidence_yields_neutral_label() {
        let classification = EvidenceAggregator::new()
            .classify::<Domain>(&[], 0)
            .unwrap();
        assert_eq!(classification.primary_label, Domain::Generic);
        assert_eq!(classification.confidence, 0.0);
        assert!(classification.alternatives.is_empty());
        assert!(classification
            .reasoning_trace
            .last()
            .unwrap()
            .contains("No patterns matched"));
    }

    #[test]
    fn test_highest_class_wins() {
        let results = vec![
            result("a", 1.0, 0.9, &[(Domain::Ecommerce, 1.0)]),
            result("b", 0.6, 0.5, &[(Domain::Social, 1.0)]),
        ];
        let classification = EvidenceAggregator::new().classify(&results, 5).unwrap();

        assert_eq!(classification.primary_label, Domain::Ecommerce);
        // weighted average 1.0, cap 0.72
        assert!((classification.confidence - 0.72).abs() < 1e-9);
        assert_eq!(classification.confidence_level, ConfidenceLevel::High);
        assert_eq!(classification.alternatives[0].label, Domain::Social);
        assert_eq!(classification.evidence.len(), 2);
        assert_eq!(classification.metrics.evidence_count, 2);
    }

    #[test]
    fn test_ties_break_by_declaration_order() {
        let results = vec![
            result("social", 1.0, 1.0, &[(Domain::Social, 1.0)]),
            result("saas", 1.0, 1.0, &[(Domain::Saas, 1.0)]),
        ];
        let classification = EvidenceAggregator::new().classify(&results, 2).unwrap();
        assert_eq!(classification.primary_label, Domain::Saas);
    }

    #[test]
    fn test_balanced_architecture_prefers_hybrid() {
        let results = vec![
            result("team", 0.8, 0.8, &[(Architecture::Team, 1.0)]),
            result("individual", 0.75, 0.8, &[(Architecture::Individual, 1.0)]),
        ];
        let classification = EvidenceAggregator::new().classify(&results, 4).unwrap();

        assert_eq!(classification.primary_label, Architecture::Hybrid);
        // team 0.512 (capped), individual 0.48 (capped)
        assert!((classification.confidence - 0.496).abs() < 1e-9);
        assert!(classification
            .reasoning_trace
            .iter()
            .any(|line| line.contains("preferring hybrid")));
    }

    #[test]
    fn test_unbalanced_architecture_keeps_winner() {
        let results = vec![
            result("team", 1.0, 1.0, &[(Architecture::Team, 1.0)]),
            result("individual", 0.2, 0.5, &[(Architecture::Individual, 1.0)]),
        ];
        let classification = EvidenceAggregator::new().classify(&results, 4).unwrap();
        assert_eq!(classification.primary_label, Architecture::Team);
    }

    #[test]
    fn test_invalid_evidence_is_rejected() {
        let results = vec![result("broken", f64::NAN, 1.0, &[(Domain::Saas, 1.0)])];
        let err = EvidenceAggregator::new().classify(&results, 1).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidEvidence { .. }));
    }

    #[test]
    fn test_confidence_stays_in_bounds() {
        let confidences = [0.0, 0.1, 0.5, 0.99, 1.0];
        let weights = [0.0, 0.3, 1.0];
        for c in confidences {
            for w in weights {
                let results = vec![
                    result("x", c, w, &[(Domain::Outdoor, 1.0)]),
                    result("y", 1.0 - c, 1.0 - w, &[(Domain::Outdoor, 0.5), (Domain::Social, 0.5)]),
                ];
                let classification = EvidenceAggregator::new().classify(&results, 1).unwrap();
                assert!((0.0..=1.0).contains(&classification.confidence));
                for alt in &classification.alternatives {
                    assert!((0.0..=1.0).contains(&alt.confidence));
                }
            }
        }
    }

    #[test]
    fn test_trace_is_reproducible() {
        let results = vec![
            result("a", 0.9, 0.9, &[(Domain::Outdoor, 1.0)]),
            result("b", 0.4, 0.6, &[(Domain::Generic, 1.0)]),
        ];
        let aggregator = EvidenceAggregator::new();
        let first = aggregator.classify(&results, 3).unwrap();
        let second = aggregator.classify(&results, 3).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
