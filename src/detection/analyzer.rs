//! Pattern analyzers.
//!
//! Pure evaluation of [`PatternRule`]s against an immutable
//! [`DetectionAnalysisContext`]. Rules are independent, so they are
//! evaluated in parallel; the collected results keep rule order.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;

use super::patterns::PatternRule;
use super::types::{ClassLabel, Evidence};
use crate::introspect::DetectionAnalysisContext;

/// Names that satisfied a rule's matchers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchDetails {
    pub tables: Vec<String>,
    pub columns: Vec<String>,
    pub constraints: Vec<String>,
    pub relationships: Vec<String>,
    pub functions: Vec<String>,
    /// Excluded tables that were present.
    pub excluded: Vec<String>,
}

impl MatchDetails {
    pub fn hit_count(&self) -> usize {
        self.tables.len()
            + self.columns.len()
            + self.constraints.len()
            + self.relationships.len()
            + self.functions.len()
    }
}

/// Outcome of evaluating one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternAnalysisResult<L: ClassLabel> {
    pub rule_id: &'static str,
    pub rule_name: &'static str,
    pub matched: bool,
    pub match_confidence: f64,
    pub confidence_weight: f64,
    pub priority: i32,
    pub exclusive: bool,
    pub match_details: MatchDetails,
    pub class_indication: BTreeMap<L, f64>,
}

impl<L: ClassLabel> PatternAnalysisResult<L> {
    /// Does this result indicate any of the given labels?
    fn shares_class_with(&self, other: &Self) -> bool {
        self.class_indication
            .keys()
            .any(|label| other.class_indication.contains_key(label))
    }

    pub fn to_evidence(&self) -> Evidence<L> {
        Evidence {
            kind: self.rule_id.to_string(),
            description: self.rule_name.to_string(),
            confidence: self.match_confidence,
            weight: self.confidence_weight,
            supporting_data: serde_json::to_value(&self.match_details)
                .unwrap_or(serde_json::Value::Null),
            per_class_strength: self.class_indication.clone(),
        }
    }
}

struct CategoryScore {
    matchers: usize,
    hits: usize,
    weight: f64,
}

/// Evaluate a single rule.
pub fn evaluate_rule<L: ClassLabel>(
    rule: &PatternRule<L>,
    context: &DetectionAnalysisContext,
) -> PatternAnalysisResult<L> {
    let mut details = MatchDetails::default();

    for pattern in &rule.table_matchers {
        if let Some(table) = context.tables().iter().find(|t| pattern.matches(t)) {
            details.tables.push(table.clone());
        }
    }
    for matcher in &rule.column_matchers {
        if let Some(column) = matcher.find(context) {
            details.columns.push(column);
        }
    }
    for matcher in &rule.constraint_matchers {
        if let Some(constraint) = context.constraints().iter().find(|c| matcher.matches(c)) {
            details.constraints.push(constraint.name.clone());
        }
    }
    for matcher in &rule.relationship_matchers {
        if let Some(rel) = context.relationships().iter().find(|r| matcher.matches(r)) {
            details.relationships.push(rel.to_string());
        }
    }
    for pattern in &rule.function_matchers {
        if let Some(function) = context.functions().iter().find(|f| pattern.matches(&f.name)) {
            details.functions.push(function.name.clone());
        }
    }
    for pattern in &rule.excluded_tables {
        if let Some(table) = context.tables().iter().find(|t| pattern.matches(t)) {
            details.excluded.push(table.clone());
        }
    }

    let scoring = &rule.scoring;
    let categories = [
        CategoryScore {
            matchers: rule.table_matchers.len(),
            hits: details.tables.len(),
            weight: scoring.tables,
        },
        CategoryScore {
            matchers: rule.column_matchers.len(),
            hits: details.columns.len(),
            weight: scoring.columns,
        },
        CategoryScore {
            matchers: rule.constraint_matchers.len(),
            hits: details.constraints.len(),
            weight: scoring.constraints,
        },
        CategoryScore {
            matchers: rule.relationship_matchers.len(),
            hits: details.relationships.len(),
            weight: scoring.relationships,
        },
        CategoryScore {
            matchers: rule.function_matchers.len(),
            hits: details.functions.len(),
            weight: scoring.functions,
        },
    ];

    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    let mut every_category_hit = true;
    for category in categories.iter().filter(|c| c.matchers > 0) {
        weighted += (category.hits as f64 / category.matchers as f64) * category.weight;
        total_weight += category.weight;
        every_category_hit &= category.hits > 0;
    }

    let hits = details.hit_count();
    let matched = hits > 0 && hits >= rule.minimum_matches && details.excluded.is_empty();

    let match_confidence = if matched && total_weight > 0.0 {
        let bonus = if every_category_hit {
            scoring.presence_bonus
        } else {
            0.0
        };
        (weighted / total_weight + bonus).clamp(0.0, 1.0)
    } else {
        0.0
    };

    PatternAnalysisResult {
        rule_id: rule.id,
        rule_name: rule.name,
        matched,
        match_confidence,
        confidence_weight: rule.confidence_weight,
        priority: rule.priority,
        exclusive: rule.exclusive,
        match_details: details,
        class_indication: rule.class_strengths.clone(),
    }
}

/// Evaluate every rule, in rule order, matched or not.
pub fn evaluate_all<L: ClassLabel>(
    rules: &[PatternRule<L>],
    context: &DetectionAnalysisContext,
) -> Vec<PatternAnalysisResult<L>> {
    rules
        .par_iter()
        .map(|rule| evaluate_rule(rule, context))
        .collect()
}

/// Matched results, priority-descending (stable), after exclusivity.
pub fn analyze<L: ClassLabel>(
    rules: &[PatternRule<L>],
    context: &DetectionAnalysisContext,
) -> Vec<PatternAnalysisResult<L>> {
    let reporter = context.reporter();
    let mut matched: Vec<_> = evaluate_all(rules, context)
        .into_iter()
        .filter(|result| {
            if !result.match_details.excluded.is_empty() {
                reporter.debug(&format!(
                    "Rule {} excluded by {}",
                    result.rule_id,
                    result.match_details.excluded.join(", ")
                ));
            }
            result.matched
        })
        .collect();
    matched.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut kept: Vec<PatternAnalysisResult<L>> = Vec::with_capacity(matched.len());
    for result in matched {
        let suppressor = kept.iter().find(|winner| {
            winner.exclusive && winner.priority > result.priority && !winner.shares_class_with(&result)
        });
        if let Some(winner) = suppressor {
            reporter.debug(&format!(
                "Rule {} suppressed by exclusive rule {}",
                result.rule_id, winner.rule_id
            ));
            continue;
        }
        reporter.debug(&format!(
            "Rule {} matched ({} hits, confidence {:.2})",
            result.rule_id,
            result.match_details.hit_count(),
            result.match_confidence
        ));
        kept.push(result);
    }
    kept
}
