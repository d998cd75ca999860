//! Declarative pattern library.
//!
//! Rules are plain data: name matchers, a confidence weight, and per-class
//! strengths. The traversal and scoring live in [`analyzer`](super::analyzer);
//! adding a framework or domain means adding rules here, not code there.
//!
//! The library is built once on first use and never mutated.
//! [`PATTERN_LIBRARY_VERSION`] changes whenever a rule changes, which
//! invalidates cached detection results.

mod architecture;
mod domain;
mod framework;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use regex::Regex;

use super::inflection::{pluralize, same_noun, singularize};
use super::types::ClassLabel;
use crate::introspect::{
    ColumnProbe, ConstraintInfo, ConstraintKind, DetectionAnalysisContext, ProbePlan,
    RelationshipInfo,
};

pub use architecture::{architecture_rules, USER_TABLES};
pub use domain::domain_rules;
pub use framework::{
    expected_features, framework_features, ACCOUNT_FIELD_FEATURES, FRAMEWORK_FUNCTIONS_FEATURE,
    PERSONAL_SLUG_CHECK_FEATURE,
};

/// Bumped whenever a rule, weight or matcher changes.
pub const PATTERN_LIBRARY_VERSION: &str = "2024.4";

/// Matches a table, column or function name.
#[derive(Debug, Clone)]
pub enum NamePattern {
    /// Same noun, singular or plural (`profile` matches `profiles`).
    Exact(&'static str),
    /// Any of the listed nouns, singular or plural.
    OneOf(&'static [&'static str]),
    Prefix(&'static str),
    Suffix(&'static str),
    Contains(&'static str),
    Regex(Regex),
}

pub fn exact(name: &'static str) -> NamePattern {
    NamePattern::Exact(name)
}

pub fn one_of(names: &'static [&'static str]) -> NamePattern {
    NamePattern::OneOf(names)
}

impl NamePattern {
    /// Compile a regex pattern.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Regex(Regex::new(pattern)?))
    }

    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        match self {
            Self::Exact(noun) => same_noun(noun, &name),
            Self::OneOf(nouns) => nouns.iter().any(|noun| same_noun(noun, &name)),
            Self::Prefix(prefix) => name.starts_with(prefix),
            Self::Suffix(suffix) => name.ends_with(suffix),
            Self::Contains(needle) => name.contains(needle),
            Self::Regex(re) => re.is_match(&name),
        }
    }

    /// Concrete names worth probing, or `None` for open-ended patterns.
    pub fn literals(&self) -> Option<BTreeSet<String>> {
        let nouns: &[&str] = match self {
            Self::Exact(noun) => std::slice::from_ref(noun),
            Self::OneOf(nouns) => nouns,
            _ => return None,
        };
        let mut names = BTreeSet::new();
        for noun in nouns {
            names.insert(noun.to_string());
            names.insert(pluralize(noun));
            names.insert(singularize(noun));
        }
        Some(names)
    }

    /// Literal names without number variants (for columns).
    fn exact_literals(&self) -> Option<BTreeSet<String>> {
        match self {
            Self::Exact(noun) => Some(BTreeSet::from([noun.to_string()])),
            Self::OneOf(nouns) => Some(nouns.iter().map(|n| n.to_string()).collect()),
            _ => None,
        }
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(noun) => write!(f, "{}", noun),
            Self::OneOf(nouns) => write!(f, "{}", nouns.join("|")),
            Self::Prefix(prefix) => write!(f, "{}*", prefix),
            Self::Suffix(suffix) => write!(f, "*{}", suffix),
            Self::Contains(needle) => write!(f, "*{}*", needle),
            Self::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

/// Column on a (optionally restricted) table.
#[derive(Debug, Clone)]
pub struct ColumnMatcher {
    pub table: Option<NamePattern>,
    pub column: NamePattern,
}

impl ColumnMatcher {
    /// First matching `table.column` in the context.
    pub fn find(&self, context: &DetectionAnalysisContext) -> Option<String> {
        context.columns().iter().find_map(|(table, columns)| {
            let table_ok = self
                .table
                .as_ref()
                .map(|pattern| pattern.matches(table))
                .unwrap_or(true);
            if !table_ok {
                return None;
            }
            columns
                .iter()
                .find(|column| self.column.matches(column))
                .map(|column| format!("{}.{}", table, column))
        })
    }
}

/// Constraint of a kind, on a table, with a definition fragment.
#[derive(Debug, Clone, Default)]
pub struct ConstraintMatcher {
    pub kind: Option<ConstraintKind>,
    pub table: Option<NamePattern>,
    pub definition: Option<NamePattern>,
}

impl ConstraintMatcher {
    pub fn of_kind(kind: ConstraintKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Any kind of constraint.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn on(mut self, table: NamePattern) -> Self {
        self.table = Some(table);
        self
    }

    pub fn defined_as(mut self, definition: NamePattern) -> Self {
        self.definition = Some(definition);
        self
    }

    pub fn matches(&self, constraint: &ConstraintInfo) -> bool {
        self.kind.map(|k| k == constraint.kind).unwrap_or(true)
            && self
                .table
                .as_ref()
                .map(|p| p.matches(&constraint.table))
                .unwrap_or(true)
            && self
                .definition
                .as_ref()
                .map(|p| p.matches(&constraint.definition))
                .unwrap_or(true)
    }
}

/// Foreign-key style link between two kinds of table.
#[derive(Debug, Clone)]
pub struct RelationshipMatcher {
    pub from: NamePattern,
    pub to: NamePattern,
    pub column: Option<NamePattern>,
}

impl RelationshipMatcher {
    pub fn matches(&self, relationship: &RelationshipInfo) -> bool {
        self.from.matches(&relationship.from_table)
            && self.to.matches(&relationship.to_table)
            && self
                .column
                .as_ref()
                .map(|p| p.matches(&relationship.from_column))
                .unwrap_or(true)
    }
}

/// Per-category weights used to turn match ratios into a confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringProfile {
    pub tables: f64,
    pub columns: f64,
    pub constraints: f64,
    pub relationships: f64,
    pub functions: f64,
    /// Added when every category with matchers has at least one hit.
    pub presence_bonus: f64,
}

impl Default for ScoringProfile {
    fn default() -> Self {
        Self {
            tables: 0.5,
            columns: 0.2,
            constraints: 0.1,
            relationships: 0.2,
            functions: 0.1,
            presence_bonus: 0.1,
        }
    }
}

impl ScoringProfile {
    /// Override the table and relationship weights.
    pub fn structural(tables: f64, relationships: f64) -> Self {
        Self {
            tables,
            relationships,
            ..Self::default()
        }
    }
}

/// A declarative structural signature.
#[derive(Debug, Clone)]
pub struct PatternRule<L: ClassLabel> {
    pub id: &'static str,
    pub name: &'static str,
    /// Strength of the indication for each label.
    pub class_strengths: BTreeMap<L, f64>,
    pub confidence_weight: f64,
    pub table_matchers: Vec<NamePattern>,
    pub column_matchers: Vec<ColumnMatcher>,
    pub constraint_matchers: Vec<ConstraintMatcher>,
    pub relationship_matchers: Vec<RelationshipMatcher>,
    pub function_matchers: Vec<NamePattern>,
    /// The rule never matches when any of these tables is present.
    pub excluded_tables: Vec<NamePattern>,
    pub minimum_matches: usize,
    /// A matched exclusive rule suppresses lower-priority rules that
    /// indicate none of its classes.
    pub exclusive: bool,
    pub priority: i32,
    pub scoring: ScoringProfile,
}

impl<L: ClassLabel> PatternRule<L> {
    pub fn new(id: &'static str, name: &'static str, confidence_weight: f64) -> Self {
        Self {
            id,
            name,
            class_strengths: BTreeMap::new(),
            confidence_weight,
            table_matchers: Vec::new(),
            column_matchers: Vec::new(),
            constraint_matchers: Vec::new(),
            relationship_matchers: Vec::new(),
            function_matchers: Vec::new(),
            excluded_tables: Vec::new(),
            minimum_matches: 1,
            exclusive: false,
            priority: 0,
            scoring: ScoringProfile::default(),
        }
    }

    pub fn indicates(mut self, label: L, strength: f64) -> Self {
        self.class_strengths.insert(label, strength);
        self
    }

    pub fn table(mut self, pattern: NamePattern) -> Self {
        self.table_matchers.push(pattern);
        self
    }

    pub fn column(mut self, table: Option<NamePattern>, column: NamePattern) -> Self {
        self.column_matchers.push(ColumnMatcher { table, column });
        self
    }

    pub fn constraint(mut self, matcher: ConstraintMatcher) -> Self {
        self.constraint_matchers.push(matcher);
        self
    }

    pub fn relationship(mut self, from: NamePattern, to: NamePattern) -> Self {
        self.relationship_matchers.push(RelationshipMatcher {
            from,
            to,
            column: None,
        });
        self
    }

    pub fn function(mut self, pattern: NamePattern) -> Self {
        self.function_matchers.push(pattern);
        self
    }

    pub fn excluding(mut self, pattern: NamePattern) -> Self {
        self.excluded_tables.push(pattern);
        self
    }

    pub fn min_matches(mut self, n: usize) -> Self {
        self.minimum_matches = n;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    pub fn scoring(mut self, scoring: ScoringProfile) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn indicated_classes(&self) -> impl Iterator<Item = L> + '_ {
        self.class_strengths.keys().copied()
    }

    pub fn total_matchers(&self) -> usize {
        self.table_matchers.len()
            + self.column_matchers.len()
            + self.constraint_matchers.len()
            + self.relationship_matchers.len()
            + self.function_matchers.len()
    }

    /// Add every concrete name this rule references to the probe plan.
    fn extend_plan(&self, plan: &mut ProbePlan) {
        let table_patterns = self
            .table_matchers
            .iter()
            .chain(&self.excluded_tables)
            .chain(self.column_matchers.iter().filter_map(|m| m.table.as_ref()))
            .chain(
                self.relationship_matchers
                    .iter()
                    .flat_map(|m| [&m.from, &m.to]),
            );
        for pattern in table_patterns {
            if let Some(names) = pattern.literals() {
                plan.tables.extend(names);
            }
        }

        for matcher in &self.column_matchers {
            let Some(columns) = matcher.column.exact_literals() else {
                continue;
            };
            let tables = matcher.table.as_ref().and_then(NamePattern::literals);
            plan.columns.push(ColumnProbe { tables, columns });
        }
    }
}

/// Probe plan covering every rule in the library.
pub fn probe_plan() -> ProbePlan {
    let mut plan = ProbePlan::default();
    for rule in architecture_rules() {
        rule.extend_plan(&mut plan);
    }
    for rule in domain_rules() {
        rule.extend_plan(&mut plan);
    }
    for rule in framework_features() {
        rule.extend_plan(&mut plan);
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Architecture;

    #[test]
    fn test_name_pattern_matching() {
        assert!(exact("profile").matches("profiles"));
        assert!(exact("profiles").matches("Profile"));
        assert!(one_of(&["teams", "organizations"]).matches("organization"));
        assert!(NamePattern::Prefix("team_").matches("team_members"));
        assert!(NamePattern::Suffix("_id").matches("owner_id"));
        assert!(NamePattern::Contains("gear").matches("trip_gear_items"));
        assert!(NamePattern::regex(r"^(org|team)_\w+$").unwrap().matches("org_settings"));
        assert!(!exact("posts").matches("comments"));
    }

    #[test]
    fn test_invalid_regex_is_an_error() {
        assert!(NamePattern::regex("(unclosed").is_err());
    }

    #[test]
    fn test_literals_cover_number_variants() {
        let names = exact("membership").literals().unwrap();
        assert!(names.contains("membership"));
        assert!(names.contains("memberships"));
        assert!(NamePattern::Prefix("team_").literals().is_none());
    }

    #[test]
    fn test_constraint_matcher() {
        let slug_check = ConstraintInfo::new(
            "accounts",
            "accounts_slug_null_if_personal_account_true",
            ConstraintKind::Check,
            "CHECK ((((is_personal_account = true) AND (slug IS NULL)) OR ((is_personal_account = false) AND (slug IS NOT NULL))))",
        );
        let matcher = ConstraintMatcher::of_kind(ConstraintKind::Check)
            .on(exact("accounts"))
            .defined_as(NamePattern::Contains("is_personal_account"));
        assert!(matcher.matches(&slug_check));

        let mut elsewhere = slug_check.clone();
        elsewhere.table = "profiles".to_string();
        assert!(!matcher.matches(&elsewhere));

        let mut unique = slug_check.clone();
        unique.kind = ConstraintKind::Unique;
        assert!(!matcher.matches(&unique));
        assert!(ConstraintMatcher::any().matches(&unique));
    }

    #[test]
    fn test_rule_builder() {
        let rule: PatternRule<Architecture> = PatternRule::new("r", "Rule", 0.8)
            .indicates(Architecture::Team, 1.0)
            .table(exact("teams"))
            .column(None, exact("team_id"))
            .min_matches(2)
            .priority(5)
            .exclusive();

        assert_eq!(rule.total_matchers(), 2);
        assert_eq!(rule.indicated_classes().collect::<Vec<_>>(), vec![Architecture::Team]);
        assert!(rule.exclusive);
        assert_eq!(rule.priority, 5);
    }

    #[test]
    fn test_probe_plan_covers_library() {
        let plan = probe_plan();
        for table in ["accounts", "accounts_memberships", "profiles", "posts", "products"] {
            assert!(plan.tables.contains(table), "missing {}", table);
        }
        assert!(plan
            .columns
            .iter()
            .any(|probe| probe.columns.contains("is_personal_account")));
    }

    #[test]
    fn test_library_weights_are_valid() {
        let weights = architecture_rules()
            .iter()
            .map(|r| (r.id, r.confidence_weight, r.class_strengths.values().copied().collect::<Vec<_>>()))
            .chain(domain_rules().iter().map(|r| {
                (r.id, r.confidence_weight, r.class_strengths.values().copied().collect())
            }))
            .chain(framework_features().iter().map(|r| {
                (r.id, r.confidence_weight, r.class_strengths.values().copied().collect())
            }));

        let mut ids = BTreeSet::new();
        for (id, weight, strengths) in weights {
            assert!(ids.insert(id), "duplicate rule id {}", id);
            assert!((0.0..=1.0).contains(&weight), "{} weight", id);
            assert!(!strengths.is_empty(), "{} indicates nothing", id);
            assert!(strengths.iter().all(|s| (0.0..=1.0).contains(s)), "{} strength", id);
        }
    }
}
