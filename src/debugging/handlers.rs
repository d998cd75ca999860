//! Constraint handlers.
//!
//! A handler repairs a synthetic row so it satisfies one constraint,
//! reporting every change as an [`AppliedFix`]. A handler that cannot
//! resolve the constraint asks for a bypass instead.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::error::HandlerError;
use super::types::{AppliedFix, DebugConstraint, Row};
use crate::introspect::ConstraintKind;

/// Fix applied when a personal account carries a slug.
pub const SLUG_CLEARED_FIX: &str = "slug cleared for personal account";

/// State shared by handlers across the rows of one session.
#[derive(Debug, Default)]
pub struct HandlerState {
    /// Values already used, per constraint.
    seen: BTreeMap<String, BTreeSet<String>>,
}

impl HandlerState {
    /// Record `value` for `constraint`; false when it was already taken.
    pub fn claim(&mut self, constraint: &str, value: &str) -> bool {
        self.seen
            .entry(constraint.to_string())
            .or_default()
            .insert(value.to_string())
    }
}

/// Result of a handler run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerOutcome {
    pub fixes: Vec<AppliedFix>,
    /// The constraint could not be resolved from the row alone.
    pub bypass: bool,
    pub notes: Vec<String>,
}

impl HandlerOutcome {
    fn fixed(mut self, field: &str, description: impl Into<String>) -> Self {
        self.fixes.push(AppliedFix::new(field, description));
        self
    }
}

/// Repairs rows for one family of constraints.
pub trait ConstraintHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn can_handle(&self, constraint: &DebugConstraint) -> bool;

    fn handle(
        &self,
        constraint: &DebugConstraint,
        row: &mut Row,
        state: &mut HandlerState,
    ) -> Result<HandlerOutcome, HandlerError>;
}

fn is_missing(row: &Row, field: &str) -> bool {
    row.get(field).map_or(true, Value::is_null)
}

fn value_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn required_columns(constraint: &DebugConstraint) -> Result<&[String], HandlerError> {
    if constraint.columns.is_empty() {
        Err(HandlerError::NoColumns(constraint.name.clone()))
    } else {
        Ok(&constraint.columns)
    }
}

/// Type-appropriate placeholder for a column, from its name.
pub fn placeholder_for(column: &str) -> Value {
    let column = column.to_lowercase();
    if column == "id" || column.ends_with("_id") {
        Value::String(uuid::Uuid::new_v4().to_string())
    } else if column.contains("email") {
        Value::String(format!("seed-{}@example.com", &uuid::Uuid::new_v4().simple().to_string()[..8]))
    } else if column.starts_with("is_") || column.starts_with("has_") {
        Value::Bool(false)
    } else if column.ends_with("_at") || column.ends_with("_date") {
        Value::String("1970-01-01T00:00:00Z".to_string())
    } else if ["count", "amount", "price", "quantity", "total"]
        .iter()
        .any(|n| column.contains(n))
    {
        Value::from(0)
    } else {
        Value::String(format!("placeholder_{}", column))
    }
}

/// Fills missing required fields.
#[derive(Debug, Default)]
pub struct NotNullHandler;

impl ConstraintHandler for NotNullHandler {
    fn name(&self) -> &'static str {
        "not_null"
    }

    fn can_handle(&self, constraint: &DebugConstraint) -> bool {
        constraint.kind == ConstraintKind::NotNull
    }

    fn handle(
        &self,
        constraint: &DebugConstraint,
        row: &mut Row,
        _state: &mut HandlerState,
    ) -> Result<HandlerOutcome, HandlerError> {
        let mut outcome = HandlerOutcome::default();
        for column in required_columns(constraint)? {
            if is_missing(row, column) {
                row.insert(column.clone(), placeholder_for(column));
                outcome = outcome.fixed(column, "filled missing required value");
            }
        }
        Ok(outcome)
    }
}

/// Assigns fresh identifiers to missing or duplicate primary keys.
#[derive(Debug, Default)]
pub struct PrimaryKeyHandler;

impl ConstraintHandler for PrimaryKeyHandler {
    fn name(&self) -> &'static str {
        "primary_key"
    }

    fn can_handle(&self, constraint: &DebugConstraint) -> bool {
        constraint.kind == ConstraintKind::PrimaryKey
    }

    fn handle(
        &self,
        constraint: &DebugConstraint,
        row: &mut Row,
        state: &mut HandlerState,
    ) -> Result<HandlerOutcome, HandlerError> {
        let mut outcome = HandlerOutcome::default();
        for column in required_columns(constraint)? {
            let duplicate = row
                .get(column)
                .filter(|v| !v.is_null())
                .map(|v| !state.claim(&constraint.name, &value_key(v)));
            let description = match duplicate {
                None => "generated missing primary key",
                Some(true) => "replaced duplicate primary key",
                Some(false) => continue,
            };
            let fresh = uuid::Uuid::new_v4().to_string();
            state.claim(&constraint.name, &fresh);
            row.insert(column.clone(), Value::String(fresh));
            outcome = outcome.fixed(column, description);
        }
        Ok(outcome)
    }
}

/// Suffixes values already used earlier in the session.
#[derive(Debug, Default)]
pub struct UniqueHandler;

impl ConstraintHandler for UniqueHandler {
    fn name(&self) -> &'static str {
        "unique"
    }

    fn can_handle(&self, constraint: &DebugConstraint) -> bool {
        constraint.kind == ConstraintKind::Unique
    }

    fn handle(
        &self,
        constraint: &DebugConstraint,
        row: &mut Row,
        state: &mut HandlerState,
    ) -> Result<HandlerOutcome, HandlerError> {
        let columns = required_columns(constraint)?;
        if columns.iter().any(|c| is_missing(row, c)) {
            return Ok(HandlerOutcome::default());
        }
        let key = |row: &Row| {
            columns
                .iter()
                .map(|c| row.get(c).map(value_key).unwrap_or_default())
                .collect::<Vec<_>>()
                .join("|")
        };
        if state.claim(&constraint.name, &key(row)) {
            return Ok(HandlerOutcome::default());
        }

        // The last column carries the suffix.
        let target = &columns[columns.len() - 1];
        let original = row.get(target).map(value_key).unwrap_or_default();
        for suffix in 2.. {
            row.insert(target.clone(), Value::String(format!("{}-{}", original, suffix)));
            if state.claim(&constraint.name, &key(row)) {
                break;
            }
        }
        Ok(HandlerOutcome::default().fixed(target, "suffixed duplicate value"))
    }
}

// Catalog definitions wrap operands in parentheses and casts, as in
// `((status)::text = ANY ((ARRAY['a'::character varying])::text[]))`
// and `(price > (0)::numeric)`. Hand-written `status IN (...)` also parses.

static IN_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\(?(\w+)\)?(?:::[\w ]+)?\s+IN\s*\(([^)]*)\)").unwrap()
});

static ANY_ARRAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\(?(\w+)\)?(?:::[\w ]+)?\s*=\s*ANY\s*\(+\s*ARRAY\s*\[([^\]]*)\]").unwrap()
});

static LENGTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:char_)?length\s*\(\s*\(?(\w+)\)?(?:::[\w ]+)?\s*\)\s*(>=|>|<=|<)\s*\(?'?(\d+)'?\)?",
    )
    .unwrap()
});

static COMPARISON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(?(\w+)\)?(?:::[\w ]+)?\s*(>=|>)\s*\(?'?(-?\d+(?:\.\d+)?)'?\)?").unwrap()
});

/// Items of an `IN`/`ARRAY` list with quotes and `::type` casts removed.
fn quoted_values(list: &str) -> Vec<String> {
    list.split(',')
        .map(|v| {
            let v = v.trim();
            let v = v.split("::").next().unwrap_or(v);
            v.trim_matches('\'').to_string()
        })
        .filter(|v| !v.is_empty())
        .collect()
}

/// Repairs rows for simple check expressions: `IN (...)`, `= ANY (ARRAY[...])`,
/// `>`/`>=` bounds and `length(...)` limits.
#[derive(Debug, Default)]
pub struct CheckHandler;

impl CheckHandler {
    fn enforce_allowed(column: &str, allowed: Vec<String>, row: &mut Row) -> Result<HandlerOutcome, HandlerError> {
        let current = row.get(column).filter(|v| !v.is_null()).map(value_key);
        match (current, allowed.first()) {
            (_, None) => Err(HandlerError::UnsupportedExpression(format!("empty value list for {}", column))),
            (Some(value), _) if allowed.contains(&value) => Ok(HandlerOutcome::default()),
            (_, Some(first)) => {
                row.insert(column.to_string(), Value::String(first.clone()));
                Ok(HandlerOutcome::default().fixed(column, format!("set to allowed value '{}'", first)))
            }
        }
    }

    fn enforce_length(column: &str, op: &str, limit: usize, row: &mut Row) -> Result<HandlerOutcome, HandlerError> {
        let current = match row.get(column) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(HandlerError::InvalidValue {
                    field: column.to_string(),
                    reason: format!("expected text, got {}", other),
                })
            }
        };
        let len = current.chars().count();
        let fixed = match op {
            ">=" if len < limit => Some(format!("{}{}", current, "x".repeat(limit - len))),
            ">" if len <= limit => Some(format!("{}{}", current, "x".repeat(limit + 1 - len))),
            "<=" if len > limit => Some(current.chars().take(limit).collect()),
            "<" if len >= limit => Some(current.chars().take(limit.saturating_sub(1)).collect()),
            _ => None,
        };
        Ok(match fixed {
            Some(value) => {
                row.insert(column.to_string(), Value::String(value));
                HandlerOutcome::default().fixed(column, format!("adjusted length to satisfy {} {}", op, limit))
            }
            None => HandlerOutcome::default(),
        })
    }

    fn enforce_bound(column: &str, op: &str, bound: f64, row: &mut Row) -> Result<HandlerOutcome, HandlerError> {
        let current = match row.get(column) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.as_f64().ok_or_else(|| HandlerError::InvalidValue {
                field: column.to_string(),
                reason: format!("expected a number, got {}", value),
            })?),
        };
        let satisfied = current.is_some_and(|v| if op == ">=" { v >= bound } else { v > bound });
        if satisfied {
            return Ok(HandlerOutcome::default());
        }
        let target = if op == ">=" { bound } else { bound + 1.0 };
        let value = if target.fract() == 0.0 {
            Value::from(target as i64)
        } else {
            Value::from(target)
        };
        row.insert(column.to_string(), value);
        Ok(HandlerOutcome::default().fixed(column, format!("raised value to satisfy {} {}", op, bound)))
    }
}

impl ConstraintHandler for CheckHandler {
    fn name(&self) -> &'static str {
        "check"
    }

    fn can_handle(&self, constraint: &DebugConstraint) -> bool {
        constraint.kind == ConstraintKind::Check
    }

    fn handle(
        &self,
        constraint: &DebugConstraint,
        row: &mut Row,
        _state: &mut HandlerState,
    ) -> Result<HandlerOutcome, HandlerError> {
        let expression = &constraint.definition;
        if let Some(c) = ANY_ARRAY.captures(expression).or_else(|| IN_LIST.captures(expression)) {
            return Self::enforce_allowed(&c[1], quoted_values(&c[2]), row);
        }
        if let Some(c) = LENGTH.captures(expression) {
            let limit = c[3]
                .parse()
                .map_err(|_| HandlerError::UnsupportedExpression(expression.clone()))?;
            return Self::enforce_length(&c[1], &c[2], limit, row);
        }
        if let Some(c) = COMPARISON.captures(expression) {
            let bound = c[3]
                .parse()
                .map_err(|_| HandlerError::UnsupportedExpression(expression.clone()))?;
            return Self::enforce_bound(&c[1], &c[2], bound, row);
        }
        Err(HandlerError::UnsupportedExpression(expression.clone()))
    }
}

/// Flags references that cannot be satisfied from the row alone.
#[derive(Debug, Default)]
pub struct ForeignKeyHandler;

impl ConstraintHandler for ForeignKeyHandler {
    fn name(&self) -> &'static str {
        "foreign_key"
    }

    fn can_handle(&self, constraint: &DebugConstraint) -> bool {
        constraint.kind == ConstraintKind::ForeignKey
    }

    fn handle(
        &self,
        constraint: &DebugConstraint,
        row: &mut Row,
        _state: &mut HandlerState,
    ) -> Result<HandlerOutcome, HandlerError> {
        let mut outcome = HandlerOutcome::default();
        let parent = constraint
            .references()
            .map(|(table, column)| format!("{}.{}", table, column))
            .unwrap_or_else(|| "the referenced table".to_string());
        for column in required_columns(constraint)? {
            if is_missing(row, column) {
                outcome.bypass = true;
                outcome.notes.push(format!(
                    "Seed {} before this table and set '{}' to an existing key",
                    parent, column
                ));
            }
        }
        Ok(outcome)
    }
}

/// MakerKit account rule: personal accounts have no slug, team accounts need one.
#[derive(Debug, Default)]
pub struct PersonalAccountSlugHandler;

fn slugify(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "team-account".to_string()
    } else {
        slug
    }
}

impl ConstraintHandler for PersonalAccountSlugHandler {
    fn name(&self) -> &'static str {
        "personal_account_slug"
    }

    fn can_handle(&self, constraint: &DebugConstraint) -> bool {
        constraint.kind == ConstraintKind::Check && is_personal_slug_rule(constraint)
    }

    fn handle(
        &self,
        _constraint: &DebugConstraint,
        row: &mut Row,
        _state: &mut HandlerState,
    ) -> Result<HandlerOutcome, HandlerError> {
        let personal = match row.get("is_personal_account") {
            Some(Value::Bool(b)) => *b,
            None | Some(Value::Null) => false,
            Some(other) => {
                return Err(HandlerError::InvalidValue {
                    field: "is_personal_account".to_string(),
                    reason: format!("expected a boolean, got {}", other),
                })
            }
        };

        if personal && !is_missing(row, "slug") {
            row.insert("slug".to_string(), Value::Null);
            return Ok(HandlerOutcome::default().fixed("slug", SLUG_CLEARED_FIX));
        }
        if !personal && is_missing(row, "slug") {
            let name = row.get("name").and_then(Value::as_str).unwrap_or_default();
            row.insert("slug".to_string(), Value::String(slugify(name)));
            return Ok(HandlerOutcome::default().fixed("slug", "slug generated for team account"));
        }
        Ok(HandlerOutcome::default())
    }
}

/// Whether a constraint encodes the personal-account slug rule.
pub fn is_personal_slug_rule(constraint: &DebugConstraint) -> bool {
    constraint.mentions("slug") && constraint.mentions("personal")
}

/// Built-in handlers, most specific first.
pub fn builtin_handlers() -> Vec<std::sync::Arc<dyn ConstraintHandler>> {
    vec![
        std::sync::Arc::new(PersonalAccountSlugHandler),
        std::sync::Arc::new(NotNullHandler),
        std::sync::Arc::new(PrimaryKeyHandler),
        std::sync::Arc::new(UniqueHandler),
        std::sync::Arc::new(CheckHandler),
        std::sync::Arc::new(ForeignKeyHandler),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => Row::new(),
        }
    }

    #[test]
    fn test_not_null_fills_placeholders() {
        let constraint = DebugConstraint::new("gear_nn", ConstraintKind::NotNull, &["name", "is_public"], "");
        let mut data = row(json!({ "name": null }));
        let outcome = NotNullHandler
            .handle(&constraint, &mut data, &mut HandlerState::default())
            .unwrap();
        assert_eq!(outcome.fixes.len(), 2);
        assert_eq!(data["name"], json!("placeholder_name"));
        assert_eq!(data["is_public"], json!(false));
    }

    #[test]
    fn test_unique_suffixes_duplicates() {
        let constraint = DebugConstraint::new("accounts_slug_key", ConstraintKind::Unique, &["slug"], "UNIQUE (slug)");
        let mut state = HandlerState::default();
        let mut first = row(json!({ "slug": "acme" }));
        let mut second = row(json!({ "slug": "acme" }));
        assert!(UniqueHandler.handle(&constraint, &mut first, &mut state).unwrap().fixes.is_empty());
        let outcome = UniqueHandler.handle(&constraint, &mut second, &mut state).unwrap();
        assert_eq!(outcome.fixes.len(), 1);
        assert_eq!(second["slug"], json!("acme-2"));
    }

    #[test]
    fn test_check_in_list() {
        let constraint = DebugConstraint::new(
            "trips_status_check",
            ConstraintKind::Check,
            &[],
            "CHECK (status IN ('planned', 'done'))",
        );
        let mut data = row(json!({ "status": "cancelled" }));
        CheckHandler
            .handle(&constraint, &mut data, &mut HandlerState::default())
            .unwrap();
        assert_eq!(data["status"], json!("planned"));

        let mut ok = row(json!({ "status": "done" }));
        let outcome = CheckHandler
            .handle(&constraint, &mut ok, &mut HandlerState::default())
            .unwrap();
        assert!(outcome.fixes.is_empty());
    }

    #[test]
    fn test_check_bounds_and_length() {
        let price = DebugConstraint::new("gear_price_check", ConstraintKind::Check, &[], "CHECK (price > 0)");
        let mut data = row(json!({ "price": -3 }));
        CheckHandler.handle(&price, &mut data, &mut HandlerState::default()).unwrap();
        assert_eq!(data["price"], json!(1));

        let name = DebugConstraint::new(
            "accounts_name_check",
            ConstraintKind::Check,
            &[],
            "CHECK (length(name) >= 3)",
        );
        let mut data = row(json!({ "name": "ab" }));
        CheckHandler.handle(&name, &mut data, &mut HandlerState::default()).unwrap();
        assert_eq!(data["name"], json!("abx"));
    }

    #[test]
    fn test_check_catalog_definitions() {
        let price = DebugConstraint::new(
            "gear_price_check",
            ConstraintKind::Check,
            &[],
            "CHECK ((price > (0)::numeric))",
        );
        let mut data = row(json!({ "price": -3 }));
        let outcome = CheckHandler.handle(&price, &mut data, &mut HandlerState::default()).unwrap();
        assert_eq!(outcome.fixes.len(), 1);
        assert_eq!(data["price"], json!(1));

        let floor = DebugConstraint::new("gear_stock_check", ConstraintKind::Check, &[], "CHECK ((stock >= 0))");
        let mut data = row(json!({ "stock": 4 }));
        let outcome = CheckHandler.handle(&floor, &mut data, &mut HandlerState::default()).unwrap();
        assert!(outcome.fixes.is_empty());

        let status = DebugConstraint::new(
            "trips_status_check",
            ConstraintKind::Check,
            &[],
            "CHECK (((status)::text = ANY ((ARRAY['active'::character varying, 'archived'::character varying])::text[])))",
        );
        let mut data = row(json!({ "status": "deleted" }));
        CheckHandler.handle(&status, &mut data, &mut HandlerState::default()).unwrap();
        assert_eq!(data["status"], json!("active"));
        let mut ok = row(json!({ "status": "archived" }));
        let outcome = CheckHandler.handle(&status, &mut ok, &mut HandlerState::default()).unwrap();
        assert!(outcome.fixes.is_empty());

        let plain = DebugConstraint::new(
            "posts_kind_check",
            ConstraintKind::Check,
            &[],
            "CHECK ((kind = ANY (ARRAY['note'::text, 'link'::text])))",
        );
        let mut data = row(json!({}));
        CheckHandler.handle(&plain, &mut data, &mut HandlerState::default()).unwrap();
        assert_eq!(data["kind"], json!("note"));

        let name = DebugConstraint::new(
            "accounts_name_check",
            ConstraintKind::Check,
            &[],
            "CHECK ((length((name)::text) > 2))",
        );
        let mut data = row(json!({ "name": "ab" }));
        CheckHandler.handle(&name, &mut data, &mut HandlerState::default()).unwrap();
        assert_eq!(data["name"], json!("abx"));
    }

    #[test]
    fn test_check_unsupported_expression() {
        let constraint = DebugConstraint::new("weird", ConstraintKind::Check, &[], "CHECK (is_valid(payload))");
        let result = CheckHandler.handle(&constraint, &mut Row::new(), &mut HandlerState::default());
        assert!(matches!(result, Err(HandlerError::UnsupportedExpression(_))));
    }

    #[test]
    fn test_foreign_key_requests_bypass() {
        let constraint = DebugConstraint::new(
            "posts_user_id_fkey",
            ConstraintKind::ForeignKey,
            &["user_id"],
            "FOREIGN KEY (user_id) REFERENCES profiles(id)",
        );
        let outcome = ForeignKeyHandler
            .handle(&constraint, &mut Row::new(), &mut HandlerState::default())
            .unwrap();
        assert!(outcome.bypass);
        assert!(outcome.notes[0].contains("profiles.id"));
    }

    #[test]
    fn test_personal_account_slug() {
        let constraint = DebugConstraint::new(
            "accounts_slug_null_if_personal_account_true",
            ConstraintKind::Check,
            &[],
            "CHECK (is_personal_account = true AND slug IS NULL OR is_personal_account = false AND slug IS NOT NULL)",
        );
        assert!(PersonalAccountSlugHandler.can_handle(&constraint));

        let mut personal = row(json!({ "is_personal_account": true, "slug": "me" }));
        let outcome = PersonalAccountSlugHandler
            .handle(&constraint, &mut personal, &mut HandlerState::default())
            .unwrap();
        assert_eq!(outcome.fixes[0].description, SLUG_CLEARED_FIX);
        assert!(personal["slug"].is_null());

        let mut team = row(json!({ "is_personal_account": false, "name": "Trail Crew!" }));
        PersonalAccountSlugHandler
            .handle(&constraint, &mut team, &mut HandlerState::default())
            .unwrap();
        assert_eq!(team["slug"], json!("trail-crew"));
    }
}
