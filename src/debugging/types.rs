//! Debugging session model.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::metrics::PerformanceMetrics;
use crate::introspect::{ConstraintInfo, ConstraintKind};

/// A synthetic test row.
pub type Row = serde_json::Map<String, serde_json::Value>;

static COLUMN_LIST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^()]*)\)").unwrap());

static REFERENCES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)references\s+([\w.\x22]+)\s*\(([^()]*)\)").unwrap());

/// A constraint under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugConstraint {
    pub name: String,
    pub kind: ConstraintKind,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub definition: String,
}

impl DebugConstraint {
    pub fn new(name: &str, kind: ConstraintKind, columns: &[&str], definition: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            definition: definition.to_string(),
        }
    }

    /// Build from an introspected constraint.
    ///
    /// Columns reported by the catalog win. Otherwise the constrained
    /// column list is read from the definition (`UNIQUE (email)`,
    /// `FOREIGN KEY (user_id) REFERENCES ...`), ignoring the referenced
    /// columns. Check constraints keep an empty column list; their handler
    /// reads the expression.
    pub fn from_info(info: &ConstraintInfo) -> Self {
        let columns = if !info.columns.is_empty() {
            info.columns.clone()
        } else if info.kind == ConstraintKind::Check {
            Vec::new()
        } else {
            let own = REFERENCES.replace_all(&info.definition, "");
            COLUMN_LIST
                .captures(&own)
                .map(|c| {
                    c[1].split(',')
                        .filter_map(|col| col.split_whitespace().next())
                        .map(|col| col.trim_matches('"').to_string())
                        .filter(|col| !col.is_empty())
                        .collect()
                })
                .unwrap_or_default()
        };
        Self {
            name: info.name.clone(),
            kind: info.kind,
            columns,
            definition: info.definition.clone(),
        }
    }

    /// Referenced `(table, column)` of a foreign key definition.
    pub fn references(&self) -> Option<(String, String)> {
        REFERENCES.captures(&self.definition).map(|c| {
            let columns: Vec<&str> = c[2].split(',').map(|col| col.trim().trim_matches('"')).collect();
            (c[1].trim_matches('"').to_string(), columns.join(", "))
        })
    }

    pub fn mentions(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.definition.to_lowercase().contains(needle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    HandlerFailure,
    Bypass,
    DataQuality,
    Performance,
    BusinessLogic,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HandlerFailure => "handler_failure",
            Self::Bypass => "bypass",
            Self::DataQuality => "data_quality",
            Self::Performance => "performance",
            Self::BusinessLogic => "business_logic",
        };
        f.write_str(name)
    }
}

/// A problem found while testing one constraint against one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: IssueSeverity,
    pub kind: IssueKind,
    pub message: String,
    pub suggested_fix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_field: Option<String>,
}

impl Issue {
    pub fn new(
        severity: IssueSeverity,
        kind: IssueKind,
        message: impl Into<String>,
        suggested_fix: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            suggested_fix: suggested_fix.into(),
            affected_field: None,
        }
    }

    pub fn on_field(mut self, field: impl Into<String>) -> Self {
        self.affected_field = Some(field.into());
        self
    }
}

/// A change a handler made to a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedFix {
    pub field: String,
    pub description: String,
}

impl AppliedFix {
    pub fn new(field: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            description: description.into(),
        }
    }
}

/// Outcome of one (constraint, row) test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintTestResult {
    pub constraint_id: String,
    pub row_index: usize,
    /// Absent when no handler accepted the constraint.
    pub handler_used: Option<String>,
    pub execution_time_ms: f64,
    /// Handler ran and left the constraint satisfied.
    pub success: bool,
    pub applied_fixes: Vec<AppliedFix>,
    pub bypass_required: bool,
    pub issues: Vec<Issue>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Created,
    Running,
    Completed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Session-level totals and recommendations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub bypassed: usize,
    pub success_rate: f64,
    pub bypass_rate: f64,
    pub average_execution_time_ms: f64,
    pub issues_by_severity: BTreeMap<IssueSeverity, usize>,
    pub recommendations: Vec<String>,
}

/// One table's constraints tested against synthetic rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebuggingSession {
    pub session_id: String,
    pub table_name: String,
    pub constraints: Vec<DebugConstraint>,
    pub test_data: Vec<Row>,
    pub results: Vec<ConstraintTestResult>,
    pub summary: SessionSummary,
    pub state: SessionState,
    /// Keyed by constraint name.
    pub metrics: BTreeMap<String, PerformanceMetrics>,
}
