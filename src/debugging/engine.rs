//! Debugging sessions: run constraint handlers against synthetic rows.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;

use super::error::{DebugError, DebugResult};
use super::handlers::{builtin_handlers, is_personal_slug_rule, ConstraintHandler, HandlerState, SLUG_CLEARED_FIX};
use super::metrics::PerformanceMetrics;
use super::report::{render, ReportFormat};
use super::types::{
    ConstraintTestResult, DebugConstraint, DebuggingSession, Issue, IssueKind, IssueSeverity, Row,
    SessionState, SessionSummary,
};

/// Fixed thresholds for issues and recommendations.
pub mod limits {
    /// More fixes than this on one row is a data quality smell.
    pub const MAX_FIXES: usize = 3;
    /// Average handler time above this is a performance smell.
    pub const SLOW_HANDLER_MS: f64 = 100.0;
    pub const MIN_SUCCESS_RATE: f64 = 0.8;
    pub const MAX_BYPASS_RATE: f64 = 0.1;
}

/// Registry of debugging sessions and constraint handlers.
pub struct DebuggingEngine {
    handlers: Vec<Arc<dyn ConstraintHandler>>,
    sessions: DashMap<String, DebuggingSession>,
}

impl Default for DebuggingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DebuggingEngine {
    /// Engine with the built-in handlers.
    pub fn new() -> Self {
        Self {
            handlers: builtin_handlers(),
            sessions: DashMap::new(),
        }
    }

    /// Register a handler; it takes precedence over those already registered.
    pub fn register_handler(&mut self, handler: Arc<dyn ConstraintHandler>) {
        self.handlers.insert(0, handler);
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    fn find_handler(&self, constraint: &DebugConstraint) -> Option<&Arc<dyn ConstraintHandler>> {
        self.handlers.iter().find(|h| h.can_handle(constraint))
    }

    /// Create a session and return its id.
    pub fn start_debugging_session(
        &self,
        table_name: &str,
        constraints: Vec<DebugConstraint>,
        test_data: Vec<Row>,
    ) -> String {
        let session_id = format!("session-{}", uuid::Uuid::new_v4());
        tracing::debug!(
            session_id = %session_id,
            table = table_name,
            constraints = constraints.len(),
            rows = test_data.len(),
            "debugging session started"
        );
        self.sessions.insert(
            session_id.clone(),
            DebuggingSession {
                session_id: session_id.clone(),
                table_name: table_name.to_string(),
                constraints,
                test_data,
                results: Vec::new(),
                summary: SessionSummary::default(),
                state: SessionState::Created,
                metrics: Default::default(),
            },
        );
        session_id
    }

    /// Test every constraint against every row and complete the session.
    ///
    /// Handlers run without holding the session entry, so the session reads
    /// as [`SessionState::Running`] from other callers meanwhile.
    ///
    /// # Errors
    ///
    /// [`DebugError::SessionNotFound`] for an unknown id (or one ended
    /// mid-run), [`DebugError::SessionCompleted`] when the session already
    /// ran, [`DebugError::SessionRunning`] while another run is in progress.
    pub fn run_constraint_tests(&self, session_id: &str) -> DebugResult<DebuggingSession> {
        let (constraints, rows) = {
            let mut session = self
                .sessions
                .get_mut(session_id)
                .ok_or_else(|| DebugError::SessionNotFound(session_id.to_string()))?;
            match session.state {
                SessionState::Completed => return Err(DebugError::SessionCompleted(session_id.to_string())),
                SessionState::Running => return Err(DebugError::SessionRunning(session_id.to_string())),
                SessionState::Created => {}
            }
            session.state = SessionState::Running;
            (session.constraints.clone(), session.test_data.clone())
        };

        let mut state = HandlerState::default();
        let mut metrics: BTreeMap<String, PerformanceMetrics> = BTreeMap::new();
        let mut results = Vec::with_capacity(constraints.len() * rows.len());
        for constraint in &constraints {
            for (row_index, row) in rows.iter().enumerate() {
                let constraint_metrics = metrics.entry(constraint.name.clone()).or_default();
                results.push(self.test_one(constraint, row_index, row, &mut state, constraint_metrics));
            }
        }

        let mut session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| DebugError::SessionNotFound(session_id.to_string()))?;
        session.summary = summarize(&results);
        session.results = results;
        session.metrics = metrics;
        session.state = SessionState::Completed;

        tracing::info!(
            session_id,
            table = %session.table_name,
            total = session.summary.total_tests,
            success_rate = session.summary.success_rate,
            bypass_rate = session.summary.bypass_rate,
            "constraint tests completed"
        );
        Ok(session.clone())
    }

    fn test_one(
        &self,
        constraint: &DebugConstraint,
        row_index: usize,
        row: &Row,
        state: &mut HandlerState,
        metrics: &mut PerformanceMetrics,
    ) -> ConstraintTestResult {
        let mut result = ConstraintTestResult {
            constraint_id: constraint.name.clone(),
            row_index,
            handler_used: None,
            execution_time_ms: 0.0,
            success: false,
            applied_fixes: Vec::new(),
            bypass_required: false,
            issues: Vec::new(),
            recommendations: Vec::new(),
        };

        let Some(handler) = self.find_handler(constraint) else {
            result.bypass_required = true;
            result.issues.push(Issue::new(
                IssueSeverity::High,
                IssueKind::Bypass,
                format!("No handler for {} constraint '{}'", constraint.kind, constraint.name),
                "Register a handler for this constraint",
            ));
            metrics.record(0.0, false, true);
            return result;
        };

        result.handler_used = Some(handler.name().to_string());
        let mut working = row.clone();
        let started = Instant::now();
        let outcome = handler.handle(constraint, &mut working, state);
        result.execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(outcome) => {
                result.applied_fixes = outcome.fixes;
                result.bypass_required = outcome.bypass;
                result.recommendations = outcome.notes;
                result.success = !outcome.bypass;
            }
            Err(error) => {
                tracing::debug!(constraint = %constraint.name, row_index, %error, "constraint handler failed");
                result.issues.push(Issue::new(
                    IssueSeverity::Critical,
                    IssueKind::HandlerFailure,
                    format!("Handler '{}' failed: {}", handler.name(), error),
                    "Fix the handler or the test row",
                ));
            }
        }

        metrics.record(result.execution_time_ms, result.success, result.bypass_required);
        classify_issues(constraint, &working, metrics, &mut result);
        result
    }

    /// Render a session report without re-running tests.
    pub fn generate_debugging_report(&self, session_id: &str, format: ReportFormat) -> DebugResult<String> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| DebugError::SessionNotFound(session_id.to_string()))?;
        render(&session, format)
    }

    /// Current state of a session.
    pub fn session(&self, session_id: &str) -> DebugResult<DebuggingSession> {
        self.sessions
            .get(session_id)
            .map(|s| s.clone())
            .ok_or_else(|| DebugError::SessionNotFound(session_id.to_string()))
    }

    /// Remove a session, returning its final state.
    pub fn end_session(&self, session_id: &str) -> DebugResult<DebuggingSession> {
        self.sessions
            .remove(session_id)
            .map(|(_, session)| session)
            .ok_or_else(|| DebugError::SessionNotFound(session_id.to_string()))
    }

    /// Ids of sessions not yet ended, sorted.
    pub fn active_sessions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|s| s.key().clone()).collect();
        ids.sort();
        ids
    }
}

fn classify_issues(
    constraint: &DebugConstraint,
    handled: &Row,
    metrics: &PerformanceMetrics,
    result: &mut ConstraintTestResult,
) {
    if result.bypass_required {
        result.issues.push(Issue::new(
            IssueSeverity::High,
            IssueKind::Bypass,
            format!("Constraint '{}' required a bypass", constraint.name),
            "Implement a more specific handler",
        ));
    }
    if result.applied_fixes.len() > limits::MAX_FIXES {
        result.issues.push(Issue::new(
            IssueSeverity::Medium,
            IssueKind::DataQuality,
            format!("{} fixes applied to one row", result.applied_fixes.len()),
            "Improve the test data generator for this table",
        ));
    }
    if metrics.average_execution_time_ms > limits::SLOW_HANDLER_MS {
        result.issues.push(Issue::new(
            IssueSeverity::Medium,
            IssueKind::Performance,
            format!(
                "Average handler time {:.1} ms exceeds {} ms",
                metrics.average_execution_time_ms,
                limits::SLOW_HANDLER_MS
            ),
            "Optimize the handler",
        ));
    }

    if is_personal_slug_rule(constraint) && result.handler_used.is_some() {
        let personal = handled.get("is_personal_account") == Some(&serde_json::Value::Bool(true));
        let has_slug = handled.get("slug").is_some_and(|v| !v.is_null());
        let cleared = result
            .applied_fixes
            .iter()
            .any(|f| f.description == SLUG_CLEARED_FIX);
        if personal && has_slug && !cleared {
            result.issues.push(
                Issue::new(
                    IssueSeverity::High,
                    IssueKind::BusinessLogic,
                    "Personal account still has a slug after handling",
                    "Personal accounts must have a null slug",
                )
                .on_field("slug"),
            );
        }
    }
}

fn summarize(results: &[ConstraintTestResult]) -> SessionSummary {
    let total = results.len();
    let passed = results.iter().filter(|r| r.success).count();
    let bypassed = results.iter().filter(|r| r.bypass_required).count();
    let rate = |n: usize| if total == 0 { 0.0 } else { n as f64 / total as f64 };
    let average = if total == 0 {
        0.0
    } else {
        results.iter().map(|r| r.execution_time_ms).sum::<f64>() / total as f64
    };

    let mut summary = SessionSummary {
        total_tests: total,
        passed,
        failed: total - passed,
        bypassed,
        success_rate: rate(passed),
        bypass_rate: rate(bypassed),
        average_execution_time_ms: average,
        ..SessionSummary::default()
    };
    for issue in results.iter().flat_map(|r| &r.issues) {
        *summary.issues_by_severity.entry(issue.severity).or_default() += 1;
    }

    if total > 0 && summary.success_rate < limits::MIN_SUCCESS_RATE {
        summary.recommendations.push(format!(
            "Review constraint handlers: success rate {:.0}% is below {:.0}%",
            summary.success_rate * 100.0,
            limits::MIN_SUCCESS_RATE * 100.0
        ));
    }
    if summary.average_execution_time_ms > limits::SLOW_HANDLER_MS {
        summary.recommendations.push(format!(
            "Optimize handlers: average time {:.1} ms exceeds {} ms",
            summary.average_execution_time_ms,
            limits::SLOW_HANDLER_MS
        ));
    }
    if summary.bypass_rate > limits::MAX_BYPASS_RATE {
        summary.recommendations.push(format!(
            "High bypass rate ({:.0}%): implement more specific handlers",
            summary.bypass_rate * 100.0
        ));
    }
    summary
}
