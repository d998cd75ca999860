use seedscope::debugging::{
    AppliedFix, ConstraintHandler, DebugConstraint, DebugError, DebuggingEngine, HandlerError,
    HandlerOutcome, HandlerState, IssueKind, ReportFormat, Row, SessionState,
};
use seedscope::introspect::{ConstraintInfo, ConstraintKind};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, OnceLock, Weak};

fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap()
}

fn posts_constraints() -> Vec<DebugConstraint> {
    vec![
        DebugConstraint::from_info(&ConstraintInfo::new(
            "posts",
            "posts_title_not_null",
            ConstraintKind::NotNull,
            "NOT NULL (title)",
        )),
        DebugConstraint::from_info(&ConstraintInfo::new(
            "posts",
            "posts_user_id_fkey",
            ConstraintKind::ForeignKey,
            "FOREIGN KEY (user_id) REFERENCES users(id)",
        )),
    ]
}

/// Resolves booking overlaps by shifting the slot.
struct NoOverlapHandler;

impl ConstraintHandler for NoOverlapHandler {
    fn name(&self) -> &'static str {
        "no_overlap"
    }

    fn can_handle(&self, constraint: &DebugConstraint) -> bool {
        constraint.kind == ConstraintKind::Exclusion
    }

    fn handle(
        &self,
        _constraint: &DebugConstraint,
        row: &mut Row,
        state: &mut HandlerState,
    ) -> Result<HandlerOutcome, HandlerError> {
        let slot = row.get("slot").and_then(Value::as_u64).ok_or(HandlerError::InvalidValue {
            field: "slot".to_string(),
            reason: "expected an integer".to_string(),
        })?;
        let mut outcome = HandlerOutcome::default();
        let mut candidate = slot;
        while !state.claim("bookings.slot", &candidate.to_string()) {
            candidate += 1;
        }
        if candidate != slot {
            row.insert("slot".to_string(), json!(candidate));
            outcome.fixes.push(AppliedFix::new("slot", "moved to a free slot"));
        }
        Ok(outcome)
    }
}

#[derive(Default)]
struct Observations {
    engine: OnceLock<Weak<DebuggingEngine>>,
    session_id: OnceLock<String>,
    seen: Mutex<Vec<SessionState>>,
    rerun_refused: Mutex<bool>,
}

/// Looks the session up from inside a handler.
struct ReentrantHandler(Arc<Observations>);

impl ConstraintHandler for ReentrantHandler {
    fn name(&self) -> &'static str {
        "reentrant"
    }

    fn can_handle(&self, constraint: &DebugConstraint) -> bool {
        constraint.kind == ConstraintKind::Exclusion
    }

    fn handle(
        &self,
        _constraint: &DebugConstraint,
        _row: &mut Row,
        _state: &mut HandlerState,
    ) -> Result<HandlerOutcome, HandlerError> {
        let observed = &self.0;
        let engine = observed.engine.get().and_then(Weak::upgrade);
        if let (Some(engine), Some(id)) = (engine, observed.session_id.get()) {
            if let Ok(session) = engine.session(id) {
                observed.seen.lock().unwrap().push(session.state);
            }
            if matches!(engine.run_constraint_tests(id), Err(DebugError::SessionRunning(_))) {
                *observed.rerun_refused.lock().unwrap() = true;
            }
        }
        Ok(HandlerOutcome::default())
    }
}

#[test]
fn test_every_constraint_meets_every_row() {
    let engine = DebuggingEngine::new();
    let mut constraints = posts_constraints();
    constraints.push(DebugConstraint::from_info(&ConstraintInfo::new(
        "posts",
        "posts_pkey",
        ConstraintKind::PrimaryKey,
        "PRIMARY KEY (id)",
    )));
    let rows = vec![
        row(json!({"id": "a", "title": "One", "user_id": "u1"})),
        row(json!({"id": "b", "title": null, "user_id": "u1"})),
        row(json!({"title": "Three", "user_id": "u2"})),
        row(json!({"id": "a", "title": "Four", "user_id": "u2"})),
    ];

    let id = engine.start_debugging_session("posts", constraints, rows);
    let session = engine.run_constraint_tests(&id).unwrap();

    assert_eq!(session.summary.total_tests, 3 * 4);
    assert_eq!(session.results.len(), 12);
    assert_eq!(session.state, SessionState::Completed);
    assert_eq!(session.summary.bypassed, 0);
    assert_eq!(session.summary.passed + session.summary.failed, 12);
    assert_eq!(session.metrics.len(), 3);
}

#[test]
fn test_missing_parents_trigger_high_bypass_recommendation() {
    let engine = DebuggingEngine::new();
    let rows = vec![
        row(json!({"title": "One", "user_id": "u1"})),
        row(json!({"title": "Two"})),
        row(json!({"title": "Three", "user_id": null})),
        row(json!({"title": "Four", "user_id": "u2"})),
    ];

    let id = engine.start_debugging_session("posts", posts_constraints(), rows);
    let session = engine.run_constraint_tests(&id).unwrap();

    assert_eq!(session.summary.total_tests, 8);
    assert_eq!(session.summary.bypassed, 2);
    assert!(session.summary.bypass_rate > 0.1);
    assert!(session
        .summary
        .recommendations
        .iter()
        .any(|r| r.contains("High bypass rate")));

    let fk_note = session
        .results
        .iter()
        .filter(|r| r.bypass_required)
        .flat_map(|r| r.recommendations.iter())
        .next()
        .unwrap();
    assert!(fk_note.contains("users.id"));
}

#[test]
fn test_complete_rows_have_no_bypass_recommendation() {
    let engine = DebuggingEngine::new();
    let rows = vec![
        row(json!({"title": "One", "user_id": "u1"})),
        row(json!({"title": "Two", "user_id": "u2"})),
    ];

    let id = engine.start_debugging_session("posts", posts_constraints(), rows);
    let session = engine.run_constraint_tests(&id).unwrap();

    assert_eq!(session.summary.success_rate, 1.0);
    assert_eq!(session.summary.bypass_rate, 0.0);
    assert!(session.summary.recommendations.is_empty());
}

#[test]
fn test_unhandled_kind_bypasses_until_a_handler_is_registered() {
    let exclusion = DebugConstraint::new(
        "bookings_no_overlap",
        ConstraintKind::Exclusion,
        &["slot"],
        "EXCLUDE USING gist (slot WITH =)",
    );
    let rows = vec![row(json!({"slot": 1})), row(json!({"slot": 1})), row(json!({"slot": 2}))];

    let builtin = DebuggingEngine::new();
    let id = builtin.start_debugging_session("bookings", vec![exclusion.clone()], rows.clone());
    let session = builtin.run_constraint_tests(&id).unwrap();
    assert_eq!(session.summary.bypassed, 3);
    assert!(session.results[0].handler_used.is_none());
    assert!(session.results[0]
        .issues
        .iter()
        .any(|i| i.kind == IssueKind::Bypass));

    let mut custom = DebuggingEngine::new();
    custom.register_handler(Arc::new(NoOverlapHandler));
    assert_eq!(custom.handler_names()[0], "no_overlap");
    let id = custom.start_debugging_session("bookings", vec![exclusion], rows);
    let session = custom.run_constraint_tests(&id).unwrap();
    assert_eq!(session.summary.bypassed, 0);
    assert_eq!(session.summary.passed, 3);
    assert_eq!(session.results[1].applied_fixes.len(), 1);
    assert_eq!(session.results[1].handler_used.as_deref(), Some("no_overlap"));
}

#[test]
fn test_session_lifecycle() {
    let engine = DebuggingEngine::new();
    let id = engine.start_debugging_session("posts", posts_constraints(), vec![row(json!({"title": "x"}))]);
    assert_eq!(engine.active_sessions(), vec![id.clone()]);
    assert_eq!(engine.session(&id).unwrap().state, SessionState::Created);

    engine.run_constraint_tests(&id).unwrap();
    assert!(matches!(
        engine.run_constraint_tests(&id),
        Err(DebugError::SessionCompleted(_))
    ));

    let report = engine.generate_debugging_report(&id, ReportFormat::Markdown).unwrap();
    assert!(report.starts_with("# Constraint Debugging Report: posts"));
    assert_eq!(
        engine.generate_debugging_report(&id, ReportFormat::Markdown).unwrap(),
        report
    );

    let ended = engine.end_session(&id).unwrap();
    assert_eq!(ended.session_id, id);
    assert!(engine.active_sessions().is_empty());
    assert!(matches!(engine.session(&id), Err(DebugError::SessionNotFound(_))));
    assert!(matches!(
        engine.generate_debugging_report(&id, ReportFormat::Json),
        Err(DebugError::SessionNotFound(_))
    ));
}

#[test]
fn test_json_report_parses() {
    let engine = DebuggingEngine::new();
    let id = engine.start_debugging_session("posts", posts_constraints(), vec![row(json!({"title": "x"}))]);
    engine.run_constraint_tests(&id).unwrap();

    let report = engine.generate_debugging_report(&id, ReportFormat::Json).unwrap();
    let parsed: Value = serde_json::from_str(&report).unwrap();
    assert_eq!(parsed["table_name"], "posts");
    assert_eq!(parsed["summary"]["total_tests"], 2);
    assert_eq!(parsed["state"], "completed");
}

#[test]
fn test_handlers_can_read_their_running_session() {
    let observed = Arc::new(Observations::default());
    let mut engine = DebuggingEngine::new();
    engine.register_handler(Arc::new(ReentrantHandler(Arc::clone(&observed))));
    let engine = Arc::new(engine);
    observed.engine.set(Arc::downgrade(&engine)).unwrap();

    let exclusion = DebugConstraint::new(
        "bookings_no_overlap",
        ConstraintKind::Exclusion,
        &["slot"],
        "EXCLUDE USING gist (slot WITH =)",
    );
    let id = engine.start_debugging_session("bookings", vec![exclusion], vec![row(json!({"slot": 1}))]);
    observed.session_id.set(id.clone()).unwrap();

    let session = engine.run_constraint_tests(&id).unwrap();
    assert_eq!(session.state, SessionState::Completed);
    assert_eq!(*observed.seen.lock().unwrap(), vec![SessionState::Running]);
    assert!(*observed.rerun_refused.lock().unwrap());
}
