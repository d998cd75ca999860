//! Constraint discovery and debugging.
//!
//! A [`DebuggingSession`] tests each constraint of one table against each
//! synthetic row. Handlers repair a copy of the row; the engine times them,
//! records issues and keeps running per-constraint metrics.
//!
//! ```text
//! start_debugging_session ─► Created ─► run_constraint_tests ─► Completed
//!                                                     │
//!                             generate_debugging_report (any number of times)
//!                                                     │
//!                                               end_session
//! ```

mod engine;
mod error;
mod handlers;
mod metrics;
mod report;
mod types;

pub use engine::{limits, DebuggingEngine};
pub use error::{DebugError, DebugResult, HandlerError};
pub use handlers::{
    builtin_handlers, placeholder_for, CheckHandler, ConstraintHandler, ForeignKeyHandler,
    HandlerOutcome, HandlerState, NotNullHandler, PersonalAccountSlugHandler, PrimaryKeyHandler,
    UniqueHandler, SLUG_CLEARED_FIX,
};
pub use metrics::{online_average, PerformanceMetrics};
pub use report::ReportFormat;
pub use types::{
    AppliedFix, ConstraintTestResult, DebugConstraint, DebuggingSession, Issue, IssueKind,
    IssueSeverity, Row, SessionState, SessionSummary,
};
