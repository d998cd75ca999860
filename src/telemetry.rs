//! Tracing initialization and the injected reporter.
//!
//! Log routing is configured once per process through [`init_tracing`].
//! How much the detection pipeline says is *not* global: a [`Reporter`]
//! carries the verbosity and travels inside the detection context, so two
//! detections in the same process can run at different verbosity levels.

use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Initialize the tracing subscriber.
///
/// Reads the `SEEDSCOPE_LOG` environment variable for per-module filters
/// (e.g. `SEEDSCOPE_LOG=seedscope::introspect=debug`). Falls back to
/// `seedscope=info` when unset or invalid.
///
/// Idempotent; later calls are no-ops.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("SEEDSCOPE_LOG")
            .unwrap_or_else(|_| EnvFilter::new("seedscope=info"));

        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(filter)
            .init();
    });
}

/// How much detail the pipeline reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// Warnings are suppressed too.
    Quiet,
    /// Outcomes and warnings.
    #[default]
    Normal,
    /// Per-phase progress.
    Verbose,
    /// Every evidence gap and probe result.
    Debug,
}

impl std::fmt::Display for Verbosity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quiet => write!(f, "quiet"),
            Self::Normal => write!(f, "normal"),
            Self::Verbose => write!(f, "verbose"),
            Self::Debug => write!(f, "debug"),
        }
    }
}

/// Verbosity-gated front end over `tracing`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reporter {
    verbosity: Verbosity,
}

impl Reporter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// A reporter that only lets `tracing` filters decide (used in tests).
    pub fn quiet() -> Self {
        Self::new(Verbosity::Quiet)
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Whether messages at `level` are emitted.
    pub fn enabled(&self, level: Verbosity) -> bool {
        self.verbosity >= level
    }

    pub fn info(&self, message: &str) {
        if self.enabled(Verbosity::Normal) {
            tracing::info!("{}", message);
        }
    }

    pub fn detail(&self, message: &str) {
        if self.enabled(Verbosity::Verbose) {
            tracing::info!("{}", message);
        }
    }

    pub fn debug(&self, message: &str) {
        if self.enabled(Verbosity::Debug) {
            tracing::debug!("{}", message);
        }
    }

    pub fn warn(&self, message: &str) {
        if self.enabled(Verbosity::Normal) {
            tracing::warn!("{}", message);
        }
    }
}
