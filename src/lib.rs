//! # seedscope
//!
//! Schema pattern classification and seeding strategy selection for
//! application databases.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        SchemaIntrospector (live database or snapshot)    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [introspect: bounded concurrent probes]
//! ┌─────────────────────────────────────────────────────────┐
//! │               DetectionAnalysisContext                   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [detection: analyzers + aggregator, cached]
//! ┌─────────────────────────────────────────────────────────┐
//! │   DetectionSummary (architecture, domain, framework)     │
//! └─────────────────────────────────────────────────────────┘
//!             │                              │
//!             ▼ [strategy]                   ▼ [configure]
//! ┌───────────────────────┐    ┌──────────────────────────────┐
//! │   StrategySelection   │───►│   AutoConfigurationResult    │
//! └───────────────────────┘    └──────────────────────────────┘
//!
//!  debugging: constraint handlers tested against candidate rows
//! ```

pub mod cache;
pub mod config;
pub mod configure;
pub mod debugging;
pub mod detection;
pub mod introspect;
pub mod strategy;
pub mod telemetry;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::configure::{
        AutoConfigOptions, AutoConfigurationResult, AutoConfigurator, GenerationMode,
        SeedConfiguration,
    };
    pub use crate::debugging::{DebugConstraint, DebuggingEngine, ReportFormat};
    pub use crate::detection::{
        Architecture, ClassificationResult, DetectionSummary, Detector, Domain, FrameworkVersion,
    };
    pub use crate::introspect::{DetectionAnalysisContext, SchemaSnapshot, SnapshotIntrospector};
    pub use crate::strategy::{FrameworkProfile, StrategyRegistry, StrategySelection};
    pub use crate::telemetry::{Reporter, Verbosity};
}
