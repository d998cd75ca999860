//! Schema introspection.
//!
//! A [`SchemaIntrospector`] answers point queries about a database schema.
//! [`DetectionAnalysisContext::build`] turns those answers into an immutable
//! context under bounded concurrency and timeouts; everything downstream
//! works on that context only.

mod context;
mod error;
mod provider;
mod snapshot;
mod types;

pub use context::{
    ColumnProbe, ContextBuilder, ContextHints, DetectionAnalysisContext, EvidenceGap,
    ProbeOptions, ProbePlan, SchemaFingerprint,
};
pub use error::{IntrospectionError, IntrospectionResult};
pub use provider::{SchemaIntrospector, SchemaIntrospectorExt};
pub use snapshot::{SchemaSnapshot, SnapshotIntrospector};
pub use types::{
    ConstraintInfo, ConstraintKind, FunctionInfo, RelationshipInfo, RelationshipKind,
};
