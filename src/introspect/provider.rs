//! SchemaIntrospector trait definition.
//!
//! The introspector is the only way the detection pipeline learns about a
//! database. It answers point queries; everything else (pattern analysis,
//! aggregation, strategy selection) works on the immutable
//! [`DetectionAnalysisContext`] built from those answers.

use async_trait::async_trait;

use super::context::{DetectionAnalysisContext, ProbeOptions, ProbePlan};
use super::error::IntrospectionResult;
use super::types::{ConstraintInfo, FunctionInfo, RelationshipInfo};
use crate::telemetry::Reporter;

/// Minimal capability interface over a database client.
///
/// Implementations must distinguish "the table is absent" (`Ok(false)`) from
/// "I could not ask" (`Err`). Authentication and connectivity failures
/// should be reported through [`IntrospectionError::authentication`] and
/// [`IntrospectionError::connectivity`] so they abort introspection instead of
/// silently degrading into an empty schema.
///
/// [`IntrospectionError::authentication`]: super::IntrospectionError::authentication
/// [`IntrospectionError::connectivity`]: super::IntrospectionError::connectivity
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// Does the table exist?
    async fn table_exists(&self, table: &str) -> IntrospectionResult<bool>;

    /// Does the column exist on the table?
    async fn column_exists(&self, table: &str, column: &str) -> IntrospectionResult<bool>;

    /// List constraints declared on a table.
    async fn list_constraints(&self, table: &str) -> IntrospectionResult<Vec<ConstraintInfo>>;

    /// List all foreign-key relationships.
    async fn list_relationships(&self) -> IntrospectionResult<Vec<RelationshipInfo>>;

    /// List all database functions.
    async fn list_functions(&self) -> IntrospectionResult<Vec<FunctionInfo>>;
}

/// Convenience methods for any [`SchemaIntrospector`].
#[async_trait]
pub trait SchemaIntrospectorExt: SchemaIntrospector {
    /// Probe everything the pattern library knows how to use.
    ///
    /// This is the usual entry point: it derives the probe plan from the
    /// pattern library and builds a detection context under the given
    /// concurrency and timeout bounds.
    async fn introspect(
        &self,
        options: &ProbeOptions,
        reporter: Reporter,
    ) -> IntrospectionResult<DetectionAnalysisContext>
    where
        Self: Sized,
    {
        let plan = ProbePlan::from_pattern_library();
        DetectionAnalysisContext::build(self, &plan, options, reporter).await
    }
}

impl<T: SchemaIntrospector> SchemaIntrospectorExt for T {}
