//! Detection analysis context and the bounded probing pass that builds it.
//!
//! ```text
//! ProbePlan ──► phase 1: table_exists ─┐
//!                                      ├─► phase 2: column_exists / list_constraints
//!               list_relationships ────┤      (only for tables found in phase 1)
//!               list_functions ────────┘
//!                                      ▼
//!                        DetectionAnalysisContext (immutable)
//! ```
//!
//! Every probe runs under `query_timeout`, at most `max_concurrent_queries`
//! at a time, and the whole pass under `max_execution_time`. A probe that
//! fails or times out is recorded as an [`EvidenceGap`] and treated as
//! "absent"; only authentication/connectivity failures abort the pass.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use super::error::{IntrospectionError, IntrospectionResult};
use super::provider::SchemaIntrospector;
use super::types::{ConstraintInfo, FunctionInfo, RelationshipInfo};
use crate::telemetry::Reporter;

/// Concurrency and timeout bounds for a probing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Maximum number of in-flight probes.
    pub max_concurrent_queries: usize,
    /// Timeout for a single probe.
    pub query_timeout: Duration,
    /// Timeout for the whole pass.
    pub max_execution_time: Duration,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            max_concurrent_queries: 8,
            query_timeout: Duration::from_secs(5),
            max_execution_time: Duration::from_secs(30),
        }
    }
}

/// Columns to probe, optionally restricted to a set of tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnProbe {
    /// Candidate tables; `None` means every table found in phase 1.
    pub tables: Option<BTreeSet<String>>,
    pub columns: BTreeSet<String>,
}

/// What to ask the introspector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbePlan {
    pub tables: BTreeSet<String>,
    pub columns: Vec<ColumnProbe>,
}

impl ProbePlan {
    /// Every concrete table/column name referenced by the pattern library.
    pub fn from_pattern_library() -> Self {
        crate::detection::patterns::probe_plan()
    }
}

/// A probe that could not be answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceGap {
    /// Human-readable probe description (e.g. `column accounts.slug`).
    pub probe: String,
    /// Why it failed.
    pub reason: String,
}

/// Caller-supplied hints about the schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextHints {
    /// Framework the caller believes produced the schema (e.g. `makerkit`).
    pub framework: Option<String>,
    /// Free-form business logic hint (e.g. `outdoor gear sharing`).
    pub business_logic: Option<String>,
}

/// Immutable snapshot of schema facts for one detection run.
#[derive(Debug, Clone, Default)]
pub struct DetectionAnalysisContext {
    tables: BTreeSet<String>,
    columns: BTreeMap<String, BTreeSet<String>>,
    constraints: Vec<ConstraintInfo>,
    relationships: Vec<RelationshipInfo>,
    functions: Vec<FunctionInfo>,
    hints: ContextHints,
    gaps: Vec<EvidenceGap>,
    partial: bool,
    reporter: Reporter,
}

/// Facts that identify a schema, used for hashing.
#[derive(Debug, Serialize)]
pub struct SchemaFingerprint<'a> {
    pub tables: &'a BTreeSet<String>,
    pub columns: &'a BTreeMap<String, BTreeSet<String>>,
    pub constraints: &'a [ConstraintInfo],
    pub relationships: &'a [RelationshipInfo],
    pub functions: &'a [FunctionInfo],
}

impl DetectionAnalysisContext {
    /// Start building a context by hand (tests, snapshots already in memory).
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Probe the introspector according to `plan`.
    ///
    /// # Errors
    /// Returns an error only for fatal (authentication/connectivity)
    /// failures. Other probe failures and timeouts degrade to absent facts
    /// and are recorded in [`gaps`](Self::gaps).
    pub async fn build(
        introspector: &dyn SchemaIntrospector,
        plan: &ProbePlan,
        options: &ProbeOptions,
        reporter: Reporter,
    ) -> IntrospectionResult<Self> {
        let deadline = tokio::time::Instant::now() + options.max_execution_time;
        let mut pass = ProbePass {
            introspector,
            options: *options,
            deadline,
            builder: ContextBuilder::default().reporter(reporter),
        };

        let mut first_phase: Vec<Probe> =
            plan.tables.iter().cloned().map(Probe::Table).collect();
        first_phase.push(Probe::Relationships);
        first_phase.push(Probe::Functions);
        pass.run_phase(first_phase).await?;

        let present: Vec<String> = pass.builder.tables.iter().cloned().collect();
        let mut second_phase: Vec<Probe> = present
            .iter()
            .cloned()
            .map(Probe::Constraints)
            .collect();
        let mut column_probes = BTreeSet::new();
        for probe in &plan.columns {
            for table in &present {
                let in_scope = probe
                    .tables
                    .as_ref()
                    .map(|tables| tables.contains(table))
                    .unwrap_or(true);
                if !in_scope {
                    continue;
                }
                for column in &probe.columns {
                    column_probes.insert((table.clone(), column.clone()));
                }
            }
        }
        second_phase.extend(
            column_probes
                .into_iter()
                .filter(|(table, column)| !pass.builder.has_column(table, column))
                .map(|(table, column)| Probe::Column(table, column)),
        );
        pass.run_phase(second_phase).await?;

        let context = pass.builder.build();
        reporter.detail(&format!(
            "Introspection found {} tables, {} relationships, {} functions ({} gaps)",
            context.tables.len(),
            context.relationships.len(),
            context.functions.len(),
            context.gaps.len()
        ));
        Ok(context)
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains(&table.to_lowercase())
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.columns
            .get(&table.to_lowercase())
            .map(|columns| columns.contains(&column.to_lowercase()))
            .unwrap_or(false)
    }

    pub fn tables(&self) -> &BTreeSet<String> {
        &self.tables
    }

    /// Known columns of a table (empty when none were probed or found).
    pub fn columns_of(&self, table: &str) -> impl Iterator<Item = &str> {
        self.columns
            .get(&table.to_lowercase())
            .into_iter()
            .flat_map(|columns| columns.iter().map(String::as_str))
    }

    pub fn columns(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.columns
    }

    pub fn constraints(&self) -> &[ConstraintInfo] {
        &self.constraints
    }

    pub fn relationships(&self) -> &[RelationshipInfo] {
        &self.relationships
    }

    pub fn functions(&self) -> &[FunctionInfo] {
        &self.functions
    }

    pub fn hints(&self) -> &ContextHints {
        &self.hints
    }

    pub fn gaps(&self) -> &[EvidenceGap] {
        &self.gaps
    }

    /// True when the overall execution budget ran out mid-pass.
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub fn reporter(&self) -> Reporter {
        self.reporter
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.relationships.is_empty() && self.functions.is_empty()
    }

    /// The facts that identify this schema.
    pub fn fingerprint(&self) -> SchemaFingerprint<'_> {
        SchemaFingerprint {
            tables: &self.tables,
            columns: &self.columns,
            constraints: &self.constraints,
            relationships: &self.relationships,
            functions: &self.functions,
        }
    }

    /// Copy of this context with different hints.
    pub fn with_hints(&self, hints: ContextHints) -> Self {
        Self {
            hints,
            ..self.clone()
        }
    }
}

/// Incremental construction of a [`DetectionAnalysisContext`].
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    tables: BTreeSet<String>,
    columns: BTreeMap<String, BTreeSet<String>>,
    constraints: BTreeSet<ConstraintInfo>,
    relationships: BTreeSet<RelationshipInfo>,
    functions: BTreeSet<FunctionInfo>,
    hints: ContextHints,
    gaps: Vec<EvidenceGap>,
    partial: bool,
    reporter: Reporter,
}

impl ContextBuilder {
    pub fn table(mut self, table: &str) -> Self {
        self.add_table(table);
        self
    }

    pub fn tables(mut self, tables: &[&str]) -> Self {
        for table in tables {
            self.add_table(table);
        }
        self
    }

    /// Add a column (and its table).
    pub fn column(mut self, table: &str, column: &str) -> Self {
        self.add_column(table, column);
        self
    }

    pub fn constraint(mut self, constraint: ConstraintInfo) -> Self {
        self.constraints.insert(constraint);
        self
    }

    /// Add a relationship (and both endpoint tables/columns).
    pub fn relationship(mut self, relationship: RelationshipInfo) -> Self {
        self.add_relationship(relationship);
        self
    }

    pub fn function(mut self, function: FunctionInfo) -> Self {
        self.functions.insert(function);
        self
    }

    pub fn hints(mut self, hints: ContextHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn build(self) -> DetectionAnalysisContext {
        DetectionAnalysisContext {
            tables: self.tables,
            columns: self.columns,
            constraints: self.constraints.into_iter().collect(),
            relationships: self.relationships.into_iter().collect(),
            functions: self.functions.into_iter().collect(),
            hints: self.hints,
            gaps: self.gaps,
            partial: self.partial,
            reporter: self.reporter,
        }
    }

    fn add_table(&mut self, table: &str) {
        self.tables.insert(table.to_lowercase());
    }

    fn add_column(&mut self, table: &str, column: &str) {
        let table = table.to_lowercase();
        self.tables.insert(table.clone());
        self.columns
            .entry(table)
            .or_default()
            .insert(column.to_lowercase());
    }

    fn add_relationship(&mut self, relationship: RelationshipInfo) {
        self.add_column(&relationship.from_table, &relationship.from_column);
        self.add_column(&relationship.to_table, &relationship.to_column);
        self.relationships.insert(relationship);
    }

    fn has_column(&self, table: &str, column: &str) -> bool {
        self.columns
            .get(table)
            .map(|columns| columns.contains(column))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
enum Probe {
    Table(String),
    Column(String, String),
    Constraints(String),
    Relationships,
    Functions,
}

impl std::fmt::Display for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table(table) => write!(f, "table {}", table),
            Self::Column(table, column) => write!(f, "column {}.{}", table, column),
            Self::Constraints(table) => write!(f, "constraints of {}", table),
            Self::Relationships => write!(f, "relationships"),
            Self::Functions => write!(f, "functions"),
        }
    }
}

enum ProbeValue {
    Exists(bool),
    Constraints(Vec<ConstraintInfo>),
    Relationships(Vec<RelationshipInfo>),
    Functions(Vec<FunctionInfo>),
}

struct ProbePass<'a> {
    introspector: &'a dyn SchemaIntrospector,
    options: ProbeOptions,
    deadline: tokio::time::Instant,
    builder: ContextBuilder,
}

impl ProbePass<'_> {
    async fn run_phase(&mut self, probes: Vec<Probe>) -> IntrospectionResult<()> {
        if self.builder.partial || probes.is_empty() {
            return Ok(());
        }

        let introspector = self.introspector;
        let query_timeout = self.options.query_timeout;
        let mut results = stream::iter(probes)
            .map(|probe| execute(introspector, probe, query_timeout))
            .buffer_unordered(self.options.max_concurrent_queries.max(1));

        let mut collected = Vec::new();
        let drained = tokio::time::timeout_at(self.deadline, async {
            while let Some((probe, result)) = results.next().await {
                match result {
                    Err(err) if err.is_fatal() => return Err(err),
                    other => collected.push((probe, other)),
                }
            }
            Ok(())
        })
        .await;

        match drained {
            Ok(Ok(())) => {}
            Ok(Err(fatal)) => {
                tracing::error!(error = %fatal, "introspection aborted");
                return Err(fatal);
            }
            Err(_) => {
                self.builder.partial = true;
                self.builder.reporter.warn(&format!(
                    "Introspection exceeded {} ms; continuing with partial schema facts",
                    millis(self.options.max_execution_time)
                ));
            }
        }

        // Fold in a stable order so the context does not depend on which
        // probe finished first.
        collected.sort_by_key(|(probe, _)| probe.to_string());
        for (probe, result) in collected {
            self.record(probe, result);
        }
        Ok(())
    }

    fn record(&mut self, probe: Probe, result: IntrospectionResult<ProbeValue>) {
        let value = match result {
            Ok(value) => value,
            Err(err) => {
                let gap = EvidenceGap {
                    probe: probe.to_string(),
                    reason: err.to_string(),
                };
                tracing::debug!(probe = %gap.probe, reason = %gap.reason, "treating probe as absent");
                self.builder
                    .reporter
                    .debug(&format!("Evidence gap: {} ({})", gap.probe, gap.reason));
                self.builder.gaps.push(gap);
                return;
            }
        };

        match (probe, value) {
            (Probe::Table(table), ProbeValue::Exists(true)) => self.builder.add_table(&table),
            (Probe::Column(table, column), ProbeValue::Exists(true)) => {
                self.builder.add_column(&table, &column)
            }
            (Probe::Constraints(_), ProbeValue::Constraints(constraints)) => {
                self.builder.constraints.extend(constraints);
            }
            (Probe::Relationships, ProbeValue::Relationships(relationships)) => {
                for relationship in relationships {
                    self.builder.add_relationship(relationship);
                }
            }
            (Probe::Functions, ProbeValue::Functions(functions)) => {
                self.builder.functions.extend(functions);
            }
            _ => {}
        }
    }
}

async fn execute(
    introspector: &dyn SchemaIntrospector,
    probe: Probe,
    query_timeout: Duration,
) -> (Probe, IntrospectionResult<ProbeValue>) {
    let query = async {
        match &probe {
            Probe::Table(table) => introspector.table_exists(table).await.map(ProbeValue::Exists),
            Probe::Column(table, column) => introspector
                .column_exists(table, column)
                .await
                .map(ProbeValue::Exists),
            Probe::Constraints(table) => introspector
                .list_constraints(table)
                .await
                .map(ProbeValue::Constraints),
            Probe::Relationships => introspector
                .list_relationships()
                .await
                .map(ProbeValue::Relationships),
            Probe::Functions => introspector.list_functions().await.map(ProbeValue::Functions),
        }
    };

    let result = match tokio::time::timeout(query_timeout, query).await {
        Ok(result) => result,
        Err(_) => Err(IntrospectionError::Timeout(millis(query_timeout))),
    };
    (probe, result)
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
