//! Introspector backed by a JSON schema snapshot.
//!
//! Snapshots let the CLI (and tests) run detection without a live database.
//!
//! ```json
//! {
//!   "tables": { "accounts": ["id", "slug", "is_personal_account"] },
//!   "constraints": [
//!     { "table": "accounts", "name": "accounts_pkey", "kind": "primary_key",
//!       "definition": "PRIMARY KEY (id)", "columns": ["id"] }
//!   ],
//!   "relationships": [],
//!   "functions": []
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::IntrospectionResult;
use super::provider::SchemaIntrospector;
use super::types::{ConstraintInfo, FunctionInfo, RelationshipInfo};

/// Serialized schema facts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    /// Table name -> column names.
    #[serde(default)]
    pub tables: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    pub constraints: Vec<ConstraintInfo>,
    #[serde(default)]
    pub relationships: Vec<RelationshipInfo>,
    #[serde(default)]
    pub functions: Vec<FunctionInfo>,
}

impl SchemaSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table with its columns.
    pub fn with_table(mut self, name: &str, columns: &[&str]) -> Self {
        let entry = self.tables.entry(name.to_lowercase()).or_default();
        entry.extend(columns.iter().map(|c| c.to_lowercase()));
        self
    }

    pub fn with_constraint(mut self, constraint: ConstraintInfo) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_relationship(mut self, relationship: RelationshipInfo) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn with_function(mut self, function: FunctionInfo) -> Self {
        self.functions.push(function);
        self
    }

    /// Parse a snapshot from JSON, normalizing names to lowercase.
    pub fn from_json(json: &str) -> IntrospectionResult<Self> {
        let raw: SchemaSnapshot = serde_json::from_str(json)?;
        Ok(raw.normalized())
    }

    /// Read a snapshot from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> IntrospectionResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    fn normalized(self) -> Self {
        let tables = self
            .tables
            .into_iter()
            .map(|(table, columns)| {
                (
                    table.to_lowercase(),
                    columns.into_iter().map(|c| c.to_lowercase()).collect(),
                )
            })
            .collect();
        let constraints = self
            .constraints
            .into_iter()
            .map(|mut c| {
                c.table = c.table.to_lowercase();
                c
            })
            .collect();
        let relationships = self
            .relationships
            .into_iter()
            .map(|r| {
                RelationshipInfo::new(&r.from_table, &r.from_column, &r.to_table, &r.to_column)
                    .with_kind(r.kind)
            })
            .collect();
        let functions = self
            .functions
            .into_iter()
            .map(|mut f| {
                f.name = f.name.to_lowercase();
                f
            })
            .collect();

        Self {
            tables,
            constraints,
            relationships,
            functions,
        }
    }
}

/// [`SchemaIntrospector`] that answers from a [`SchemaSnapshot`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotIntrospector {
    snapshot: SchemaSnapshot,
}

impl SnapshotIntrospector {
    pub fn new(snapshot: SchemaSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn from_file(path: impl AsRef<Path>) -> IntrospectionResult<Self> {
        Ok(Self::new(SchemaSnapshot::from_file(path)?))
    }

    pub fn snapshot(&self) -> &SchemaSnapshot {
        &self.snapshot
    }
}

#[async_trait]
impl SchemaIntrospector for SnapshotIntrospector {
    async fn table_exists(&self, table: &str) -> IntrospectionResult<bool> {
        Ok(self.snapshot.tables.contains_key(&table.to_lowercase()))
    }

    async fn column_exists(&self, table: &str, column: &str) -> IntrospectionResult<bool> {
        Ok(self
            .snapshot
            .tables
            .get(&table.to_lowercase())
            .map(|columns| columns.contains(&column.to_lowercase()))
            .unwrap_or(false))
    }

    async fn list_constraints(&self, table: &str) -> IntrospectionResult<Vec<ConstraintInfo>> {
        let table = table.to_lowercase();
        Ok(self
            .snapshot
            .constraints
            .iter()
            .filter(|c| c.table == table)
            .cloned()
            .collect())
    }

    async fn list_relationships(&self) -> IntrospectionResult<Vec<RelationshipInfo>> {
        Ok(self.snapshot.relationships.clone())
    }

    async fn list_functions(&self) -> IntrospectionResult<Vec<FunctionInfo>> {
        Ok(self.snapshot.functions.clone())
    }
}
