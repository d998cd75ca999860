//! Schema facts reported by the introspector.

use serde::{Deserialize, Serialize};

/// Kind of a table constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    PrimaryKey,
    ForeignKey,
    Unique,
    Check,
    NotNull,
    Exclusion,
}

impl ConstraintKind {
    /// Parse a constraint kind as reported by catalogs.
    ///
    /// Accepts both the spelled-out form (`PRIMARY KEY`, `foreign_key`) and
    /// the single-letter `pg_constraint.contype` codes.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "p" | "primary_key" | "pk" => Some(Self::PrimaryKey),
            "f" | "foreign_key" | "fk" => Some(Self::ForeignKey),
            "u" | "unique" => Some(Self::Unique),
            "c" | "check" => Some(Self::Check),
            "n" | "not_null" => Some(Self::NotNull),
            "x" | "exclusion" | "exclude" => Some(Self::Exclusion),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PrimaryKey => write!(f, "primary_key"),
            Self::ForeignKey => write!(f, "foreign_key"),
            Self::Unique => write!(f, "unique"),
            Self::Check => write!(f, "check"),
            Self::NotNull => write!(f, "not_null"),
            Self::Exclusion => write!(f, "exclusion"),
        }
    }
}

/// A constraint declared on a table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConstraintInfo {
    /// Owning table (lowercase).
    pub table: String,
    /// Constraint name.
    pub name: String,
    /// Constraint kind.
    pub kind: ConstraintKind,
    /// Constraint definition (e.g. `CHECK (price >= 0)`).
    #[serde(default)]
    pub definition: String,
    /// Constrained columns, when the catalog reports them separately.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
}

impl ConstraintInfo {
    pub fn new(
        table: impl Into<String>,
        name: impl Into<String>,
        kind: ConstraintKind,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into().to_lowercase(),
            name: name.into(),
            kind,
            definition: definition.into(),
            columns: Vec::new(),
        }
    }

    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// Cardinality of a relationship between two tables.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    #[default]
    ManyToOne,
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl std::fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ManyToOne => write!(f, "N:1"),
            Self::OneToOne => write!(f, "1:1"),
            Self::OneToMany => write!(f, "1:N"),
            Self::ManyToMany => write!(f, "N:N"),
        }
    }
}

/// A foreign-key style link between two tables.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationshipInfo {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    #[serde(default)]
    pub kind: RelationshipKind,
}

impl RelationshipInfo {
    /// Create a many-to-one relationship with normalized (lowercase) names.
    pub fn new(from_table: &str, from_column: &str, to_table: &str, to_column: &str) -> Self {
        Self {
            from_table: from_table.to_lowercase(),
            from_column: from_column.to_lowercase(),
            to_table: to_table.to_lowercase(),
            to_column: to_column.to_lowercase(),
            kind: RelationshipKind::ManyToOne,
        }
    }

    pub fn with_kind(mut self, kind: RelationshipKind) -> Self {
        self.kind = kind;
        self
    }
}

impl std::fmt::Display for RelationshipInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{} ({})",
            self.from_table, self.from_column, self.to_table, self.to_column, self.kind
        )
    }
}

/// A database function (stored procedure / RPC).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub schema: String,
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub return_type: String,
}

impl FunctionInfo {
    pub fn new(schema: &str, name: &str) -> Self {
        Self {
            schema: schema.to_string(),
            name: name.to_lowercase(),
            args: Vec::new(),
            return_type: String::new(),
        }
    }
}
