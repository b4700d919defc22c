use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DbError;
use crate::row::Row;

/// Declared column types, mapped one-to-one onto SQLite type keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Int,
    Integer,
    BigInt,
    Real,
    Double,
    Float,
    Numeric,
    Text,
    Char,
    Boolean,
    Date,
    DateTime,
    Blob,
}

impl DataType {
    pub fn keyword(self) -> &'static str {
        match self {
            DataType::Int => "INT",
            DataType::Integer => "INTEGER",
            DataType::BigInt => "BIGINT",
            DataType::Real => "REAL",
            DataType::Double => "DOUBLE",
            DataType::Float => "FLOAT",
            DataType::Numeric => "NUMERIC",
            DataType::Text => "TEXT",
            DataType::Char => "CHARACTER",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::DateTime => "DATETIME",
            DataType::Blob => "BLOB",
        }
    }

    /// Columns of these types get their stored text coerced back into
    /// date-typed field values when rows are read.
    pub fn is_date(self) -> bool {
        matches!(self, DataType::Date | DataType::DateTime)
    }

    /// Types that `sum` accepts.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            DataType::Int
                | DataType::Integer
                | DataType::BigInt
                | DataType::Real
                | DataType::Double
                | DataType::Float
                | DataType::Numeric
        )
    }
}

/// Column constraints supported in declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constraint {
    PrimaryKey,
    Unique,
    NotNull,
}

impl Constraint {
    pub fn keyword(self) -> &'static str {
        match self {
            Constraint::PrimaryKey => "PRIMARY KEY",
            Constraint::Unique => "UNIQUE",
            Constraint::NotNull => "NOT NULL",
        }
    }
}

/// Immutable metadata for one column: name, declared type, constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    name: String,
    data_type: DataType,
    constraints: Vec<Constraint>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self::with_constraints(name, data_type, &[])
    }

    pub fn with_constraints(
        name: impl Into<String>,
        data_type: DataType,
        constraints: &[Constraint],
    ) -> Self {
        Self {
            name: name.into(),
            data_type,
            constraints: constraints.to_vec(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The column-definition fragment used in CREATE TABLE and ALTER TABLE,
    /// e.g. `id INTEGER PRIMARY KEY`. Names are not escaped; declarations
    /// must use SQL-safe identifiers.
    pub fn render(&self) -> String {
        let mut out = format!("{} {}", self.name, self.data_type.keyword());
        for c in &self.constraints {
            out.push(' ');
            out.push_str(c.keyword());
        }
        out
    }
}

/// Per-entity-type schema: a table name plus an ordered column list.
///
/// Built once at startup via [`Schema::builder`] and shared behind an `Arc`;
/// column order is stable and defines the positional mapping between stored
/// values and fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    table: String,
    columns: Vec<ColumnDef>,
}

impl Schema {
    pub fn builder(table: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            table: table.into(),
            columns: Vec::new(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub(crate) fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Fresh all-fields-unset row carrying this schema. This is the row
    /// template used when query results are marshalled back into entities.
    pub fn new_row(self: &Arc<Self>) -> Row {
        Row::new(self)
    }
}

/// Explicit schema registration, one invocation per entity type.
pub struct SchemaBuilder {
    table: String,
    columns: Vec<ColumnDef>,
}

impl SchemaBuilder {
    pub fn column(self, name: impl Into<String>, data_type: DataType) -> Self {
        self.column_with(name, data_type, &[])
    }

    pub fn column_with(
        mut self,
        name: impl Into<String>,
        data_type: DataType,
        constraints: &[Constraint],
    ) -> Self {
        self.columns
            .push(ColumnDef::with_constraints(name, data_type, constraints));
        self
    }

    pub fn build(self) -> Result<Arc<Schema>, DbError> {
        if self.table.trim().is_empty() {
            return Err(DbError::InvalidSchema {
                table: self.table,
                reason: "table name must not be empty".to_string(),
            });
        }
        if self.columns.is_empty() {
            return Err(DbError::InvalidSchema {
                table: self.table,
                reason: "schema must declare at least one column".to_string(),
            });
        }
        for (i, col) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name() == col.name()) {
                return Err(DbError::InvalidSchema {
                    table: self.table,
                    reason: format!("duplicate column `{}`", col.name()),
                });
            }
        }
        Ok(Arc::new(Schema {
            table: self.table,
            columns: self.columns,
        }))
    }
}
