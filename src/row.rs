use std::sync::Arc;

use crate::error::DbError;
use crate::schema::{ColumnDef, Schema};
use crate::value::Value;

/// One row-shaped entity instance: a shared schema plus per-column values.
///
/// Fields are optional. An unset field (`None`) never appears in upsert
/// statements or filter predicates; a set-but-falsy value such as `0` does.
/// That distinction is what lets the same shape express full rows, partial
/// rows and sparse query filters.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    schema: Arc<Schema>,
    values: Vec<Option<Value>>,
}

impl Row {
    pub fn new(schema: &Arc<Schema>) -> Self {
        Self {
            schema: Arc::clone(schema),
            values: vec![None; schema.columns().len()],
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn table_name(&self) -> &str {
        self.schema.table_name()
    }

    /// Set a field by column name. Unknown names are rejected against the
    /// declared schema.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<(), DbError> {
        let idx = self.index_of(column)?;
        self.values[idx] = Some(value.into());
        Ok(())
    }

    /// Chainable variant of [`set`](Self::set) for building rows in place.
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Result<Self, DbError> {
        self.set(column, value)?;
        Ok(self)
    }

    /// Return a field to the unset state.
    pub fn clear(&mut self, column: &str) -> Result<(), DbError> {
        let idx = self.index_of(column)?;
        self.values[idx] = None;
        Ok(())
    }

    /// Current value of a field; `None` when unset or unknown.
    pub fn get(&self, column: &str) -> Option<&Value> {
        let idx = self.schema.column_index(column)?;
        self.values[idx].as_ref()
    }

    pub fn is_set(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Set (column, value) pairs in schema order.
    pub fn set_columns(&self) -> impl Iterator<Item = (&ColumnDef, &Value)> {
        self.schema
            .columns()
            .iter()
            .zip(self.values.iter())
            .filter_map(|(col, val)| val.as_ref().map(|v| (col, v)))
    }

    pub(crate) fn set_by_index(&mut self, index: usize, value: Option<Value>) {
        self.values[index] = value;
    }

    fn index_of(&self, column: &str) -> Result<usize, DbError> {
        self.schema
            .column_index(column)
            .ok_or_else(|| DbError::UnknownColumn {
                table: self.schema.table_name().to_string(),
                column: column.to_string(),
            })
    }
}
