//! Schema reconciliation: compare declared entity schemas against the live
//! catalog and plan the additive DDL that brings the database up to date.
//!
//! The plan only ever creates missing tables and appends missing columns.
//! Live tables and columns with no declared counterpart are left untouched,
//! and existing column types are never altered.

use std::sync::Arc;

use rusqlite::Connection;

use crate::schema::{ColumnDef, Schema};

pub(crate) fn create_table_sql(schema: &Schema) -> String {
    let defs: Vec<String> = schema.columns().iter().map(ColumnDef::render).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        schema.table_name(),
        defs.join(", ")
    )
}

pub(crate) fn add_column_sql(table: &str, column: &ColumnDef) -> String {
    format!("ALTER TABLE {table} ADD {}", column.render())
}

/// Table names currently present in the engine's catalog.
pub(crate) fn existing_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    rows.collect()
}

/// Live column names for one table, in table order.
pub(crate) fn existing_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    rows.collect()
}

/// Compute the DDL statements needed to reconcile the declared schemas with
/// the live database. Idempotent: planning against an already-reconciled
/// database yields an empty list. ALTERs follow declared column order.
pub(crate) fn plan(
    conn: &Connection,
    schemas: &[Arc<Schema>],
) -> rusqlite::Result<Vec<String>> {
    let tables = existing_tables(conn)?;
    let mut statements = Vec::new();
    for schema in schemas {
        if !tables.iter().any(|t| t == schema.table_name()) {
            statements.push(create_table_sql(schema));
            continue;
        }
        let live = existing_columns(conn, schema.table_name())?;
        for column in schema.columns() {
            if !live.iter().any(|c| c == column.name()) {
                statements.push(add_column_sql(schema.table_name(), column));
            }
        }
    }
    Ok(statements)
}
