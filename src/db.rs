//! The persistence engine: owns the in-memory engine handle, reconciles
//! declared schemas on startup and rewrites the full database image to the
//! injected store after every mutating statement.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use rusqlite::types::{FromSql, ValueRef};
use rusqlite::Connection;

use crate::error::DbError;
use crate::filter::RowFilter;
use crate::migrate;
use crate::query;
use crate::row::Row;
use crate::schema::{ColumnDef, DataType, Schema};
use crate::store::{FsImageStore, ImageStore};
use crate::value::Value;

/// Engine configuration: where the image lives and which entity types it
/// persists.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub db_path: PathBuf,
    pub schemas: Vec<Arc<Schema>>,
}

impl DbConfig {
    pub fn new(db_path: impl Into<PathBuf>, schemas: Vec<Arc<Schema>>) -> Self {
        Self {
            db_path: db_path.into(),
            schemas,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Initializing,
    Ready,
}

/// Embedded database handle plus declared entity schemas.
///
/// Single-owner, single-threaded: exactly one live `Database` per storage
/// location at a time. Construct, then call [`init`](Self::init) (or its
/// async twin) before any other operation; everything else returns
/// [`DbError::NotReady`] until initialization succeeds.
pub struct Database {
    schemas: Vec<Arc<Schema>>,
    store: Box<dyn ImageStore>,
    conn: Option<Connection>,
    state: State,
}

impl Database {
    /// File-backed database at `config.db_path`.
    pub fn new(config: DbConfig) -> Result<Self, DbError> {
        let store = FsImageStore::new(config.db_path);
        Self::with_store(config.schemas, Box::new(store))
    }

    /// Database over a caller-supplied image store.
    pub fn with_store(
        schemas: Vec<Arc<Schema>>,
        store: Box<dyn ImageStore>,
    ) -> Result<Self, DbError> {
        for (i, schema) in schemas.iter().enumerate() {
            if schemas[..i]
                .iter()
                .any(|s| s.table_name() == schema.table_name())
            {
                return Err(DbError::InvalidSchema {
                    table: schema.table_name().to_string(),
                    reason: "table name registered more than once".to_string(),
                });
            }
        }
        Ok(Self {
            schemas,
            store,
            conn: None,
            state: State::Uninitialized,
        })
    }

    /// Load the stored image and reconcile schemas, or create a fresh
    /// database with all declared tables and persist it immediately.
    ///
    /// Fatal on any storage or engine error; the database stays
    /// uninitialized in that case.
    pub fn init(&mut self) -> Result<(), DbError> {
        self.state = State::Initializing;
        match self.init_inner() {
            Ok(conn) => {
                self.conn = Some(conn);
                self.state = State::Ready;
                Ok(())
            }
            Err(e) => {
                self.conn = None;
                self.state = State::Uninitialized;
                Err(e)
            }
        }
    }

    /// Awaitable initialization. Semantically identical to [`init`]: the
    /// future resolving is the completion notification, nothing runs
    /// concurrently.
    ///
    /// [`init`]: Self::init
    pub async fn init_async(&mut self) -> Result<(), DbError> {
        self.init()
    }

    pub fn is_ready(&self) -> bool {
        self.state == State::Ready
    }

    fn init_inner(&mut self) -> Result<Connection, DbError> {
        let mut conn = Connection::open_in_memory().map_err(|source| DbError::Init {
            path: "<memory>".to_string(),
            source,
        })?;
        if self.store.exists() {
            log::info!("loading existing database image");
            self.store.load_into(&mut conn)?;
            let statements =
                migrate::plan(&conn, &self.schemas).map_err(|source| DbError::Migration {
                    statement: "<catalog introspection>".to_string(),
                    source,
                })?;
            for statement in statements {
                log::info!("reconciling schema: {statement}");
                conn.execute(&statement, [])
                    .map_err(|source| DbError::Migration { statement, source })?;
                self.store.flush_from(&conn)?;
            }
        } else {
            log::info!("creating new database image");
            for schema in &self.schemas {
                let statement = migrate::create_table_sql(schema);
                conn.execute(&statement, [])
                    .map_err(|source| DbError::Migration { statement, source })?;
            }
            self.store.flush_from(&conn)?;
        }
        Ok(conn)
    }

    /// Insert-or-replace the entity's set fields. Unset fields are omitted
    /// from the statement so column defaults and autoincrement apply.
    pub fn upsert(&self, row: &Row) -> Result<(), DbError> {
        let (columns, values): (Vec<&str>, Vec<&Value>) = row
            .set_columns()
            .map(|(col, val)| (col.name(), val))
            .unzip();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let statement = format!(
            "REPLACE INTO {} ({}) VALUES ({})",
            row.table_name(),
            columns.join(", "),
            placeholders
        );
        self.run(&statement, &values)?;
        Ok(())
    }

    /// Delete rows matching the entity's truthy fields; returns the number
    /// of rows removed.
    ///
    /// The predicate uses truthiness, not set-ness: zero, empty text and
    /// `false` never constrain a delete. With no truthy field at all the
    /// statement is refused outright, since an unconditioned DELETE would
    /// wipe the table; the refusal is logged and 0 is returned.
    pub fn delete(&self, row: &Row) -> Result<usize, DbError> {
        let (columns, values): (Vec<&str>, Vec<&Value>) = row
            .set_columns()
            .filter(|(_, val)| val.is_truthy())
            .map(|(col, val)| (col.name(), val))
            .unzip();
        if columns.is_empty() {
            log::warn!(
                "refusing to delete from {} without any truthy predicate column",
                row.table_name()
            );
            return Ok(0);
        }
        let predicate: Vec<String> = columns.iter().map(|c| format!("{c} = ?")).collect();
        let statement = format!(
            "DELETE FROM {} WHERE {}",
            row.table_name(),
            predicate.join(" AND ")
        );
        self.run(&statement, &values)
    }

    /// Rows matching the sparse filter row, optionally constrained and
    /// ordered by `row_filter`. Each result is marshalled into a fresh row
    /// sharing the filter's schema.
    pub fn read_rows(
        &self,
        filter: &Row,
        row_filter: Option<&RowFilter>,
    ) -> Result<Vec<Row>, DbError> {
        let schema = filter.schema();
        let mut sql = select_prefix(schema);
        if let Some(clause) = query::where_clause(filter, row_filter)? {
            sql.push(' ');
            sql.push_str(&clause);
        }
        if let Some(clause) = query::order_clause(schema, row_filter)? {
            sql.push(' ');
            sql.push_str(&clause);
        }
        self.fetch(schema, &sql)
    }

    /// Every row of the entity's table.
    pub fn read_all_rows(&self, schema: &Arc<Schema>) -> Result<Vec<Row>, DbError> {
        self.fetch(schema, &select_prefix(schema))
    }

    /// Rows under a caller-supplied predicate, which may or may not carry a
    /// leading `WHERE` (any casing). Field values play no part here.
    pub fn read_rows_where(
        &self,
        schema: &Arc<Schema>,
        raw_predicate: &str,
    ) -> Result<Vec<Row>, DbError> {
        let mut sql = select_prefix(schema);
        if let Some(clause) = query::normalize_raw_where(raw_predicate) {
            sql.push(' ');
            sql.push_str(&clause);
        }
        self.fetch(schema, &sql)
    }

    /// `SELECT count(1)` under the sparse-filter predicate. A NULL scalar
    /// counts as 0.
    pub fn count(&self, filter: &Row, row_filter: Option<&RowFilter>) -> Result<i64, DbError> {
        let mut sql = format!("SELECT count(1) FROM {}", filter.table_name());
        if let Some(clause) = query::where_clause(filter, row_filter)? {
            sql.push(' ');
            sql.push_str(&clause);
        }
        Ok(self.scalar::<i64>(&sql)?.unwrap_or(0))
    }

    /// `SELECT sum(column)` under the sparse-filter predicate. Summing zero
    /// rows yields 0; naming a column whose declared type is not numeric is
    /// caller misuse and fails with [`DbError::NonNumericSum`].
    pub fn sum(
        &self,
        filter: &Row,
        column: &str,
        row_filter: Option<&RowFilter>,
    ) -> Result<f64, DbError> {
        let schema = filter.schema();
        self.check_summable(schema, column)?;
        let mut sql = format!("SELECT sum({column}) FROM {}", schema.table_name());
        if let Some(clause) = query::where_clause(filter, row_filter)? {
            sql.push(' ');
            sql.push_str(&clause);
        }
        Ok(self.scalar::<f64>(&sql)?.unwrap_or(0.0))
    }

    /// `sum` variant taking a raw predicate, normalized like
    /// [`read_rows_where`](Self::read_rows_where).
    pub fn sum_where(
        &self,
        schema: &Arc<Schema>,
        column: &str,
        raw_predicate: &str,
    ) -> Result<f64, DbError> {
        self.check_summable(schema, column)?;
        let mut sql = format!("SELECT sum({column}) FROM {}", schema.table_name());
        if let Some(clause) = query::normalize_raw_where(raw_predicate) {
            sql.push(' ');
            sql.push_str(&clause);
        }
        Ok(self.scalar::<f64>(&sql)?.unwrap_or(0.0))
    }

    /// Table names in the live catalog.
    pub fn list_tables(&self) -> Result<Vec<String>, DbError> {
        let conn = self.conn()?;
        migrate::existing_tables(conn).map_err(|source| DbError::Statement {
            statement: "SELECT name FROM sqlite_master".to_string(),
            values: String::new(),
            source,
        })
    }

    /// Live column names for the entity's table.
    pub fn list_columns(&self, schema: &Schema) -> Result<Vec<String>, DbError> {
        let conn = self.conn()?;
        migrate::existing_columns(conn, schema.table_name()).map_err(|source| {
            DbError::Statement {
                statement: format!("PRAGMA table_info({})", schema.table_name()),
                values: String::new(),
                source,
            }
        })
    }

    fn conn(&self) -> Result<&Connection, DbError> {
        match self.state {
            State::Ready => self.conn.as_ref().ok_or(DbError::NotReady),
            _ => Err(DbError::NotReady),
        }
    }

    /// Execute one mutating statement with bound values, then flush the full
    /// image back to storage.
    fn run(&self, statement: &str, values: &[&Value]) -> Result<usize, DbError> {
        let conn = self.conn()?;
        let affected = conn
            .execute(statement, rusqlite::params_from_iter(values.iter()))
            .map_err(|source| DbError::Statement {
                statement: statement.to_string(),
                values: literal_list(values),
                source,
            })?;
        self.store.flush_from(conn)?;
        Ok(affected)
    }

    fn fetch(&self, schema: &Arc<Schema>, sql: &str) -> Result<Vec<Row>, DbError> {
        let conn = self.conn()?;
        let wrap = |source| DbError::Statement {
            statement: sql.to_string(),
            values: String::new(),
            source,
        };
        let mut stmt = conn.prepare(sql).map_err(wrap)?;
        let mut rows = stmt.query([]).map_err(wrap)?;
        let mut out = Vec::new();
        while let Some(result) = rows.next().map_err(wrap)? {
            let mut row = schema.new_row();
            for (index, column) in schema.columns().iter().enumerate() {
                let value_ref = result.get_ref(index).map_err(wrap)?;
                row.set_by_index(index, column_value(column, value_ref));
            }
            out.push(row);
        }
        Ok(out)
    }

    /// Run an aggregate query expected to yield exactly one scalar.
    fn scalar<T: FromSql>(&self, sql: &str) -> Result<Option<T>, DbError> {
        let conn = self.conn()?;
        match conn.query_row(sql, [], |row| row.get::<_, Option<T>>(0)) {
            Ok(value) => Ok(value),
            Err(rusqlite::Error::QueryReturnedNoRows)
            | Err(rusqlite::Error::InvalidColumnType(..)) => Err(DbError::AggregateShape {
                statement: sql.to_string(),
            }),
            Err(source) => Err(DbError::Statement {
                statement: sql.to_string(),
                values: String::new(),
                source,
            }),
        }
    }

    fn check_summable(&self, schema: &Schema, column: &str) -> Result<(), DbError> {
        query::check_column(schema, column)?;
        let declared = schema
            .column(column)
            .map(ColumnDef::data_type)
            .unwrap_or(DataType::Blob);
        if declared.is_numeric() {
            Ok(())
        } else {
            Err(DbError::NonNumericSum {
                table: schema.table_name().to_string(),
                column: column.to_string(),
            })
        }
    }
}

fn select_prefix(schema: &Schema) -> String {
    let columns: Vec<&str> = schema.columns().iter().map(ColumnDef::name).collect();
    format!(
        "SELECT {} FROM {}",
        columns.join(", "),
        schema.table_name()
    )
}

fn literal_list(values: &[&Value]) -> String {
    values
        .iter()
        .map(|v| v.to_sql_literal())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Marshal one stored scalar into a field value. SQL NULL maps to unset;
/// text in a date-typed column is coerced to a calendar date when it parses
/// as `YYYY-MM-DD`; everything else passes through unchanged.
fn column_value(column: &ColumnDef, value_ref: ValueRef<'_>) -> Option<Value> {
    match value_ref {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(if column.data_type() == DataType::Boolean {
            Value::Boolean(i != 0)
        } else {
            Value::Integer(i)
        }),
        ValueRef::Real(r) => Some(Value::Real(r)),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            if column.data_type().is_date() {
                let head = text.get(..10).unwrap_or(text.as_str());
                if let Ok(date) = NaiveDate::parse_from_str(head, "%Y-%m-%d") {
                    return Some(Value::Date(date));
                }
            }
            Some(Value::Text(text))
        }
        ValueRef::Blob(bytes) => Some(Value::Blob(bytes.to_vec())),
    }
}
