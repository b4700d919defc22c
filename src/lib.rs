//! Lightweight entity persistence over an embedded SQLite database.
//!
//! Application code declares row-shaped entities as [`Schema`]s with typed,
//! constrained columns. The [`Database`] loads (or creates) the backing
//! image, reconciles the live tables with the declared schemas additively,
//! and then answers upserts, deletes, filtered reads and count/sum
//! aggregates, rewriting the full image to storage after every mutation.
//!
//! # Intention
//!
//! - One declaration surface: a table name plus columns, no out-of-band
//!   migration scripts.
//! - Sparse entity instances double as query filters: unset fields are
//!   ignored, set-but-falsy values constrain.
//! - Single in-process owner per database file; no locking, no concurrency.
//!
//! # Architectural Boundaries
//!
//! - SQL execution stays inside this crate; callers never see the
//!   connection.
//! - Storage is an injected [`ImageStore`]; no ambient filesystem state.

mod db;
mod error;
mod filter;
mod migrate;
mod query;
mod row;
mod schema;
mod store;
mod value;

pub use db::{Database, DbConfig};
pub use error::DbError;
pub use filter::RowFilter;
pub use row::Row;
pub use schema::{ColumnDef, Constraint, DataType, Schema, SchemaBuilder};
pub use store::{FsImageStore, ImageStore};
pub use value::Value;
