use thiserror::Error;

/// Errors surfaced by the persistence layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// An operation was invoked before `init` completed successfully.
    #[error("database is not initialized")]
    NotReady,

    /// The stored database image could not be loaded.
    #[error("unable to load database image from {path}: {source}")]
    Init {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A CREATE TABLE / ALTER TABLE issued during schema reconciliation
    /// failed. The schema may be partially migrated at this point.
    #[error("schema migration failed on `{statement}`: {source}")]
    Migration {
        statement: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The engine rejected a statement at execution time.
    #[error("unable to run `{statement}` with values [{values}]: {source}")]
    Statement {
        statement: String,
        values: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A count/sum query did not produce exactly one scalar result.
    #[error("aggregate query returned an unexpected shape: `{statement}`")]
    AggregateShape { statement: String },

    /// `sum` was asked to total a column whose declared type is not numeric.
    #[error("cannot sum non-numeric column `{column}` on table `{table}`")]
    NonNumericSum { table: String, column: String },

    /// A column name does not exist on the entity's declared schema.
    #[error("unknown column `{column}` on table `{table}`")]
    UnknownColumn { table: String, column: String },

    /// An entity schema failed validation at build or registration time.
    #[error("invalid schema for table `{table}`: {reason}")]
    InvalidSchema { table: String, reason: String },

    /// Writing the database image back to storage failed.
    #[error("unable to flush database image to {path}: {source}")]
    Flush {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}
