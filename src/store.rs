//! Storage of the serialized database image.
//!
//! The engine keeps the working database in memory and rewrites the whole
//! image through an [`ImageStore`] after every mutating statement. The store
//! is injected at construction, so hosts with different storage (test
//! fixtures, alternate directories) swap implementations rather than
//! ambient state.

use std::fs;
use std::path::PathBuf;

use rusqlite::backup::Progress;
use rusqlite::{Connection, DatabaseName};

use crate::error::DbError;

/// Whole-image load/flush against one storage location.
pub trait ImageStore: Send {
    /// Does the storage location already hold an image?
    fn exists(&self) -> bool;

    /// Replace `conn`'s contents with the stored image.
    fn load_into(&self, conn: &mut Connection) -> Result<(), DbError>;

    /// Write `conn`'s full contents to storage, replacing any prior image.
    fn flush_from(&self, conn: &Connection) -> Result<(), DbError>;
}

/// File-backed image store. Flushes go to a sibling temp file first and are
/// renamed into place, so a crash mid-flush leaves the previous image intact.
#[derive(Debug, Clone)]
pub struct FsImageStore {
    path: PathBuf,
}

impl FsImageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl ImageStore for FsImageStore {
    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load_into(&self, conn: &mut Connection) -> Result<(), DbError> {
        conn.restore(DatabaseName::Main, &self.path, None::<fn(Progress)>)
            .map_err(|source| DbError::Init {
                path: self.path.display().to_string(),
                source,
            })
    }

    fn flush_from(&self, conn: &Connection) -> Result<(), DbError> {
        let tmp = self.tmp_path();
        let path = self.path.display().to_string();
        conn.backup(DatabaseName::Main, &tmp, None)
            .map_err(|source| DbError::Flush {
                path: path.clone(),
                source: Box::new(source),
            })?;
        fs::rename(&tmp, &self.path).map_err(|source| DbError::Flush {
            path,
            source: Box::new(source),
        })?;
        log::trace!("flushed database image to {}", self.path.display());
        Ok(())
    }
}
