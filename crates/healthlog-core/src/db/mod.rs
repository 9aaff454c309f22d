//! Database layer for the health log.

mod measurements;
mod patients;
mod schema;

pub use measurements::*;
pub use patients::*;
pub use schema::*;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

use crate::config::StoreConfig;
use crate::metrics::ValidationError;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Coarse classification of a [`DbError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input rejected before reaching the store
    Validation,
    /// Target id has no record
    NotFound,
    /// The store itself failed
    Persistence,
}

impl DbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Validation(_) => ErrorKind::Validation,
            DbError::NotFound { .. } => ErrorKind::NotFound,
            DbError::Sqlite(_) | DbError::Io(_) | DbError::Corrupt(_) => ErrorKind::Persistence,
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
///
/// Handed by reference to the repositories; dropping it closes the connection.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating it (and its directory) if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        tracing::info!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Open the database named by a [`StoreConfig`].
    pub fn open_with_config(config: &StoreConfig) -> DbResult<Self> {
        Self::open(&config.database_path)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Repository over patient records.
    pub fn patients(&self) -> PatientRepository<'_> {
        PatientRepository::new(self)
    }

    /// Repository over measurement records.
    pub fn measurements(&self) -> MeasurementRepository<'_> {
        MeasurementRepository::new(self)
    }
}
