//! Database layer for the lab companion.

mod catalog;
mod reports;
mod results;
mod schema;
mod users;

pub use catalog::*;
pub use schema::*;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Invalid stored value: {0}")]
    InvalidData(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
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

    /// Begin a transaction through a shared reference.
    ///
    /// Inserts made through `self` while the guard lives belong to it.
    pub fn begin(&self) -> DbResult<rusqlite::Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }
}

/// Map a UNIQUE/FOREIGN KEY failure to `DbError::Constraint`.
pub(crate) fn constraint_context(err: rusqlite::Error, context: &str) -> DbError {
    if let rusqlite::Error::SqliteFailure(e, msg) = &err {
        if e.code == rusqlite::ErrorCode::ConstraintViolation {
            return DbError::Constraint(format!(
                "{}: {}",
                context,
                msg.as_deref().unwrap_or("constraint failed")
            ));
        }
    }
    DbError::Sqlite(err)
}
