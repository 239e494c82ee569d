//! Database connection management
//!
//! This module provides the core database connection wrapper used throughout rirstats.

use anyhow::{anyhow, Result};
use rusqlite::{ffi, Connection};

/// Core database connection wrapper
///
/// `DatabaseConn` provides a thin wrapper around SQLite connections,
/// handling both file-based and in-memory databases with consistent
/// configuration and error handling.
pub struct DatabaseConn {
    pub conn: Connection,
}

impl DatabaseConn {
    /// Open a database at the specified path
    ///
    /// If the path is `None`, an in-memory database is created.
    pub fn open(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)
                .map_err(|e| anyhow!("Failed to open database at '{}': {}", p, e))?,
            None => Connection::open_in_memory()
                .map_err(|e| anyhow!("Failed to create in-memory database: {}", e))?,
        };

        let db = DatabaseConn { conn };
        db.configure()?;
        Ok(db)
    }

    /// Open a database at the specified path (convenience method)
    pub fn open_path(path: &str) -> Result<Self> {
        Self::open(Some(path))
    }

    /// Create an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(None)
    }

    /// Configure the database
    ///
    /// Imports commit every insert on its own, so WAL with NORMAL sync keeps
    /// per-row commits cheap.
    fn configure(&self) -> Result<()> {
        let _: String = self
            .conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to set journal mode: {}", e))?;

        self.conn
            .execute("PRAGMA synchronous=NORMAL", [])
            .map_err(|e| anyhow!("Failed to set synchronous mode: {}", e))?;

        self.conn
            .execute("PRAGMA temp_store=MEMORY", [])
            .map_err(|e| anyhow!("Failed to set temp store: {}", e))?;

        self.conn
            .execute("PRAGMA foreign_keys=ON", [])
            .map_err(|e| anyhow!("Failed to enable foreign keys: {}", e))?;

        Ok(())
    }
}

/// Result of an insert under a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Row created with this rowid
    Inserted(i64),
    /// A row with the same unique key already exists
    Duplicate,
}

impl InsertOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, InsertOutcome::Duplicate)
    }
}

/// Whether an error is a UNIQUE or PRIMARY KEY constraint violation
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}

/// Map an insert result to an [`InsertOutcome`], keeping other errors
pub fn insert_outcome(
    result: rusqlite::Result<usize>,
    conn: &Connection,
) -> rusqlite::Result<InsertOutcome> {
    match result {
        Ok(_) => Ok(InsertOutcome::Inserted(conn.last_insert_rowid())),
        Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::Duplicate),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = DatabaseConn::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_insert_outcome_detects_unique_violation() {
        let db = DatabaseConn::open_in_memory().unwrap();
        db.conn
            .execute(
                "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE)",
                [],
            )
            .unwrap();

        let insert = |name: &str| {
            let result = db.conn.execute("INSERT INTO t (name) VALUES (?1)", [name]);
            insert_outcome(result, &db.conn).unwrap()
        };

        assert_eq!(insert("a"), InsertOutcome::Inserted(1));
        assert_eq!(insert("b"), InsertOutcome::Inserted(2));
        assert!(insert("a").is_duplicate());
    }

    #[test]
    fn test_insert_outcome_keeps_other_errors() {
        let db = DatabaseConn::open_in_memory().unwrap();
        db.conn
            .execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL)", [])
            .unwrap();

        let result = db.conn.execute("INSERT INTO t (name) VALUES (NULL)", []);
        assert!(insert_outcome(result, &db.conn).is_err());
    }
}
