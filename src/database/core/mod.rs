//! Core database infrastructure
//!
//! This module provides the foundational database components used throughout rirstats:
//! - `DatabaseConn`: Core SQLite connection wrapper with configuration
//! - `SchemaManager`: Schema initialization and management
//! - `SchemaStatus`: Schema state enumeration
//! - `InsertOutcome`: Inserted-or-duplicate result of uniqueness-constrained inserts

mod connection;
mod schema;

pub use connection::{insert_outcome, is_unique_violation, DatabaseConn, InsertOutcome};
pub use schema::{SchemaDefinitions, SchemaManager, SchemaStatus, SCHEMA_VERSION};
