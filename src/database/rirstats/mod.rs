//! Rirstats database storage
//!
//! This module provides the persistent database that delegated statistics are
//! imported into. It stores:
//! - Registry reference data (seeded on initialization)
//! - Datasets and their declared per-type counts
//! - IPv4, IPv6 and ASN records, deduplicated by natural key

mod datasets;
mod records;
mod registries;

pub use datasets::{DatasetRecord, DatasetRepository, SummaryRecord};
pub use records::{encode_key, DatasetRef, RecordRepository, RecordTable};
pub use registries::{RegistryRecord, RegistryRepository};

use crate::database::core::{DatabaseConn, SchemaManager, SchemaStatus};
use anyhow::{anyhow, Result};
use tracing::info;

/// File name of the database inside the data directory
pub const DATABASE_FILE_NAME: &str = "rirstats-data.sqlite3";

/// Main rirstats database (SQLite backend)
///
/// `RirstatsDatabase` provides a unified interface to all rirstats tables.
/// It handles:
/// - Schema initialization
/// - Automatic schema drift detection and reset
/// - Access to data repositories
pub struct RirstatsDatabase {
    db: DatabaseConn,
}

impl RirstatsDatabase {
    /// Open the rirstats database at the specified path
    ///
    /// If the database doesn't exist, it will be created and initialized.
    /// If the schema is outdated or corrupted, it will be reset and
    /// previously imported datasets are lost.
    pub fn open(path: &str) -> Result<Self> {
        let db = DatabaseConn::open_path(path)?;
        let schema = SchemaManager::new(&db.conn);

        match schema.check_status()? {
            SchemaStatus::Current => {
                info!("Rirstats database schema is current");
            }
            SchemaStatus::NotInitialized => {
                info!("Initializing rirstats database schema");
                schema.initialize()?;
            }
            SchemaStatus::NeedsMigration { from, to } => {
                info!("Rirstats database needs migration from v{} to v{}", from, to);
                schema.reset()?;
                schema.initialize()?;
            }
            SchemaStatus::Incompatible {
                database_version,
                required_version,
            } => {
                info!(
                    "Rirstats database schema incompatible (db: v{}, required: v{}), resetting",
                    database_version, required_version
                );
                schema.reset()?;
                schema.initialize()?;
            }
            SchemaStatus::Corrupted => {
                info!("Rirstats database schema corrupted, resetting");
                schema.reset()?;
                schema.initialize()?;
            }
        }

        Ok(Self { db })
    }

    /// Open the rirstats database from a data directory
    ///
    /// Creates the standard database file path: `{data_dir}/rirstats-data.sqlite3`
    pub fn open_in_dir(data_dir: &str) -> Result<Self> {
        ensure_data_dir(data_dir)?;
        let path = format!("{}/{}", data_dir, DATABASE_FILE_NAME);
        Self::open(&path)
    }

    /// Create an in-memory rirstats database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let db = DatabaseConn::open_in_memory()?;
        let schema = SchemaManager::new(&db.conn);
        schema.initialize()?;
        Ok(Self { db })
    }

    pub fn registries(&self) -> RegistryRepository<'_> {
        RegistryRepository::new(&self.db.conn)
    }

    pub fn datasets(&self) -> DatasetRepository<'_> {
        DatasetRepository::new(&self.db.conn)
    }

    pub fn records(&self) -> RecordRepository<'_> {
        RecordRepository::new(&self.db.conn)
    }

    /// Get the underlying database connection (for advanced queries)
    pub fn connection(&self) -> &rusqlite::Connection {
        &self.db.conn
    }
}

/// Ensure the data directory exists
pub fn ensure_data_dir(data_dir: &str) -> Result<()> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| anyhow!("Failed to create data directory '{}': {}", data_dir, e))
}
