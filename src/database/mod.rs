//! Database module
//!
//! This module provides all database functionality for rirstats, organized into:
//!
//! - **core**: Core database infrastructure (SQLite connections, schema management)
//! - **rirstats**: The persistent store imported delegated statistics land in
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/           # Foundation
//! │   ├── connection  # SQLite DatabaseConn wrapper, duplicate detection
//! │   └── schema      # SQLite schema definitions and management
//! │
//! └── rirstats/       # Persistent storage
//!     ├── registries  # Registry reference data
//!     ├── datasets    # Imported datasets and declared counts
//!     └── records     # IPv4, IPv6 and ASN records
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use rirstats::database::RirstatsDatabase;
//!
//! let db = RirstatsDatabase::open_in_dir("~/.rirstats")?;
//! for dataset in db.datasets().list()? {
//!     println!("{} {}", dataset.registry, dataset.serial);
//! }
//! ```

pub mod core;
pub mod rirstats;

// SQLite connection and schema management
pub use core::{
    is_unique_violation, DatabaseConn, InsertOutcome, SchemaDefinitions, SchemaManager,
    SchemaStatus, SCHEMA_VERSION,
};

// Rirstats database (main entry point)
pub use rirstats::{ensure_data_dir, RirstatsDatabase, DATABASE_FILE_NAME};

// Repositories
pub use rirstats::{
    encode_key, DatasetRecord, DatasetRef, DatasetRepository, RecordRepository, RecordTable,
    RegistryRecord, RegistryRepository, SummaryRecord,
};
