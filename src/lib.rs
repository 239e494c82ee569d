#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Rirstats - RIR delegated statistics importer
//!
//! Rirstats reads the delegated statistics files published by the five regional
//! Internet registries (AFRINIC, APNIC, ARIN, LACNIC, RIPE NCC) and stores their
//! IPv4, IPv6 and ASN records in a SQLite database. It can be used as both a
//! command-line application and a library.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | (none) | Parsing, ingest pipeline and database | `rusqlite`, `tracing` |
//! | `fetch` | Read sources from local paths or URLs, compressed or not | `oneio` |
//! | `display` | Table formatting with `tabled` | `tabled` |
//! | `cli` | Full CLI binary | All above + `clap`, `indicatif` |
//!
//! ```toml
//! # Library only
//! rirstats = { version = "0.3", default-features = false }
//!
//! # Library with remote sources
//! rirstats = { version = "0.3", default-features = false, features = ["fetch"] }
//! ```
//!
//! # Architecture
//!
//! - **[`database`]**: SQLite connection, schema and repositories
//! - **[`lens`]**: The delegated file parser and ingest pipeline
//! - **[`config`]**: Configuration management
//! - **[`error`]**: Fatal ingest conditions and record decode errors
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use rirstats::database::RirstatsDatabase;
//! use rirstats::lens::delegated::{IngestArgs, IngestLens, IngestSource, Registry};
//!
//! let db = RirstatsDatabase::open_in_dir("~/.rirstats")?;
//! let lens = IngestLens::new(&db);
//!
//! let report = lens.ingest_source(
//!     &IngestSource::Registry(Registry::Apnic),
//!     &IngestArgs::default(),
//!     None,
//! )?;
//! for entry in report.reconciliation() {
//!     println!("{}: declared {}, decoded {}", entry.record_type, entry.declared, entry.decoded);
//! }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod lens;

// =============================================================================
// Configuration
// =============================================================================

pub use config::RirstatsConfig;
pub use config::{format_size, get_sqlite_info, SqliteDatabaseInfo};

// =============================================================================
// Database
// =============================================================================

pub use database::{DatabaseConn, RirstatsDatabase, SchemaManager, SchemaStatus, SCHEMA_VERSION};

// =============================================================================
// Ingest
// =============================================================================

pub use error::{DecodeError, IngestError};
pub use lens::delegated::{
    IngestArgs, IngestLens, IngestProgress, IngestProgressCallback, IngestReport, IngestSource,
    IngestStage,
};
pub use lens::utils::OutputFormat;
