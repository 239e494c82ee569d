//! Database schema management
//!
//! This module provides schema definitions and management for the rirstats database.
//! All tables are defined here to ensure consistency and enable cross-table queries.

use crate::lens::delegated::Registry;
use anyhow::{anyhow, Result};
use rusqlite::{params, Connection};

/// Current schema version
/// Increment this when making breaking schema changes
pub const SCHEMA_VERSION: u32 = 1;

/// Schema definitions for all tables in the rirstats database
pub struct SchemaDefinitions;

impl SchemaDefinitions {
    /// SQL for creating the meta table (tracks schema version and global metadata)
    pub const META_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS rirstats_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );
    "#;

    /// Static reference data, seeded on initialization
    pub const REGISTRIES_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS registries (
            short_name TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            latest_url TEXT NOT NULL
        );
    "#;

    pub const DATASETS_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS datasets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            registry TEXT NOT NULL REFERENCES registries(short_name),
            serial INTEGER NOT NULL,
            version TEXT NOT NULL,
            record_count INTEGER NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            utc_offset INTEGER NOT NULL,
            imported_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            UNIQUE (registry, serial)
        );
    "#;

    pub const SUMMARIES_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS summaries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            dataset_id INTEGER NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
            record_type TEXT NOT NULL,
            count INTEGER NOT NULL,
            summary_date TEXT NOT NULL,
            UNIQUE (dataset_id, record_type)
        );
    "#;

    /// IPv4 ranges: start address as unsigned 32-bit integer plus host count
    pub const RECORDS_IPV4_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS records_ipv4 (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            dataset_id INTEGER REFERENCES datasets(id) ON DELETE CASCADE,
            registry TEXT NOT NULL REFERENCES registries(short_name),
            country_code TEXT NOT NULL,
            start_address INTEGER NOT NULL,
            host_count INTEGER NOT NULL,
            date TEXT NOT NULL,
            state TEXT NOT NULL,
            opaque_id TEXT NOT NULL DEFAULT '',
            extensions TEXT NOT NULL DEFAULT '',
            import_date TEXT,
            UNIQUE (registry, country_code, start_address, host_count, date, state)
        );
    "#;

    /// IPv6 prefixes: 16-byte big-endian start address plus prefix length
    pub const RECORDS_IPV6_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS records_ipv6 (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            dataset_id INTEGER REFERENCES datasets(id) ON DELETE CASCADE,
            registry TEXT NOT NULL REFERENCES registries(short_name),
            country_code TEXT NOT NULL,
            start_address BLOB NOT NULL CHECK (length(start_address) = 16),
            prefix_length INTEGER NOT NULL CHECK (prefix_length BETWEEN 0 AND 128),
            date TEXT NOT NULL,
            state TEXT NOT NULL,
            opaque_id TEXT NOT NULL DEFAULT '',
            extensions TEXT NOT NULL DEFAULT '',
            import_date TEXT,
            UNIQUE (registry, country_code, start_address, prefix_length, date, state)
        );
    "#;

    /// AS number ranges: first ASN plus count of consecutive ASNs
    pub const RECORDS_ASN_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS records_asn (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            dataset_id INTEGER REFERENCES datasets(id) ON DELETE CASCADE,
            registry TEXT NOT NULL REFERENCES registries(short_name),
            country_code TEXT NOT NULL,
            start_asn INTEGER NOT NULL,
            asn_count INTEGER NOT NULL,
            date TEXT NOT NULL,
            state TEXT NOT NULL,
            opaque_id TEXT NOT NULL DEFAULT '',
            extensions TEXT NOT NULL DEFAULT '',
            import_date TEXT,
            UNIQUE (registry, country_code, start_asn, asn_count, date, state)
        );
    "#;

    pub const INDEXES: &'static [&'static str] = &[
        "CREATE INDEX IF NOT EXISTS idx_summaries_dataset ON summaries(dataset_id)",
        "CREATE INDEX IF NOT EXISTS idx_records_ipv4_dataset ON records_ipv4(dataset_id)",
        "CREATE INDEX IF NOT EXISTS idx_records_ipv4_start ON records_ipv4(start_address)",
        "CREATE INDEX IF NOT EXISTS idx_records_ipv6_dataset ON records_ipv6(dataset_id)",
        "CREATE INDEX IF NOT EXISTS idx_records_ipv6_start ON records_ipv6(start_address)",
        "CREATE INDEX IF NOT EXISTS idx_records_asn_dataset ON records_asn(dataset_id)",
        "CREATE INDEX IF NOT EXISTS idx_records_asn_start ON records_asn(start_asn)",
    ];

    /// Tables in creation order; dropped in reverse
    pub const TABLES: &'static [(&'static str, &'static str)] = &[
        ("registries", Self::REGISTRIES_TABLE),
        ("datasets", Self::DATASETS_TABLE),
        ("summaries", Self::SUMMARIES_TABLE),
        ("records_ipv4", Self::RECORDS_IPV4_TABLE),
        ("records_ipv6", Self::RECORDS_IPV6_TABLE),
        ("records_asn", Self::RECORDS_ASN_TABLE),
    ];
}

/// Schema manager for the rirstats database
///
/// Handles schema initialization, version checking, and resets.
pub struct SchemaManager<'a> {
    conn: &'a Connection,
}

impl<'a> SchemaManager<'a> {
    /// Create a new schema manager for the given connection
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Initialize the database schema
    ///
    /// Creates all tables and indexes if they don't exist, seeds the registry
    /// reference data and sets the schema version in the meta table.
    pub fn initialize(&self) -> Result<()> {
        self.conn
            .execute(SchemaDefinitions::META_TABLE, [])
            .map_err(|e| anyhow!("Failed to create meta table: {}", e))?;

        self.set_meta("schema_version", &SCHEMA_VERSION.to_string())?;

        for (name, sql) in SchemaDefinitions::TABLES {
            self.conn
                .execute(sql, [])
                .map_err(|e| anyhow!("Failed to create {} table: {}", name, e))?;
        }

        for index_sql in SchemaDefinitions::INDEXES {
            self.conn
                .execute(index_sql, [])
                .map_err(|e| anyhow!("Failed to create index: {}", e))?;
        }

        self.seed_registries()
    }

    fn seed_registries(&self) -> Result<()> {
        for registry in Registry::ALL {
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO registries (short_name, name, latest_url) VALUES (?1, ?2, ?3)",
                    params![registry.code(), registry.display_name(), registry.latest_url()],
                )
                .map_err(|e| anyhow!("Failed to seed registry {}: {}", registry, e))?;
        }
        Ok(())
    }

    /// Check the current schema status
    pub fn check_status(&self) -> Result<SchemaStatus> {
        if !self.table_exists("rirstats_meta") {
            return Ok(SchemaStatus::NotInitialized);
        }

        let current_version = self.get_schema_version()?;

        if current_version == SCHEMA_VERSION {
            if self.verify_integrity() {
                Ok(SchemaStatus::Current)
            } else {
                Ok(SchemaStatus::Corrupted)
            }
        } else if current_version < SCHEMA_VERSION {
            Ok(SchemaStatus::NeedsMigration {
                from: current_version,
                to: SCHEMA_VERSION,
            })
        } else {
            Ok(SchemaStatus::Incompatible {
                database_version: current_version,
                required_version: SCHEMA_VERSION,
            })
        }
    }

    /// Get the current schema version from the database
    fn get_schema_version(&self) -> Result<u32> {
        let version = self
            .get_meta("schema_version")?
            .unwrap_or_else(|| "0".to_string());

        version
            .parse()
            .map_err(|e| anyhow!("Invalid schema version: {}", e))
    }

    fn table_exists(&self, table: &str) -> bool {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [table],
                |row| row.get::<_, i32>(0),
            )
            .map(|count| count > 0)
            .unwrap_or(false)
    }

    /// Verify schema integrity by checking required tables exist
    fn verify_integrity(&self) -> bool {
        SchemaDefinitions::TABLES
            .iter()
            .all(|(name, _)| self.table_exists(name))
    }

    /// Set a metadata value
    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO rirstats_meta (key, value, updated_at) VALUES (?1, ?2, strftime('%s', 'now'))",
                [key, value],
            )
            .map_err(|e| anyhow!("Failed to set meta value: {}", e))?;
        Ok(())
    }

    /// Get a metadata value
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let result: Result<String, _> = self.conn.query_row(
            "SELECT value FROM rirstats_meta WHERE key = ?1",
            [key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(anyhow!("Failed to get meta value: {}", e)),
        }
    }

    /// Reset the database by dropping all tables
    pub fn reset(&self) -> Result<()> {
        for (name, _) in SchemaDefinitions::TABLES.iter().rev() {
            self.conn
                .execute(&format!("DROP TABLE IF EXISTS {}", name), [])
                .map_err(|e| anyhow!("Failed to drop {}: {}", name, e))?;
        }
        self.conn
            .execute("DROP TABLE IF EXISTS rirstats_meta", [])
            .map_err(|e| anyhow!("Failed to drop rirstats_meta: {}", e))?;

        Ok(())
    }
}

/// Status of the database schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaStatus {
    /// Database is not initialized (fresh database)
    NotInitialized,

    /// Schema is current and valid
    Current,

    /// Schema needs migration from an older version
    NeedsMigration { from: u32, to: u32 },

    /// Database is from a newer version (incompatible)
    Incompatible {
        database_version: u32,
        required_version: u32,
    },

    /// Schema is corrupted (missing tables)
    Corrupted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("PRAGMA foreign_keys=ON", []).unwrap();
        conn
    }

    #[test]
    fn test_schema_not_initialized() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);

        assert_eq!(
            manager.check_status().unwrap(),
            SchemaStatus::NotInitialized
        );
    }

    #[test]
    fn test_schema_initialize() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);

        manager.initialize().unwrap();
        assert_eq!(manager.check_status().unwrap(), SchemaStatus::Current);
        assert_eq!(manager.get_schema_version().unwrap(), SCHEMA_VERSION);

        let registries: i64 = conn
            .query_row("SELECT COUNT(*) FROM registries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(registries, 5);

        // initializing twice is harmless
        manager.initialize().unwrap();
        assert_eq!(manager.check_status().unwrap(), SchemaStatus::Current);
    }

    #[test]
    fn test_schema_corrupted() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);

        manager.initialize().unwrap();
        conn.execute("DROP TABLE records_asn", []).unwrap();
        assert_eq!(manager.check_status().unwrap(), SchemaStatus::Corrupted);
    }

    #[test]
    fn test_schema_older_version() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);

        manager.initialize().unwrap();
        manager.set_meta("schema_version", "0").unwrap();
        assert_eq!(
            manager.check_status().unwrap(),
            SchemaStatus::NeedsMigration {
                from: 0,
                to: SCHEMA_VERSION
            }
        );
    }

    #[test]
    fn test_meta_operations() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);

        manager.initialize().unwrap();

        manager.set_meta("test_key", "test_value").unwrap();
        let value = manager.get_meta("test_key").unwrap();
        assert_eq!(value, Some("test_value".to_string()));

        let missing = manager.get_meta("nonexistent").unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn test_schema_reset() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);

        manager.initialize().unwrap();
        assert_eq!(manager.check_status().unwrap(), SchemaStatus::Current);

        manager.reset().unwrap();
        assert_eq!(
            manager.check_status().unwrap(),
            SchemaStatus::NotInitialized
        );
    }
}
