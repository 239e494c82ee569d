//! Registry repository
//!
//! Read access to the static `registries` reference table.

use crate::lens::delegated::Registry;
use anyhow::{anyhow, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

/// A row of the `registries` table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "display", derive(tabled::Tabled))]
pub struct RegistryRecord {
    pub short_name: String,
    pub name: String,
    pub latest_url: String,
}

/// Repository for registry reference data
pub struct RegistryRepository<'a> {
    conn: &'a Connection,
}

impl<'a> RegistryRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// All registries ordered by short name
    pub fn list(&self) -> Result<Vec<RegistryRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT short_name, name, latest_url FROM registries ORDER BY short_name")?;

        let rows = stmt
            .query_map([], |row| {
                Ok(RegistryRecord {
                    short_name: row.get(0)?,
                    name: row.get(1)?,
                    latest_url: row.get(2)?,
                })
            })
            .map_err(|e| anyhow!("Failed to list registries: {}", e))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read registry row: {}", e))
    }

    /// Location of the latest delegated file of a registry
    pub fn latest_url(&self, registry: Registry) -> Result<String> {
        self.conn
            .query_row(
                "SELECT latest_url FROM registries WHERE short_name = ?1",
                [registry.code()],
                |row| row.get(0),
            )
            .map_err(|e| anyhow!("Failed to look up URL for registry {}: {}", registry, e))
    }
}
