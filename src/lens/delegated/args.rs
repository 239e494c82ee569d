//! Ingest arguments
//!
//! Shared by the CLI (with clap derives when the `cli` feature is enabled) and
//! library callers (via serde).

use super::types::Registry;
use crate::database::RirstatsDatabase;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mode switches of an ingest run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct IngestArgs {
    /// Re-import datasets and records that are already stored
    #[cfg_attr(feature = "cli", clap(long))]
    #[serde(default)]
    pub force: bool,

    /// Keep going when the version line is missing or malformed; records are
    /// then stored without a dataset
    #[cfg_attr(feature = "cli", clap(long))]
    #[serde(default)]
    pub invalid_header_ok: bool,
}

/// Where the bytes of a delegated file come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum IngestSource {
    /// Local file, optionally gzip or bzip2 compressed
    File(String),
    /// Explicit download location
    Download(String),
    /// Latest published file of a registry
    Registry(Registry),
}

impl IngestSource {
    /// Every registry, in processing order
    pub fn all() -> Vec<IngestSource> {
        Registry::ALL.iter().copied().map(IngestSource::Registry).collect()
    }

    /// Path or URL to read from
    ///
    /// Registry locations come from the `registries` table so they can be
    /// pointed at mirrors.
    pub fn location(&self, db: &RirstatsDatabase) -> Result<String> {
        match self {
            IngestSource::File(path) => Ok(path.clone()),
            IngestSource::Download(url) => Ok(url.clone()),
            IngestSource::Registry(registry) => db.registries().latest_url(*registry),
        }
    }
}

impl fmt::Display for IngestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestSource::File(path) => write!(f, "file {}", path),
            IngestSource::Download(url) => write!(f, "download {}", url),
            IngestSource::Registry(registry) => write!(f, "registry {}", registry),
        }
    }
}
