use anyhow::{anyhow, Result};
use config::Config;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::Level;

pub struct RirstatsConfig {
    /// Path to the directory holding the rirstats database
    pub data_dir: String,

    /// Tolerate duplicate datasets and records instead of failing
    pub force: bool,

    /// Continue without a dataset when the version line is missing or corrupt
    pub invalid_header_ok: bool,

    /// Diagnostic verbosity: 0 errors, 1 warnings, 2 progress, 3 debug, 4+ trace
    pub verbosity: u8,
}

const EMPTY_CONFIG: &str = r#"### rirstats configuration file

### directory for the rirstats database
# data_dir = "~/.rirstats"

### import behaviour
# force = false               # tolerate already imported datasets and records
# invalid_header_ok = false   # import records even if the version line is corrupt

### 0 - errors only; 1 - warnings; 2 - progress; 3 - debug; 4 - trace
# verbosity = 1
"#;

impl Default for RirstatsConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());

        Self {
            data_dir: format!("{}/.rirstats", home_dir),
            force: false,
            invalid_header_ok: false,
            verbosity: 1,
        }
    }
}

impl RirstatsConfig {
    /// Function to create and initialize a new configuration
    pub fn new(path: &Option<String>) -> Result<RirstatsConfig> {
        let mut builder = Config::builder();

        // By default use $HOME/.rirstats/rirstats.toml as the configuration file path
        let home_dir = dirs::home_dir()
            .ok_or_else(|| anyhow!("Could not find home directory"))?
            .to_str()
            .ok_or_else(|| anyhow!("Could not convert home directory path to string"))?
            .to_owned();

        let rirstats_dir = format!("{}/.rirstats", home_dir.as_str());

        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                std::fs::create_dir_all(rirstats_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create rirstats directory: {}", e))?;
                let p = format!("{}/rirstats.toml", rirstats_dir.as_str());
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                }
            }
        }

        // E.g., `RIRSTATS_FORCE=true rirstats ingest --all`
        builder = builder.add_source(config::Environment::with_prefix("RIRSTATS"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Self::from_map(&config, &rirstats_dir)
    }

    fn from_map(config: &HashMap<String, String>, default_dir: &str) -> Result<RirstatsConfig> {
        let data_dir = match config.get("data_dir") {
            Some(p) => expand_home(p),
            None => default_dir.to_string(),
        };
        std::fs::create_dir_all(data_dir.as_str())
            .map_err(|e| anyhow!("Unable to create data directory {}: {}", data_dir, e))?;

        let force = parse_flag(config, "force")?;
        let invalid_header_ok = parse_flag(config, "invalid_header_ok")?;

        let verbosity = match config.get("verbosity") {
            Some(v) => v
                .parse()
                .map_err(|e| anyhow!("Invalid verbosity '{}': {}", v, e))?,
            None => 1,
        };

        Ok(RirstatsConfig {
            data_dir,
            force,
            invalid_header_ok,
            verbosity,
        })
    }

    /// Get the path to the SQLite database file
    pub fn sqlite_path(&self) -> String {
        let data_dir = self.data_dir.trim_end_matches('/');
        format!("{}/{}", data_dir, crate::database::DATABASE_FILE_NAME)
    }

    /// Maximum tracing level for the configured verbosity
    pub fn log_level(&self) -> Level {
        verbosity_level(self.verbosity)
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        [
            format!("Data Directory:     {}", self.data_dir),
            format!("SQLite Path:        {}", self.sqlite_path()),
            format!("Force:              {}", self.force),
            format!("Invalid Header OK:  {}", self.invalid_header_ok),
            format!("Verbosity:          {}", self.verbosity),
        ]
        .join("\n")
    }

    /// Get the config file path, `path` when one was given on the command line
    pub fn config_file_path(path: &Option<String>) -> String {
        if let Some(p) = path {
            return p.clone();
        }
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| "~".to_string());
        format!("{}/.rirstats/rirstats.toml", home_dir)
    }

    /// Raise the configured verbosity by `count` levels
    pub fn raise_verbosity(&mut self, count: u8) {
        self.verbosity = self.verbosity.saturating_add(count);
    }
}

/// Map a verbosity count to the tracing level it enables
pub fn verbosity_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn parse_flag(config: &HashMap<String, String>, key: &str) -> Result<bool> {
    match config.get(key) {
        Some(v) => v
            .to_lowercase()
            .parse()
            .map_err(|_| anyhow!("Invalid value for {}: '{}'", key, v)),
        None => Ok(false),
    }
}

fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => format!("{}/{}", home.to_string_lossy(), rest),
        _ => path.to_string(),
    }
}

// =============================================================================
// Database Info (used by the config command)
// =============================================================================

/// Information about the SQLite database
#[derive(Debug, Serialize, Clone)]
pub struct SqliteDatabaseInfo {
    pub path: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    pub schema_initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn_count: Option<u64>,
}

/// Get SQLite database information
pub fn get_sqlite_info(config: &RirstatsConfig) -> SqliteDatabaseInfo {
    use crate::database::{RirstatsDatabase, SchemaManager, SchemaStatus};
    use crate::lens::delegated::RecordType;

    let sqlite_path = config.sqlite_path();
    let sqlite_exists = Path::new(&sqlite_path).exists();
    let size_bytes = if sqlite_exists {
        std::fs::metadata(&sqlite_path).ok().map(|m| m.len())
    } else {
        None
    };

    let mut info = SqliteDatabaseInfo {
        path: sqlite_path.clone(),
        exists: sqlite_exists,
        size_bytes,
        schema_initialized: false,
        schema_version: None,
        dataset_count: None,
        ipv4_count: None,
        ipv6_count: None,
        asn_count: None,
    };

    if !sqlite_exists {
        return info;
    }

    let Ok(db) = RirstatsDatabase::open(&sqlite_path) else {
        return info;
    };

    if let Ok(SchemaStatus::Current) = SchemaManager::new(db.connection()).check_status() {
        info.schema_initialized = true;
        info.schema_version = Some(crate::database::SCHEMA_VERSION);
        info.dataset_count = db.datasets().count().ok();
        info.ipv4_count = db.records().count(RecordType::Ipv4).ok();
        info.ipv6_count = db.records().count(RecordType::Ipv6).ok();
        info.asn_count = db.records().count(RecordType::Asn).ok();
    }

    info
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RirstatsConfig::default();
        assert!(!config.force);
        assert!(!config.invalid_header_ok);
        assert_eq!(config.verbosity, 1);
    }

    #[test]
    fn test_paths() {
        let config = RirstatsConfig {
            data_dir: "/test/dir/".to_string(),
            force: false,
            invalid_header_ok: false,
            verbosity: 1,
        };

        assert_eq!(config.sqlite_path(), "/test/dir/rirstats-data.sqlite3");
    }

    #[test]
    fn test_from_map() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data").to_string_lossy().to_string();

        let mut map = HashMap::new();
        map.insert("data_dir".to_string(), data_dir.clone());
        map.insert("force".to_string(), "True".to_string());
        map.insert("verbosity".to_string(), "3".to_string());

        let config = RirstatsConfig::from_map(&map, "/unused").unwrap();
        assert_eq!(config.data_dir, data_dir);
        assert!(config.force);
        assert!(!config.invalid_header_ok);
        assert_eq!(config.log_level(), Level::DEBUG);
        assert!(Path::new(&data_dir).exists());
    }

    #[test]
    fn test_from_map_rejects_bad_flag() {
        let mut map = HashMap::new();
        map.insert("force".to_string(), "sometimes".to_string());
        let dir = tempfile::tempdir().unwrap();
        let default_dir = dir.path().to_string_lossy().to_string();

        assert!(RirstatsConfig::from_map(&map, &default_dir).is_err());
    }

    #[test]
    fn test_config_file_path() {
        let given = Some("/etc/rirstats/custom.toml".to_string());
        assert_eq!(
            RirstatsConfig::config_file_path(&given),
            "/etc/rirstats/custom.toml"
        );
        assert!(RirstatsConfig::config_file_path(&None).ends_with("/.rirstats/rirstats.toml"));
    }

    #[test]
    fn test_raise_verbosity() {
        let mut config = RirstatsConfig::default();
        config.raise_verbosity(0);
        assert_eq!(config.log_level(), Level::WARN);

        config.raise_verbosity(1);
        assert_eq!(config.log_level(), Level::INFO);

        config.raise_verbosity(u8::MAX);
        assert_eq!(config.verbosity, u8::MAX);
        assert_eq!(config.log_level(), Level::TRACE);
    }

    #[test]
    fn test_verbosity_level() {
        assert_eq!(verbosity_level(0), Level::ERROR);
        assert_eq!(verbosity_level(1), Level::WARN);
        assert_eq!(verbosity_level(2), Level::INFO);
        assert_eq!(verbosity_level(9), Level::TRACE);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
    }
}
