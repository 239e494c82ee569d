use anyhow::Result;
use rirstats::lens::utils::OutputFormat;
use rirstats::{format_size, get_sqlite_info, RirstatsConfig, SqliteDatabaseInfo};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ConfigInfo {
    config_file: String,
    data_dir: String,
    force: bool,
    invalid_header_ok: bool,
    verbosity: u8,
    database: SqliteDatabaseInfo,
}

fn count(value: Option<u64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn run(
    config: &RirstatsConfig,
    config_path: &Option<String>,
    output_format: OutputFormat,
) -> Result<()> {
    let info = ConfigInfo {
        config_file: RirstatsConfig::config_file_path(config_path),
        data_dir: config.data_dir.clone(),
        force: config.force,
        invalid_header_ok: config.invalid_header_ok,
        verbosity: config.verbosity,
        database: get_sqlite_info(config),
    };

    if output_format.is_json() {
        println!("{}", output_format.to_json(&info)?);
        return Ok(());
    }

    println!("Configuration:");
    println!("  Config file:        {}", info.config_file);
    for line in config.summary().lines() {
        println!("  {}", line);
    }

    let db = &info.database;
    println!();
    println!("Database:");
    println!("  Path:               {}", db.path);
    if !db.exists {
        println!("  Status:             not created yet");
        return Ok(());
    }
    if let Some(size) = db.size_bytes {
        println!("  Size:               {}", format_size(size));
    }
    match db.schema_version {
        Some(version) if db.schema_initialized => {
            println!("  Schema:             v{}", version)
        }
        _ => println!("  Schema:             not initialized"),
    }
    println!("  Datasets:           {}", count(db.dataset_count));
    println!("  IPv4 records:       {}", count(db.ipv4_count));
    println!("  IPv6 records:       {}", count(db.ipv6_count));
    println!("  ASN records:        {}", count(db.asn_count));
    Ok(())
}
