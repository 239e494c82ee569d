//! Delegated File Ingest Example
//!
//! Imports one delegated statistics file into an in-memory database and prints
//! the reconciliation of declared and decoded counts.
//!
//! # Running
//!
//! ```bash
//! cargo run --example ingest_file -- delegated-apnic-extended-latest
//! ```

use rirstats::database::RirstatsDatabase;
use rirstats::lens::delegated::{IngestArgs, IngestLens};
use std::io::BufReader;

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: ingest_file <PATH>"))?;

    let db = RirstatsDatabase::open_in_memory()?;
    let lens = IngestLens::new(&db);

    let file = BufReader::new(std::fs::File::open(&path)?);
    let report = lens.ingest(file, &IngestArgs::default())?;

    match (report.registry(), report.serial()) {
        (Some(registry), Some(serial)) => println!("{} serial {}", registry, serial),
        _ => println!("no valid header"),
    }
    println!(
        "{} lines processed, {} invalid, {} stored",
        report.lines_processed, report.invalid, report.inserted
    );
    for entry in report.reconciliation() {
        println!(
            "  {:<5} declared {:>8}  decoded {:>8}  delta {:+}",
            entry.record_type,
            entry.declared,
            entry.decoded,
            entry.delta()
        );
    }

    Ok(())
}
