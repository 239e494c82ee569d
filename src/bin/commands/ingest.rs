use anyhow::{anyhow, Result};
use clap::Args;
use rirstats::database::RirstatsDatabase;
use rirstats::lens::delegated::{
    IngestArgs, IngestLens, IngestProgress, IngestProgressCallback, IngestReport, IngestSource,
    Registry,
};
use rirstats::lens::utils::OutputFormat;
use rirstats::RirstatsConfig;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tabled::Tabled;

/// Arguments for the Ingest command
#[derive(Args)]
pub struct IngestCommandArgs {
    /// Registries whose latest published file is imported
    #[clap(value_enum)]
    pub registries: Vec<Registry>,

    /// Import the latest files of all five registries
    #[clap(long, conflicts_with = "registries")]
    pub all: bool,

    /// Local file to import, optionally gzip or bzip2 compressed (repeatable)
    #[clap(long, value_name = "PATH")]
    pub file: Vec<String>,

    /// URL to download and import (repeatable)
    #[clap(long, value_name = "URL")]
    pub url: Vec<String>,

    #[clap(flatten)]
    pub ingest: IngestArgs,

    /// Do not show the progress spinner
    #[clap(long)]
    pub no_progress: bool,
}

impl IngestCommandArgs {
    fn sources(&self) -> Vec<IngestSource> {
        let mut sources = if self.all {
            IngestSource::all()
        } else {
            self.registries
                .iter()
                .copied()
                .map(IngestSource::Registry)
                .collect()
        };
        sources.extend(self.file.iter().cloned().map(IngestSource::File));
        sources.extend(self.url.iter().cloned().map(IngestSource::Download));
        sources
    }
}

#[derive(Serialize)]
struct SourceResult {
    source: IngestSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<IngestReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Tabled, Serialize)]
struct ReportRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Lines")]
    lines: u64,
    #[tabled(rename = "IPv4")]
    ipv4: u64,
    #[tabled(rename = "IPv6")]
    ipv6: u64,
    #[tabled(rename = "ASN")]
    asn: u64,
    #[tabled(rename = "Invalid")]
    invalid: u64,
    #[tabled(rename = "Inserted")]
    inserted: u64,
    #[tabled(rename = "Duplicate")]
    duplicates: u64,
    #[tabled(rename = "Failed")]
    failed: u64,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Tabled, Serialize)]
struct ReconciliationRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Type")]
    record_type: String,
    #[tabled(rename = "Declared")]
    declared: u64,
    #[tabled(rename = "Decoded")]
    decoded: u64,
    #[tabled(rename = "Delta")]
    delta: i64,
}

fn report_row(source: &IngestSource, result: &Result<IngestReport>) -> ReportRow {
    let mut row = ReportRow {
        source: source.to_string(),
        serial: "-".to_string(),
        lines: 0,
        ipv4: 0,
        ipv6: 0,
        asn: 0,
        invalid: 0,
        inserted: 0,
        duplicates: 0,
        failed: 0,
        status: String::new(),
    };

    match result {
        Ok(report) => {
            if let Some(serial) = report.serial() {
                row.serial = serial.to_string();
            }
            row.lines = report.lines_seen;
            row.ipv4 = report.ipv4;
            row.ipv6 = report.ipv6;
            row.asn = report.asn;
            row.invalid = report.invalid;
            row.inserted = report.inserted;
            row.duplicates = report.duplicates;
            row.failed = report.failed;
            row.status = if report.descriptor.is_none() {
                "no header".to_string()
            } else if report.has_mismatch() {
                "count mismatch".to_string()
            } else {
                "ok".to_string()
            };
        }
        Err(e) => row.status = format!("failed: {}", e),
    }
    row
}

fn spinner_callback(pb: &indicatif::ProgressBar) -> IngestProgressCallback {
    let pb = pb.clone();
    Arc::new(move |progress| match progress {
        IngestProgress::Started { source } => pb.set_message(format!("reading {}", source)),
        IngestProgress::Stage { stage } => pb.set_message(format!("{:?}", stage)),
        IngestProgress::Update {
            lines_processed,
            invalid,
            rate,
            ..
        } => {
            let rate = rate.map(|r| format!(", {:.0} lines/s", r)).unwrap_or_default();
            pb.set_message(format!(
                "processed {} lines ({} invalid{})",
                lines_processed, invalid, rate
            ));
        }
        IngestProgress::Completed {
            lines_processed,
            duration_secs,
            ..
        } => pb.set_message(format!(
            "done: {} lines in {:.2}s",
            lines_processed, duration_secs
        )),
    })
}

pub fn run(config: &RirstatsConfig, args: IngestCommandArgs, output_format: OutputFormat) -> Result<()> {
    let sources = args.sources();
    if sources.is_empty() {
        return Err(anyhow!(
            "no source given: name registries, or use --all, --file or --url"
        ));
    }

    let ingest_args = IngestArgs {
        force: args.ingest.force || config.force,
        invalid_header_ok: args.ingest.invalid_header_ok || config.invalid_header_ok,
    };

    let db = RirstatsDatabase::open_in_dir(&config.data_dir)?;
    let lens = IngestLens::new(&db);

    let pb = if args.no_progress {
        None
    } else {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    };
    let callback = pb.as_ref().map(spinner_callback);

    let results = lens.ingest_sources(&sources, &ingest_args, callback);

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let failures = results.iter().filter(|(_, r)| r.is_err()).count();

    if output_format.is_json() {
        let json: Vec<SourceResult> = results
            .into_iter()
            .map(|(source, result)| match result {
                Ok(report) => SourceResult {
                    source,
                    report: Some(report),
                    error: None,
                },
                Err(e) => SourceResult {
                    source,
                    report: None,
                    error: Some(format!("{:#}", e)),
                },
            })
            .collect();
        println!("{}", output_format.to_json(&json)?);
    } else {
        let rows: Vec<ReportRow> = results.iter().map(|(s, r)| report_row(s, r)).collect();
        println!("{}", output_format.render_rows(&rows)?);

        let reconciliation: Vec<ReconciliationRow> = results
            .iter()
            .filter_map(|(source, result)| Some((source, result.as_ref().ok()?)))
            .flat_map(|(source, report)| {
                report
                    .reconciliation()
                    .into_iter()
                    .map(move |entry| ReconciliationRow {
                        source: source.to_string(),
                        record_type: entry.record_type.to_string(),
                        declared: entry.declared,
                        decoded: entry.decoded,
                        delta: entry.delta(),
                    })
            })
            .collect();
        if !reconciliation.is_empty() {
            println!("{}", output_format.render_rows(&reconciliation)?);
        }
    }

    if failures > 0 {
        return Err(anyhow!("{} of {} sources failed", failures, sources.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> IngestCommandArgs {
        IngestCommandArgs {
            registries: vec![],
            all: false,
            file: vec![],
            url: vec![],
            ingest: IngestArgs::default(),
            no_progress: true,
        }
    }

    #[test]
    fn test_sources_order() {
        let mut a = args();
        a.registries = vec![Registry::Ripencc];
        a.file = vec!["local.txt".to_string()];
        a.url = vec!["https://example.net/delegated".to_string()];

        assert_eq!(
            a.sources(),
            vec![
                IngestSource::Registry(Registry::Ripencc),
                IngestSource::File("local.txt".to_string()),
                IngestSource::Download("https://example.net/delegated".to_string()),
            ]
        );
    }

    #[test]
    fn test_all_sources() {
        let mut a = args();
        a.all = true;
        assert_eq!(a.sources().len(), 5);
        assert!(args().sources().is_empty());
    }

    #[test]
    fn test_failed_row() {
        let source = IngestSource::Registry(Registry::Afrinic);
        let row = report_row(&source, &Err(anyhow!("boom")));
        assert_eq!(row.status, "failed: boom");
        assert_eq!(row.serial, "-");
    }
}
