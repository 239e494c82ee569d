//! Delegated statistics lens
//!
//! Imports RIR delegated statistics files into the rirstats database. A run
//! reads the file header, stores the dataset and its declared counts, then
//! streams every remaining line through the record decoder and stores each
//! record under its natural key.
//!
//! ```text
//! Start -> HeaderParsed -> DatasetPersisted -> SummariesPersisted -> StreamingRecords -> Finished
//! ```
//!
//! A run aborts only before streaming starts: on a missing or malformed header
//! (unless tolerated), on a dataset that is already stored (unless forced), or
//! when the dataset cannot be stored or found. Bad record lines are counted and
//! skipped.
//!
//! # Example
//!
//! ```rust,ignore
//! use rirstats::database::RirstatsDatabase;
//! use rirstats::lens::delegated::{IngestArgs, IngestLens};
//!
//! let db = RirstatsDatabase::open_in_dir("~/.rirstats")?;
//! let lens = IngestLens::new(&db);
//! let file = std::io::BufReader::new(std::fs::File::open("delegated-apnic-extended-latest")?);
//! let report = lens.ingest(file, &IngestArgs::default())?;
//! println!("{} ipv4, {} ipv6, {} asn", report.ipv4, report.ipv6, report.asn);
//! ```

pub mod args;
pub mod classify;
pub mod header;
pub mod reader;
pub mod record;
pub mod report;
pub mod types;

pub use args::{IngestArgs, IngestSource};
pub use classify::{classify, LineKind};
pub use header::{parse_header, parse_summary_line, parse_version_line, HeaderOutcome};
pub use reader::LineReader;
pub use record::decode;
pub use report::{IngestReport, Reconciliation};
pub use types::{
    parse_stats_date, unknown_date, DatasetDescriptor, DelegatedRecord, LifecycleState,
    RecordType, Registry, Resource,
};

use crate::database::{DatasetRef, InsertOutcome, RirstatsDatabase};
use crate::error::IngestError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

// =============================================================================
// Progress Tracking Types
// =============================================================================

/// Progress update interval, in streamed lines
pub const PROGRESS_INTERVAL: u64 = 5_000;

/// Phase of an ingest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestStage {
    ParsingHeader,
    PersistingDataset,
    PersistingSummaries,
    StreamingRecords,
}

/// Progress information for ingest runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IngestProgress {
    /// Ingest has started
    Started {
        /// Path, URL or label of the stream
        source: String,
    },
    /// A new phase was entered
    Stage { stage: IngestStage },
    /// Emitted every PROGRESS_INTERVAL streamed lines
    Update {
        lines_processed: u64,
        invalid: u64,
        /// Lines per second (if available)
        #[serde(skip_serializing_if = "Option::is_none")]
        rate: Option<f64>,
        elapsed_secs: f64,
    },
    /// Ingest has completed
    Completed {
        lines_processed: u64,
        duration_secs: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        rate: Option<f64>,
    },
}

/// Type alias for progress callback function
pub type IngestProgressCallback = Arc<dyn Fn(IngestProgress) + Send + Sync>;

fn rate(count: u64, elapsed_secs: f64) -> Option<f64> {
    (elapsed_secs > 0.0).then(|| count as f64 / elapsed_secs)
}

// =============================================================================
// Lens
// =============================================================================

/// Lens importing delegated files into a rirstats database
pub struct IngestLens<'a> {
    db: &'a RirstatsDatabase,
}

impl<'a> IngestLens<'a> {
    pub fn new(db: &'a RirstatsDatabase) -> Self {
        Self { db }
    }

    /// Import one delegated file from a buffered reader
    pub fn ingest<R: BufRead>(&self, reader: R, args: &IngestArgs) -> Result<IngestReport> {
        self.ingest_with_progress(reader, "<stream>", args, None)
    }

    /// Import one delegated file, reporting progress through `callback`
    ///
    /// `source` only labels the run in progress events.
    pub fn ingest_with_progress<R: BufRead>(
        &self,
        reader: R,
        source: &str,
        args: &IngestArgs,
        callback: Option<IngestProgressCallback>,
    ) -> Result<IngestReport> {
        let notify = |progress: IngestProgress| {
            if let Some(ref cb) = callback {
                cb(progress);
            }
        };

        notify(IngestProgress::Started {
            source: source.to_string(),
        });
        let start_time = Instant::now();
        let mut lines = LineReader::new(reader);
        let mut report = IngestReport::default();

        notify(IngestProgress::Stage {
            stage: IngestStage::ParsingHeader,
        });
        let (dataset, mut pending) = match parse_header(&mut lines, args.invalid_header_ok)? {
            HeaderOutcome::Parsed(descriptor) => {
                notify(IngestProgress::Stage {
                    stage: IngestStage::PersistingDataset,
                });
                let id = self.persist_dataset(&descriptor, args.force)?;

                notify(IngestProgress::Stage {
                    stage: IngestStage::PersistingSummaries,
                });
                self.persist_summaries(id, &descriptor);

                let dataset = DatasetRef {
                    id,
                    end_date: descriptor.end_date,
                };
                report.dataset_id = Some(id);
                report.descriptor = Some(descriptor);
                (Some(dataset), None)
            }
            HeaderOutcome::Tolerated { pending } => (None, pending),
        };

        notify(IngestProgress::Stage {
            stage: IngestStage::StreamingRecords,
        });
        loop {
            let line = match pending.take() {
                Some(line) => line,
                None => match lines.next() {
                    Some(line) => line?,
                    None => break,
                },
            };
            let line_number = lines.lines_read();

            if matches!(classify(&line), LineKind::Comment | LineKind::Blank) {
                trace!("line {}: skipping comment", line_number);
                continue;
            }
            report.lines_processed += 1;

            match decode(&line) {
                Ok(record) => {
                    report.count_decoded(record.record_type());
                    self.persist_record(&record, dataset, args.force, line_number, &mut report);
                }
                Err(e) => {
                    report.invalid += 1;
                    warn!("line {}: invalid record ({}): {}", line_number, e, line);
                }
            }

            if report.lines_processed.is_multiple_of(PROGRESS_INTERVAL) {
                let elapsed = start_time.elapsed().as_secs_f64();
                info!(
                    "processed {} lines ({} ipv4, {} ipv6, {} asn, {} invalid)",
                    report.lines_processed, report.ipv4, report.ipv6, report.asn, report.invalid
                );
                notify(IngestProgress::Update {
                    lines_processed: report.lines_processed,
                    invalid: report.invalid,
                    rate: rate(report.lines_processed, elapsed),
                    elapsed_secs: elapsed,
                });
            }
        }

        report.lines_seen = lines.lines_read();
        report.duration_secs = start_time.elapsed().as_secs_f64();

        info!(
            "ingest finished: {} lines, {} ipv4, {} ipv6, {} asn, {} invalid, {} inserted, {} duplicate, {} failed",
            report.lines_seen,
            report.ipv4,
            report.ipv6,
            report.asn,
            report.invalid,
            report.inserted,
            report.duplicates,
            report.failed
        );
        report.log_mismatches();

        notify(IngestProgress::Completed {
            lines_processed: report.lines_processed,
            duration_secs: report.duration_secs,
            rate: rate(report.lines_processed, report.duration_secs),
        });

        Ok(report)
    }

    /// Open a source with oneio and import it
    #[cfg(feature = "fetch")]
    pub fn ingest_source(
        &self,
        source: &IngestSource,
        args: &IngestArgs,
        callback: Option<IngestProgressCallback>,
    ) -> Result<IngestReport> {
        let location = source.location(self.db)?;
        info!("ingesting {} from {}", source, location);

        let reader = oneio::get_reader(&location)
            .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", location, e))?;
        self.ingest_with_progress(std::io::BufReader::new(reader), &location, args, callback)
    }

    /// Import several sources one after another
    ///
    /// Each source runs in isolation; a failing source does not stop the rest.
    #[cfg(feature = "fetch")]
    pub fn ingest_sources(
        &self,
        sources: &[IngestSource],
        args: &IngestArgs,
        callback: Option<IngestProgressCallback>,
    ) -> Vec<(IngestSource, Result<IngestReport>)> {
        sources
            .iter()
            .map(|source| {
                let result = self.ingest_source(source, args, callback.clone());
                if let Err(e) = &result {
                    warn!("{} failed: {:#}", source, e);
                }
                (source.clone(), result)
            })
            .collect()
    }

    /// Store the dataset row and return its id
    ///
    /// An already stored dataset is fatal unless `force` is set, in which case
    /// the existing row is reused.
    fn persist_dataset(&self, descriptor: &DatasetDescriptor, force: bool) -> Result<i64> {
        let registry = descriptor.registry;
        let serial = descriptor.serial;

        match self.db.datasets().insert(descriptor)? {
            InsertOutcome::Inserted(id) => {
                info!("dataset {}/{} stored with id {}", registry, serial, id);
                Ok(id)
            }
            InsertOutcome::Duplicate if force => {
                warn!("dataset {}/{} already imported, re-importing", registry, serial);
                match self.db.datasets().find_id(registry, serial) {
                    Ok(Some(id)) => Ok(id),
                    Ok(None) => Err(IngestError::DatasetLookup {
                        registry,
                        serial,
                        reason: "no matching row".to_string(),
                    }
                    .into()),
                    Err(e) => Err(IngestError::DatasetLookup {
                        registry,
                        serial,
                        reason: e.to_string(),
                    }
                    .into()),
                }
            }
            InsertOutcome::Duplicate => Err(IngestError::DuplicateDataset { registry, serial }.into()),
        }
    }

    fn persist_summaries(&self, dataset_id: i64, descriptor: &DatasetDescriptor) {
        for record_type in RecordType::ALL {
            let count = descriptor.declared_count(record_type);
            match self
                .db
                .datasets()
                .insert_summary(dataset_id, record_type, count, descriptor.end_date)
            {
                Ok(InsertOutcome::Inserted(_)) => {
                    debug!("{} summary stored: {}", record_type, count)
                }
                Ok(InsertOutcome::Duplicate) => {
                    debug!("{} summary already stored for dataset {}", record_type, dataset_id)
                }
                Err(e) => warn!("{}", e),
            }
        }
    }

    fn persist_record(
        &self,
        record: &DelegatedRecord,
        dataset: Option<DatasetRef>,
        force: bool,
        line_number: u64,
        report: &mut IngestReport,
    ) {
        match self.db.records().insert(record, dataset) {
            Ok(InsertOutcome::Inserted(_)) => report.inserted += 1,
            Ok(InsertOutcome::Duplicate) => {
                report.duplicates += 1;
                if force {
                    debug!("line {}: {} record already stored", line_number, record.record_type());
                } else {
                    warn!(
                        "line {}: duplicate {} record skipped ({} {})",
                        line_number,
                        record.record_type(),
                        record.registry,
                        record.country_code
                    );
                }
            }
            Err(e) => {
                report.failed += 1;
                warn!("line {}: {}", line_number, e);
            }
        }
    }
}
