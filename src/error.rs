//! Error types for delegated file ingestion.

use crate::lens::delegated::{RecordType, Registry};
use thiserror::Error;

/// Conditions that abort an ingest run.
///
/// Returned wrapped in `anyhow::Error`; use `downcast_ref::<IngestError>()` to
/// branch on the cause.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The version line did not match and invalid headers are not tolerated.
    #[error("invalid file header '{line}' and invalid headers are not tolerated")]
    InvalidHeader { line: String },

    /// The stream ended before a version line was found.
    #[error("stream contains no version line")]
    MissingHeader,

    /// The dataset was already imported and force mode is off.
    #[error("dataset {registry}/{serial} already imported (use force to re-import)")]
    DuplicateDataset { registry: Registry, serial: u64 },

    /// A duplicate dataset was reported but could not be found again.
    #[error("dataset {registry}/{serial} reported as duplicate but not found: {reason}")]
    DatasetLookup {
        registry: Registry,
        serial: u64,
        reason: String,
    },

    /// Reading the byte stream failed.
    #[error("failed to read line {line_number}: {source}")]
    Read {
        line_number: u64,
        #[source]
        source: std::io::Error,
    },
}

/// Reasons a record line is rejected by the decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("expected at least 7 fields, found {0}")]
    TooFewFields(usize),

    #[error("unknown registry '{0}'")]
    Registry(String),

    #[error("malformed country code '{0}'")]
    CountryCode(String),

    #[error("unknown record type '{0}'")]
    RecordType(String),

    #[error("malformed {record_type} value '{value}'")]
    Value {
        record_type: RecordType,
        value: String,
    },

    #[error("malformed {record_type} count '{value}'")]
    Extra {
        record_type: RecordType,
        value: String,
    },

    #[error("malformed date '{0}'")]
    Date(String),

    #[error("unknown state '{0}'")]
    State(String),
}
