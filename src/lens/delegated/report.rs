//! Ingest report and count reconciliation

use super::types::{DatasetDescriptor, RecordType, Registry};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Declared versus decoded count of one record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub record_type: RecordType,
    pub declared: u64,
    pub decoded: u64,
}

impl Reconciliation {
    /// `decoded - declared`; negative when lines are missing
    pub fn delta(&self) -> i64 {
        self.decoded as i64 - self.declared as i64
    }

    pub fn is_mismatch(&self) -> bool {
        self.declared != self.decoded
    }
}

/// Counters of one ingest run
///
/// `lines_seen` counts every line read, header included. `lines_processed`
/// counts the lines that went through the record decoder and always equals
/// `ipv4 + ipv6 + asn + invalid`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Parsed header; `None` when an invalid header was tolerated
    pub descriptor: Option<DatasetDescriptor>,
    /// Persisted dataset row
    pub dataset_id: Option<i64>,
    pub lines_seen: u64,
    pub lines_processed: u64,
    pub ipv4: u64,
    pub ipv6: u64,
    pub asn: u64,
    pub invalid: u64,
    pub inserted: u64,
    pub duplicates: u64,
    pub failed: u64,
    pub duration_secs: f64,
}

impl IngestReport {
    pub fn registry(&self) -> Option<Registry> {
        self.descriptor.as_ref().map(|d| d.registry)
    }

    pub fn serial(&self) -> Option<u64> {
        self.descriptor.as_ref().map(|d| d.serial)
    }

    /// Number of decoded records of a type, duplicates included
    pub fn decoded(&self, record_type: RecordType) -> u64 {
        match record_type {
            RecordType::Ipv4 => self.ipv4,
            RecordType::Ipv6 => self.ipv6,
            RecordType::Asn => self.asn,
        }
    }

    pub fn decoded_total(&self) -> u64 {
        self.ipv4 + self.ipv6 + self.asn
    }

    pub(crate) fn count_decoded(&mut self, record_type: RecordType) {
        match record_type {
            RecordType::Ipv4 => self.ipv4 += 1,
            RecordType::Ipv6 => self.ipv6 += 1,
            RecordType::Asn => self.asn += 1,
        }
    }

    /// Per-type reconciliation; empty without a parsed header
    pub fn reconciliation(&self) -> Vec<Reconciliation> {
        let Some(descriptor) = &self.descriptor else {
            return Vec::new();
        };
        RecordType::ALL
            .iter()
            .map(|&record_type| Reconciliation {
                record_type,
                declared: descriptor.declared_count(record_type),
                decoded: self.decoded(record_type),
            })
            .collect()
    }

    /// Declared record count and decoded total, when they differ
    pub fn total_mismatch(&self) -> Option<(u64, u64)> {
        let descriptor = self.descriptor.as_ref()?;
        let decoded = self.decoded_total();
        (descriptor.record_count != decoded).then_some((descriptor.record_count, decoded))
    }

    pub fn has_mismatch(&self) -> bool {
        self.reconciliation().iter().any(Reconciliation::is_mismatch)
            || self.total_mismatch().is_some()
    }

    /// Emit one warning per mismatching count
    pub fn log_mismatches(&self) {
        for entry in self.reconciliation().iter().filter(|e| e.is_mismatch()) {
            warn!(
                "{} count mismatch: declared {}, decoded {} (delta {:+})",
                entry.record_type,
                entry.declared,
                entry.decoded,
                entry.delta()
            );
        }
        if let Some((declared, decoded)) = self.total_mismatch() {
            warn!(
                "record count mismatch: header declares {}, decoded {}",
                declared, decoded
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::delegated::unknown_date;

    fn descriptor() -> DatasetDescriptor {
        DatasetDescriptor {
            version: "2".to_string(),
            registry: Registry::Lacnic,
            serial: 20231012,
            record_count: 5,
            start_date: unknown_date(),
            end_date: unknown_date(),
            utc_offset: -3,
            ipv4_count: 2,
            ipv6_count: 2,
            asn_count: 1,
        }
    }

    #[test]
    fn test_matching_counts() {
        let report = IngestReport {
            descriptor: Some(descriptor()),
            ipv4: 2,
            ipv6: 2,
            asn: 1,
            ..Default::default()
        };
        assert!(!report.has_mismatch());
        assert_eq!(report.reconciliation().len(), 3);
        assert_eq!(report.total_mismatch(), None);
    }

    #[test]
    fn test_mismatch() {
        let report = IngestReport {
            descriptor: Some(descriptor()),
            ipv4: 3,
            ipv6: 1,
            asn: 1,
            ..Default::default()
        };
        assert!(report.has_mismatch());
        // totals still agree
        assert_eq!(report.total_mismatch(), None);

        let deltas: Vec<i64> = report.reconciliation().iter().map(|e| e.delta()).collect();
        assert_eq!(deltas, vec![1, -1, 0]);
    }

    #[test]
    fn test_no_descriptor() {
        let report = IngestReport {
            ipv4: 10,
            ..Default::default()
        };
        assert!(report.reconciliation().is_empty());
        assert!(!report.has_mismatch());
        assert_eq!(report.registry(), None);
    }
}
