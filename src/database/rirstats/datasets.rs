//! Dataset and summary repository
//!
//! A dataset row is created once per imported file header and is unique per
//! (registry, serial). Its summaries hold the per-type record counts the
//! registry declared in the header.

use crate::database::core::{insert_outcome, InsertOutcome};
use crate::lens::delegated::{DatasetDescriptor, RecordType, Registry};
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A persisted dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: i64,
    pub registry: String,
    pub serial: u64,
    pub version: String,
    pub record_count: u64,
    pub start_date: String,
    pub end_date: String,
    pub utc_offset: i32,
    pub imported_at: i64,
}

/// A persisted declared count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub dataset_id: i64,
    pub record_type: String,
    pub count: u64,
    pub summary_date: String,
}

/// Repository for datasets and their summaries
pub struct DatasetRepository<'a> {
    conn: &'a Connection,
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn to_sql_int(value: u64, what: &str) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("{} {} does not fit into the database", what, value))
}

impl<'a> DatasetRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a dataset; a dataset with the same (registry, serial) yields `Duplicate`
    pub fn insert(&self, descriptor: &DatasetDescriptor) -> Result<InsertOutcome> {
        let result = self.conn.execute(
            "INSERT INTO datasets (registry, serial, version, record_count, start_date, end_date, utc_offset)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                descriptor.registry.code(),
                to_sql_int(descriptor.serial, "serial")?,
                descriptor.version,
                to_sql_int(descriptor.record_count, "record count")?,
                format_date(descriptor.start_date),
                format_date(descriptor.end_date),
                descriptor.utc_offset,
            ],
        );

        insert_outcome(result, self.conn).map_err(|e| {
            anyhow!(
                "Failed to insert dataset {}/{}: {}",
                descriptor.registry,
                descriptor.serial,
                e
            )
        })
    }

    /// Id of the dataset with the given (registry, serial)
    pub fn find_id(&self, registry: Registry, serial: u64) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT id FROM datasets WHERE registry = ?1 AND serial = ?2",
                params![registry.code(), to_sql_int(serial, "serial")?],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| anyhow!("Failed to look up dataset {}/{}: {}", registry, serial, e))
    }

    /// Insert the declared count of one record type for a dataset
    pub fn insert_summary(
        &self,
        dataset_id: i64,
        record_type: RecordType,
        count: u64,
        summary_date: NaiveDate,
    ) -> Result<InsertOutcome> {
        let result = self.conn.execute(
            "INSERT INTO summaries (dataset_id, record_type, count, summary_date)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                dataset_id,
                record_type.code(),
                to_sql_int(count, "summary count")?,
                format_date(summary_date),
            ],
        );

        insert_outcome(result, self.conn)
            .map_err(|e| anyhow!("Failed to insert {} summary: {}", record_type, e))
    }

    /// Declared counts of a dataset
    pub fn summaries_for(&self, dataset_id: i64) -> Result<Vec<SummaryRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT dataset_id, record_type, count, summary_date
             FROM summaries WHERE dataset_id = ?1 ORDER BY record_type",
        )?;

        let rows = stmt
            .query_map([dataset_id], |row| {
                Ok(SummaryRecord {
                    dataset_id: row.get(0)?,
                    record_type: row.get(1)?,
                    count: row.get::<_, i64>(2)? as u64,
                    summary_date: row.get(3)?,
                })
            })
            .map_err(|e| anyhow!("Failed to query summaries: {}", e))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read summary row: {}", e))
    }

    /// All datasets, most recently imported first
    pub fn list(&self) -> Result<Vec<DatasetRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, registry, serial, version, record_count, start_date, end_date, utc_offset, imported_at
             FROM datasets ORDER BY id DESC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(DatasetRecord {
                    id: row.get(0)?,
                    registry: row.get(1)?,
                    serial: row.get::<_, i64>(2)? as u64,
                    version: row.get(3)?,
                    record_count: row.get::<_, i64>(4)? as u64,
                    start_date: row.get(5)?,
                    end_date: row.get(6)?,
                    utc_offset: row.get(7)?,
                    imported_at: row.get(8)?,
                })
            })
            .map_err(|e| anyhow!("Failed to list datasets: {}", e))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read dataset row: {}", e))
    }

    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM datasets", [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to get dataset count: {}", e))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::{DatabaseConn, SchemaManager};

    fn setup_test_db() -> DatabaseConn {
        let db = DatabaseConn::open_in_memory().unwrap();
        SchemaManager::new(&db.conn).initialize().unwrap();
        db
    }

    fn descriptor(serial: u64) -> DatasetDescriptor {
        DatasetDescriptor {
            version: "2".to_string(),
            registry: Registry::Apnic,
            serial,
            record_count: 3,
            start_date: NaiveDate::from_ymd_opt(1983, 6, 13).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2023, 10, 11).unwrap(),
            utc_offset: 10,
            ipv4_count: 1,
            ipv6_count: 1,
            asn_count: 1,
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = setup_test_db();
        let repo = DatasetRepository::new(&db.conn);

        let InsertOutcome::Inserted(id) = repo.insert(&descriptor(20231012)).unwrap() else {
            panic!("first insert should create a row");
        };
        assert_eq!(repo.find_id(Registry::Apnic, 20231012).unwrap(), Some(id));
        assert_eq!(repo.find_id(Registry::Apnic, 1).unwrap(), None);
        assert_eq!(repo.find_id(Registry::Arin, 20231012).unwrap(), None);

        let datasets = repo.list().unwrap();
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].start_date, "1983-06-13");
        assert_eq!(datasets[0].utc_offset, 10);
    }

    #[test]
    fn test_duplicate_dataset() {
        let db = setup_test_db();
        let repo = DatasetRepository::new(&db.conn);

        assert!(!repo.insert(&descriptor(7)).unwrap().is_duplicate());
        assert!(repo.insert(&descriptor(7)).unwrap().is_duplicate());
        assert!(!repo.insert(&descriptor(8)).unwrap().is_duplicate());
        assert_eq!(repo.count().unwrap(), 2);
    }

    #[test]
    fn test_summaries() {
        let db = setup_test_db();
        let repo = DatasetRepository::new(&db.conn);
        let InsertOutcome::Inserted(id) = repo.insert(&descriptor(1)).unwrap() else {
            panic!("insert failed");
        };
        let date = NaiveDate::from_ymd_opt(2023, 10, 11).unwrap();

        assert!(!repo
            .insert_summary(id, RecordType::Ipv4, 51235, date)
            .unwrap()
            .is_duplicate());
        assert!(repo
            .insert_summary(id, RecordType::Ipv4, 51235, date)
            .unwrap()
            .is_duplicate());
        repo.insert_summary(id, RecordType::Asn, 12045, date).unwrap();

        let summaries = repo.summaries_for(id).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].record_type, "asn");
        assert_eq!(summaries[1].count, 51235);
        assert_eq!(summaries[1].summary_date, "2023-10-11");
    }

    #[test]
    fn test_summary_requires_dataset() {
        let db = setup_test_db();
        let repo = DatasetRepository::new(&db.conn);
        let date = NaiveDate::from_ymd_opt(2023, 10, 11).unwrap();

        assert!(repo.insert_summary(42, RecordType::Ipv6, 1, date).is_err());
    }
}
