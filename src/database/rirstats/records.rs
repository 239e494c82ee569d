//! Record repository
//!
//! Records of the three types live in three tables that differ only in their
//! key columns. Each table is described by a [`RecordTable`] and the type
//! specific key is encoded by [`encode_key`], so a single insert path serves all
//! of them.
//!
//! # Key encoding
//!
//! | Table          | Key columns                      | Storage                     |
//! |----------------|----------------------------------|-----------------------------|
//! | `records_ipv4` | `start_address`, `host_count`    | u32 integer, integer        |
//! | `records_ipv6` | `start_address`, `prefix_length` | 16-byte big-endian blob, integer |
//! | `records_asn`  | `start_asn`, `asn_count`         | integer, integer            |

use super::datasets::format_date;
use crate::database::core::{insert_outcome, InsertOutcome};
use crate::lens::delegated::{
    DelegatedRecord, LifecycleState, RecordType, Registry, Resource,
};
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Storage layout of one record table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordTable {
    pub name: &'static str,
    /// Type-specific key columns: start of the range, then its size
    pub key_columns: [&'static str; 2],
}

impl RecordTable {
    pub const IPV4: RecordTable = RecordTable {
        name: "records_ipv4",
        key_columns: ["start_address", "host_count"],
    };
    pub const IPV6: RecordTable = RecordTable {
        name: "records_ipv6",
        key_columns: ["start_address", "prefix_length"],
    };
    pub const ASN: RecordTable = RecordTable {
        name: "records_asn",
        key_columns: ["start_asn", "asn_count"],
    };

    pub fn for_type(record_type: RecordType) -> RecordTable {
        match record_type {
            RecordType::Ipv4 => Self::IPV4,
            RecordType::Ipv6 => Self::IPV6,
            RecordType::Asn => Self::ASN,
        }
    }

    fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (dataset_id, registry, country_code, {}, {}, date, state, opaque_id, extensions, import_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            self.name, self.key_columns[0], self.key_columns[1]
        )
    }

    fn select_sql(&self) -> String {
        format!(
            "SELECT registry, country_code, {}, {}, date, state, opaque_id, extensions
             FROM {} ORDER BY id",
            self.key_columns[0], self.key_columns[1], self.name
        )
    }
}

/// Encode the type-specific key of a resource into its two column values
pub fn encode_key(resource: &Resource) -> (Value, Value) {
    match resource {
        Resource::Ipv4 { start, count } => (
            Value::Integer(i64::from(u32::from(*start))),
            Value::Integer(i64::from(*count)),
        ),
        Resource::Ipv6 { start, prefix_len } => (
            Value::Blob(start.octets().to_vec()),
            Value::Integer(i64::from(*prefix_len)),
        ),
        Resource::Asn { start, count } => (
            Value::Integer(i64::from(*start)),
            Value::Integer(i64::from(*count)),
        ),
    }
}

fn decode_key(record_type: RecordType, start: Value, size: i64) -> Option<Resource> {
    match (record_type, start) {
        (RecordType::Ipv4, Value::Integer(addr)) => Some(Resource::Ipv4 {
            start: Ipv4Addr::from(u32::try_from(addr).ok()?),
            count: u32::try_from(size).ok()?,
        }),
        (RecordType::Ipv6, Value::Blob(bytes)) => Some(Resource::Ipv6 {
            start: Ipv6Addr::from(<[u8; 16]>::try_from(bytes.as_slice()).ok()?),
            prefix_len: u8::try_from(size).ok()?,
        }),
        (RecordType::Asn, Value::Integer(asn)) => Some(Resource::Asn {
            start: u32::try_from(asn).ok()?,
            count: u16::try_from(size).ok()?,
        }),
        _ => None,
    }
}

/// Dataset a record is imported with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetRef {
    pub id: i64,
    /// End date of the dataset, stored as the record's import date
    pub end_date: NaiveDate,
}

/// Repository for the three record tables
pub struct RecordRepository<'a> {
    conn: &'a Connection,
}

impl<'a> RecordRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a record under its natural key
    ///
    /// A record with the same (registry, country code, key, date, state) yields
    /// `Duplicate`. Without a dataset the record is stored unattached.
    pub fn insert(
        &self,
        record: &DelegatedRecord,
        dataset: Option<DatasetRef>,
    ) -> Result<InsertOutcome> {
        let table = RecordTable::for_type(record.record_type());
        let (start, size) = encode_key(&record.resource);

        let mut stmt = self
            .conn
            .prepare_cached(&table.insert_sql())
            .map_err(|e| anyhow!("Failed to prepare insert into {}: {}", table.name, e))?;

        let result = stmt.execute(params![
            dataset.map(|d| d.id),
            record.registry.code(),
            record.country_code,
            start,
            size,
            format_date(record.date),
            record.state.code(),
            record.opaque_id,
            record.extensions,
            dataset.map(|d| format_date(d.end_date)),
        ]);

        insert_outcome(result, self.conn)
            .map_err(|e| anyhow!("Failed to insert into {}: {}", table.name, e))
    }

    /// Number of stored records of a type
    pub fn count(&self, record_type: RecordType) -> Result<u64> {
        let table = RecordTable::for_type(record_type);
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table.name), [], |row| {
                row.get(0)
            })
            .map_err(|e| anyhow!("Failed to count {}: {}", table.name, e))?;
        Ok(count as u64)
    }

    /// Number of records of a type first imported with a dataset
    pub fn count_for_dataset(&self, dataset_id: i64, record_type: RecordType) -> Result<u64> {
        let table = RecordTable::for_type(record_type);
        let count: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {} WHERE dataset_id = ?1", table.name),
                [dataset_id],
                |row| row.get(0),
            )
            .map_err(|e| anyhow!("Failed to count {}: {}", table.name, e))?;
        Ok(count as u64)
    }

    /// All stored records of a type in insertion order
    pub fn list(&self, record_type: RecordType) -> Result<Vec<DelegatedRecord>> {
        let table = RecordTable::for_type(record_type);
        let mut stmt = self.conn.prepare(&table.select_sql())?;

        let rows = stmt
            .query_map([], |row| Ok(read_record(record_type, row)))
            .map_err(|e| anyhow!("Failed to query {}: {}", table.name, e))?;

        let mut records = Vec::new();
        for row in rows {
            let record = row
                .map_err(|e| anyhow!("Failed to read {} row: {}", table.name, e))?
                .map_err(|e| anyhow!("Malformed {} row: {}", table.name, e))?;
            records.push(record);
        }
        Ok(records)
    }
}

fn read_record(record_type: RecordType, row: &Row<'_>) -> Result<DelegatedRecord> {
    let registry: String = row.get(0)?;
    let start: Value = row.get(2)?;
    let size: i64 = row.get(3)?;
    let date: String = row.get(4)?;
    let state: String = row.get(5)?;

    Ok(DelegatedRecord {
        registry: registry.parse::<Registry>().map_err(|e| anyhow!(e))?,
        country_code: row.get(1)?,
        resource: decode_key(record_type, start, size)
            .ok_or_else(|| anyhow!("invalid {} key", record_type))?,
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")?,
        state: state.parse::<LifecycleState>().map_err(|e| anyhow!(e))?,
        opaque_id: row.get(6)?,
        extensions: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::{DatabaseConn, SchemaManager};
    use crate::lens::delegated::unknown_date;

    fn setup_test_db() -> DatabaseConn {
        let db = DatabaseConn::open_in_memory().unwrap();
        SchemaManager::new(&db.conn).initialize().unwrap();
        db
    }

    fn record(resource: Resource) -> DelegatedRecord {
        DelegatedRecord {
            registry: Registry::Apnic,
            country_code: "JP".to_string(),
            resource,
            date: NaiveDate::from_ymd_opt(2012, 1, 1).unwrap(),
            state: LifecycleState::Allocated,
            opaque_id: String::new(),
            extensions: String::new(),
        }
    }

    #[test]
    fn test_encode_key() {
        let (start, size) = encode_key(&Resource::Ipv4 {
            start: Ipv4Addr::new(103, 2, 0, 0),
            count: 1024,
        });
        assert_eq!(start, Value::Integer(1728184320));
        assert_eq!(size, Value::Integer(1024));

        let (start, size) = encode_key(&Resource::Ipv4 {
            start: Ipv4Addr::new(255, 255, 255, 0),
            count: 256,
        });
        assert_eq!(start, Value::Integer(4294967040));
        assert_eq!(size, Value::Integer(256));

        let (start, _) = encode_key(&Resource::Ipv6 {
            start: "2001:db8::".parse().unwrap(),
            prefix_len: 32,
        });
        let mut expected = vec![0u8; 16];
        expected[..4].copy_from_slice(&[0x20, 0x01, 0x0d, 0xb8]);
        assert_eq!(start, Value::Blob(expected));
    }

    #[test]
    fn test_insert_and_list_all_types() {
        let db = setup_test_db();
        let repo = RecordRepository::new(&db.conn);

        let records = vec![
            record(Resource::Ipv4 {
                start: Ipv4Addr::new(103, 2, 0, 0),
                count: 1024,
            }),
            record(Resource::Ipv6 {
                start: "2001:db8::".parse().unwrap(),
                prefix_len: 32,
            }),
            record(Resource::Asn {
                start: 4200000000,
                count: 2,
            }),
        ];

        for r in &records {
            assert!(!repo.insert(r, None).unwrap().is_duplicate());
        }

        for (r, record_type) in records.iter().zip(RecordType::ALL) {
            assert_eq!(repo.count(record_type).unwrap(), 1);
            assert_eq!(&repo.list(record_type).unwrap()[0], r);
        }
    }

    #[test]
    fn test_natural_key_uniqueness() {
        let db = setup_test_db();
        let repo = RecordRepository::new(&db.conn);
        let base = record(Resource::Ipv4 {
            start: Ipv4Addr::new(1, 0, 16, 0),
            count: 4096,
        });

        assert!(!repo.insert(&base, None).unwrap().is_duplicate());
        assert!(repo.insert(&base, None).unwrap().is_duplicate());

        // opaque id is not part of the natural key
        let mut other_holder = base.clone();
        other_holder.opaque_id = "A92E1062".to_string();
        assert!(repo.insert(&other_holder, None).unwrap().is_duplicate());

        // state and date are
        let mut assigned = base.clone();
        assigned.state = LifecycleState::Assigned;
        assert!(!repo.insert(&assigned, None).unwrap().is_duplicate());

        let mut undated = base.clone();
        undated.date = unknown_date();
        assert!(!repo.insert(&undated, None).unwrap().is_duplicate());

        assert_eq!(repo.count(RecordType::Ipv4).unwrap(), 3);
    }

    #[test]
    fn test_dataset_reference() {
        let db = setup_test_db();
        let repo = RecordRepository::new(&db.conn);
        let r = record(Resource::Asn { start: 64512, count: 1 });

        // unknown dataset violates the foreign key, which is not a duplicate
        let missing = DatasetRef {
            id: 99,
            end_date: unknown_date(),
        };
        assert!(repo.insert(&r, Some(missing)).is_err());
        assert_eq!(repo.count_for_dataset(99, RecordType::Asn).unwrap(), 0);
    }
}
