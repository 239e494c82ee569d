//! Delegated statistics types
//!
//! This module defines the registries, record types and typed records shared by
//! the line parsers, the ingest pipeline and the database repositories.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

// =============================================================================
// Registry
// =============================================================================

/// A regional Internet registry publishing delegated statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Registry {
    Afrinic,
    Apnic,
    Arin,
    Lacnic,
    Ripencc,
}

impl Registry {
    /// All registries, in the order they are processed by `--all`
    pub const ALL: [Registry; 5] = [
        Registry::Afrinic,
        Registry::Apnic,
        Registry::Arin,
        Registry::Lacnic,
        Registry::Ripencc,
    ];

    /// Short code used in the delegated file format
    pub fn code(&self) -> &'static str {
        match self {
            Registry::Afrinic => "afrinic",
            Registry::Apnic => "apnic",
            Registry::Arin => "arin",
            Registry::Lacnic => "lacnic",
            Registry::Ripencc => "ripencc",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Registry::Afrinic => "African Network Information Centre",
            Registry::Apnic => "Asia-Pacific Network Information Centre",
            Registry::Arin => "American Registry for Internet Numbers",
            Registry::Lacnic => "Latin America and Caribbean Network Information Centre",
            Registry::Ripencc => "RIPE Network Coordination Centre",
        }
    }

    /// Well-known location of the latest extended delegated file
    pub fn latest_url(&self) -> &'static str {
        match self {
            Registry::Afrinic => {
                "https://ftp.afrinic.net/pub/stats/afrinic/delegated-afrinic-extended-latest"
            }
            Registry::Apnic => "https://ftp.apnic.net/stats/apnic/delegated-apnic-extended-latest",
            Registry::Arin => "https://ftp.arin.net/pub/stats/arin/delegated-arin-extended-latest",
            Registry::Lacnic => {
                "https://ftp.lacnic.net/pub/stats/lacnic/delegated-lacnic-extended-latest"
            }
            Registry::Ripencc => {
                "https://ftp.ripe.net/pub/stats/ripencc/delegated-ripencc-extended-latest"
            }
        }
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Registry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "afrinic" => Ok(Registry::Afrinic),
            "apnic" => Ok(Registry::Apnic),
            "arin" => Ok(Registry::Arin),
            "lacnic" => Ok(Registry::Lacnic),
            "ripencc" => Ok(Registry::Ripencc),
            _ => Err(format!("unknown registry '{}'", s)),
        }
    }
}

// =============================================================================
// Record type and lifecycle state
// =============================================================================

/// Kind of number resource a record line describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Ipv4,
    Ipv6,
    Asn,
}

impl RecordType {
    pub const ALL: [RecordType; 3] = [RecordType::Ipv4, RecordType::Ipv6, RecordType::Asn];

    pub fn code(&self) -> &'static str {
        match self {
            RecordType::Ipv4 => "ipv4",
            RecordType::Ipv6 => "ipv6",
            RecordType::Asn => "asn",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ipv4" => Ok(RecordType::Ipv4),
            "ipv6" => Ok(RecordType::Ipv6),
            "asn" => Ok(RecordType::Asn),
            _ => Err(format!("unknown record type '{}'", s)),
        }
    }
}

/// Registry disposition of a resource block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Available,
    Allocated,
    Assigned,
    Reserved,
}

impl LifecycleState {
    pub fn code(&self) -> &'static str {
        match self {
            LifecycleState::Available => "available",
            LifecycleState::Allocated => "allocated",
            LifecycleState::Assigned => "assigned",
            LifecycleState::Reserved => "reserved",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for LifecycleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(LifecycleState::Available),
            "allocated" => Ok(LifecycleState::Allocated),
            "assigned" => Ok(LifecycleState::Assigned),
            "reserved" => Ok(LifecycleState::Reserved),
            _ => Err(format!("unknown lifecycle state '{}'", s)),
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// Type-specific key of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Resource {
    /// IPv4 range given as start address and host count
    Ipv4 { start: Ipv4Addr, count: u32 },
    /// IPv6 range given as start address and prefix length
    Ipv6 { start: Ipv6Addr, prefix_len: u8 },
    /// Consecutive AS numbers starting at `start`
    Asn { start: u32, count: u16 },
}

impl Resource {
    pub fn record_type(&self) -> RecordType {
        match self {
            Resource::Ipv4 { .. } => RecordType::Ipv4,
            Resource::Ipv6 { .. } => RecordType::Ipv6,
            Resource::Asn { .. } => RecordType::Asn,
        }
    }
}

/// One allocation or assignment line of a delegated file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatedRecord {
    pub registry: Registry,
    /// ISO 3166 country code, empty for unassigned space in some registries
    pub country_code: String,
    pub resource: Resource,
    pub date: NaiveDate,
    pub state: LifecycleState,
    /// Opaque holder identifier (extended format only)
    pub opaque_id: String,
    /// Remaining extension fields, `|`-joined
    pub extensions: String,
}

impl DelegatedRecord {
    pub fn record_type(&self) -> RecordType {
        self.resource.record_type()
    }
}

// =============================================================================
// Dataset descriptor
// =============================================================================

/// Header information of one delegated file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    pub version: String,
    pub registry: Registry,
    pub serial: u64,
    /// Declared number of record lines
    pub record_count: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Offset from UTC in whole hours
    pub utc_offset: i32,
    pub ipv4_count: u64,
    pub ipv6_count: u64,
    pub asn_count: u64,
}

impl DatasetDescriptor {
    /// Declared summary count for a record type
    pub fn declared_count(&self, record_type: RecordType) -> u64 {
        match record_type {
            RecordType::Ipv4 => self.ipv4_count,
            RecordType::Ipv6 => self.ipv6_count,
            RecordType::Asn => self.asn_count,
        }
    }

    pub fn set_declared_count(&mut self, record_type: RecordType, count: u64) {
        match record_type {
            RecordType::Ipv4 => self.ipv4_count = count,
            RecordType::Ipv6 => self.ipv6_count = count,
            RecordType::Asn => self.asn_count = count,
        }
    }
}

// =============================================================================
// Dates
// =============================================================================

/// Date the registries use for "unknown": 1970-01-01
pub fn unknown_date() -> NaiveDate {
    NaiveDate::default()
}

/// Parse a `YYYYMMDD` field; empty or all-zero fields map to [`unknown_date`]
pub fn parse_stats_date(field: &str) -> Option<NaiveDate> {
    if field.is_empty() || field.bytes().all(|b| b == b'0') {
        return Some(unknown_date());
    }
    if field.len() != 8 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let year: i32 = field[0..4].parse().ok()?;
    let month: u32 = field[4..6].parse().ok()?;
    let day: u32 = field[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_codes_round_trip() {
        for registry in Registry::ALL {
            assert_eq!(registry.code().parse::<Registry>().unwrap(), registry);
            assert!(registry.latest_url().ends_with("-extended-latest"));
        }
        assert!("iana".parse::<Registry>().is_err());
    }

    #[test]
    fn test_parse_stats_date() {
        assert_eq!(
            parse_stats_date("20120101"),
            NaiveDate::from_ymd_opt(2012, 1, 1)
        );
        assert_eq!(
            parse_stats_date("00000000"),
            NaiveDate::from_ymd_opt(1970, 1, 1)
        );
        assert_eq!(parse_stats_date(""), NaiveDate::from_ymd_opt(1970, 1, 1));
        assert_eq!(parse_stats_date("20121301"), None);
        assert_eq!(parse_stats_date("2012011"), None);
        assert_eq!(parse_stats_date("2012-1-1"), None);
    }

    #[test]
    fn test_declared_counts() {
        let mut descriptor = DatasetDescriptor {
            version: "2".to_string(),
            registry: Registry::Arin,
            serial: 1,
            record_count: 0,
            start_date: unknown_date(),
            end_date: unknown_date(),
            utc_offset: 0,
            ipv4_count: 0,
            ipv6_count: 0,
            asn_count: 0,
        };
        descriptor.set_declared_count(RecordType::Ipv6, 42);
        assert_eq!(descriptor.declared_count(RecordType::Ipv6), 42);
        assert_eq!(descriptor.declared_count(RecordType::Ipv4), 0);
    }
}
