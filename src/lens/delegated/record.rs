//! Record line decoding
//!
//! ```text
//! registry|cc|type|start|value|date|status[|opaque-id[|extensions...]]
//! apnic|JP|ipv4|103.2.0.0|1024|20120101|allocated|A91872ED
//! ```
//!
//! The meaning of `start` and `value` depends on the record type: an IPv4
//! address and host count, an IPv6 address and prefix length, or an AS number
//! and the count of consecutive AS numbers.

use super::classify::{is_digits, split_fields};
use super::types::{parse_stats_date, DelegatedRecord, RecordType, Registry, Resource};
use crate::error::DecodeError;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Decode one record line
pub fn decode(line: &str) -> Result<DelegatedRecord, DecodeError> {
    let fields = split_fields(line);
    if fields.len() < 7 {
        return Err(DecodeError::TooFewFields(fields.len()));
    }

    let registry: Registry = fields[0]
        .parse()
        .map_err(|_| DecodeError::Registry(fields[0].to_string()))?;

    let country_code = fields[1];
    if !is_country_code(country_code) {
        return Err(DecodeError::CountryCode(country_code.to_string()));
    }

    let record_type: RecordType = fields[2]
        .parse()
        .map_err(|_| DecodeError::RecordType(fields[2].to_string()))?;

    let resource = decode_resource(record_type, fields[3], fields[4])?;
    let date = parse_stats_date(fields[5]).ok_or_else(|| DecodeError::Date(fields[5].to_string()))?;
    let state = fields[6]
        .parse()
        .map_err(|_| DecodeError::State(fields[6].to_string()))?;

    Ok(DelegatedRecord {
        registry,
        country_code: country_code.to_string(),
        resource,
        date,
        state,
        opaque_id: fields.get(7).map(|s| s.to_string()).unwrap_or_default(),
        extensions: fields.get(8..).map(|rest| rest.join("|")).unwrap_or_default(),
    })
}

/// Empty, or two characters starting with an uppercase letter (`JP`, `ZZ`, `EU`)
fn is_country_code(field: &str) -> bool {
    let mut chars = field.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (None, _, _) => true,
        (Some(first), Some(_), None) => first.is_ascii_uppercase(),
        _ => false,
    }
}

/// Dotted quad with decimal octets; leading zeros are accepted (`010.0.0.1`)
fn parse_ipv4(value: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut parts = value.split('.');
    for octet in octets.iter_mut() {
        let part = parts.next()?;
        if !is_digits(part) {
            return None;
        }
        let digits = part.trim_start_matches('0');
        *octet = if digits.is_empty() { 0 } else { digits.parse().ok()? };
    }
    if parts.next().is_some() {
        return None;
    }
    Some(Ipv4Addr::from(octets))
}

fn decode_resource(
    record_type: RecordType,
    value: &str,
    extra: &str,
) -> Result<Resource, DecodeError> {
    let bad_value = || DecodeError::Value {
        record_type,
        value: value.to_string(),
    };
    let bad_extra = || DecodeError::Extra {
        record_type,
        value: extra.to_string(),
    };
    if !is_digits(extra) {
        return Err(bad_extra());
    }

    match record_type {
        RecordType::Ipv4 => Ok(Resource::Ipv4 {
            start: parse_ipv4(value).ok_or_else(bad_value)?,
            count: extra.parse().map_err(|_| bad_extra())?,
        }),
        RecordType::Ipv6 => {
            let prefix_len: u8 = extra.parse().map_err(|_| bad_extra())?;
            if prefix_len > 128 {
                return Err(bad_extra());
            }
            Ok(Resource::Ipv6 {
                start: value.parse::<Ipv6Addr>().map_err(|_| bad_value())?,
                prefix_len,
            })
        }
        RecordType::Asn => {
            if !is_digits(value) {
                return Err(bad_value());
            }
            Ok(Resource::Asn {
                start: value.parse().map_err(|_| bad_value())?,
                count: extra.parse().map_err(|_| bad_extra())?,
            })
        }
    }
}
