//! Header assembly for delegated files
//!
//! A delegated file starts with optional comments, then a version line
//! followed by up to three summary lines:
//!
//! ```text
//! 2|apnic|20231012|71344|19830613|20231011|+1000
//! apnic|*|asn|*|12045|summary
//! apnic|*|ipv4|*|51235|summary
//! apnic|*|ipv6|*|8064|summary
//! ```

use super::classify::{classify, split_fields, LineKind};
use super::types::{parse_stats_date, DatasetDescriptor, RecordType, Registry};
use crate::error::IngestError;
use anyhow::Result;
use tracing::{debug, trace, warn};

/// Number of lines following the version line that may carry summaries
pub const SUMMARY_LINES: usize = 3;

/// Result of reading the header of a delegated file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderOutcome {
    /// The version line matched; summary counts are filled in where present
    Parsed(DatasetDescriptor),
    /// The version line did not match and invalid headers are tolerated.
    /// `pending` holds the unmatched line so it can still be decoded as a record.
    Tolerated { pending: Option<String> },
}

/// Read the header from a line sequence
///
/// Leading comment and blank lines are skipped. A version line that does not
/// match is fatal unless `invalid_header_ok` is set.
pub fn parse_header<I>(lines: &mut I, invalid_header_ok: bool) -> Result<HeaderOutcome>
where
    I: Iterator<Item = Result<String>>,
{
    let mut version_line = None;
    for line in lines.by_ref() {
        let line = line?;
        match classify(&line) {
            LineKind::Comment | LineKind::Blank => {
                debug!("skipping header comment: {}", line.trim_end());
            }
            _ => {
                version_line = Some(line);
                break;
            }
        }
    }

    let Some(line) = version_line else {
        if invalid_header_ok {
            warn!("file header missing; continuing because invalid headers are tolerated");
            return Ok(HeaderOutcome::Tolerated { pending: None });
        }
        return Err(IngestError::MissingHeader.into());
    };

    let Some(mut descriptor) = parse_version_line(&line) else {
        if invalid_header_ok {
            warn!("file header corrupt; continuing because invalid headers are tolerated");
            return Ok(HeaderOutcome::Tolerated {
                pending: Some(line),
            });
        }
        return Err(IngestError::InvalidHeader { line }.into());
    };

    debug!(
        "version line parsed: version={} registry={} serial={} records={} start={} end={} utc_offset={}",
        descriptor.version,
        descriptor.registry,
        descriptor.serial,
        descriptor.record_count,
        descriptor.start_date,
        descriptor.end_date,
        descriptor.utc_offset
    );

    for line in lines.by_ref().take(SUMMARY_LINES) {
        let line = line?;
        match parse_summary_line(&line) {
            Some((record_type, count)) => {
                trace!("summary: {} = {}", record_type, count);
                descriptor.set_declared_count(record_type, count);
            }
            None => debug!("ignoring non-summary header line: {}", line.trim_end()),
        }
    }

    Ok(HeaderOutcome::Parsed(descriptor))
}

/// Parse `version|registry|serial|records|startdate|enddate|UTCoffset[|...]`
///
/// The offset is published in hundredths of hours (`+1000`, `-0400`) and is
/// truncated to whole hours.
pub fn parse_version_line(line: &str) -> Option<DatasetDescriptor> {
    if classify(line) != LineKind::VersionHeader {
        return None;
    }
    let fields = split_fields(line);

    let registry: Registry = fields[1].parse().ok()?;
    let serial: u64 = fields[2].parse().ok()?;
    let record_count: u64 = fields[3].parse().ok()?;
    let start_date = parse_stats_date(fields[4])?;
    let end_date = parse_stats_date(fields[5])?;

    Some(DatasetDescriptor {
        version: fields[0].to_string(),
        registry,
        serial,
        record_count,
        start_date,
        end_date,
        utc_offset: parse_utc_offset(fields[6]),
        ipv4_count: 0,
        ipv6_count: 0,
        asn_count: 0,
    })
}

fn parse_utc_offset(field: &str) -> i32 {
    let field = field.trim();
    if field.is_empty() {
        return 0;
    }
    match field.parse::<i32>() {
        Ok(hundredths) => hundredths / 100,
        Err(_) => {
            debug!("unparseable UTC offset '{}', using 0", field);
            0
        }
    }
}

/// Parse `registry|*|type|*|count|summary` into its record type and count
pub fn parse_summary_line(line: &str) -> Option<(RecordType, u64)> {
    if classify(line) != LineKind::SummaryLine {
        return None;
    }
    let fields = split_fields(line);
    let record_type: RecordType = fields[2].parse().ok()?;
    let count: u64 = fields[4].parse().ok()?;
    Some((record_type, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn lines(text: &str) -> impl Iterator<Item = Result<String>> + '_ {
        text.lines().map(|l| Ok(l.to_string()))
    }

    #[test]
    fn test_version_line_fields() {
        let descriptor =
            parse_version_line("2.3|apnic|20230101|3|20230101|20230101|900|").unwrap();
        assert_eq!(descriptor.version, "2.3");
        assert_eq!(descriptor.registry, Registry::Apnic);
        assert_eq!(descriptor.serial, 20230101);
        assert_eq!(descriptor.record_count, 3);
        assert_eq!(descriptor.utc_offset, 9);
        assert_eq!(
            descriptor.end_date,
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_version_line_normalizes_zero_start_date() {
        let descriptor =
            parse_version_line("2|arin|1697083200|195812|00000000|20231011|-0400").unwrap();
        assert_eq!(
            descriptor.start_date,
            NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
        );
        assert_eq!(descriptor.utc_offset, -4);
        assert_eq!(descriptor.serial, 1697083200);
    }

    #[test]
    fn test_version_line_offset_truncates() {
        let descriptor =
            parse_version_line("2|lacnic|20231012|100|20231012|20231011|-0330").unwrap();
        assert_eq!(descriptor.utc_offset, -3);
    }

    #[test]
    fn test_version_line_rejects() {
        assert!(parse_version_line("2|iana|1|1|20230101|20230101|0").is_none());
        assert!(parse_version_line("apnic|JP|ipv4|1.0.0.0|256|20110101|allocated").is_none());
        assert!(parse_version_line("2|apnic|20230101|3|20231399|20230101|0").is_none());
    }

    #[test]
    fn test_summary_line() {
        assert_eq!(
            parse_summary_line("apnic|*|ipv6|*|8064|summary"),
            Some((RecordType::Ipv6, 8064))
        );
        assert_eq!(parse_summary_line("apnic|*|ipv6|*|x|summary"), None);
        assert_eq!(parse_summary_line("apnic|*|ipv6|*|10|total"), None);
    }

    #[test]
    fn test_parse_header_with_comments() {
        let text = "# comment\n\n#another\n2|apnic|20231012|6|19830613|20231011|+1000\n\
                    apnic|*|asn|*|2|summary\napnic|*|ipv4|*|3|summary\napnic|*|ipv6|*|1|summary\n\
                    apnic|JP|ipv4|1.0.16.0|4096|20110412|allocated\n";
        let mut iter = lines(text);

        let HeaderOutcome::Parsed(descriptor) = parse_header(&mut iter, false).unwrap() else {
            panic!("header should parse");
        };
        assert_eq!(descriptor.asn_count, 2);
        assert_eq!(descriptor.ipv4_count, 3);
        assert_eq!(descriptor.ipv6_count, 1);
        assert_eq!(descriptor.utc_offset, 10);

        // the record line is left for the stream
        assert_eq!(
            iter.next().unwrap().unwrap(),
            "apnic|JP|ipv4|1.0.16.0|4096|20110412|allocated"
        );
    }

    #[test]
    fn test_parse_header_missing_summaries() {
        let text = "2|ripencc|1697068799|10|19830705|20231011|+0200\n\
                    ripencc|*|ipv4|*|7|summary\nripencc|EU|asn|7|1|19930901|allocated\n\
                    ripencc|EU|asn|28|1|19930901|allocated\nripencc|EU|asn|29|1|19930901|allocated\n";
        let mut iter = lines(text);

        let HeaderOutcome::Parsed(descriptor) = parse_header(&mut iter, false).unwrap() else {
            panic!("header should parse");
        };
        assert_eq!(descriptor.ipv4_count, 7);
        assert_eq!(descriptor.asn_count, 0);
        assert_eq!(descriptor.ipv6_count, 0);

        // exactly three lines were consumed after the version line
        assert_eq!(
            iter.next().unwrap().unwrap(),
            "ripencc|EU|asn|29|1|19930901|allocated"
        );
    }

    #[test]
    fn test_parse_header_invalid_strict() {
        let mut iter = lines("garbage\napnic|JP|ipv4|1.0.16.0|4096|20110412|allocated\n");
        let err = parse_header(&mut iter, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IngestError>(),
            Some(IngestError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_parse_header_invalid_tolerated() {
        let mut iter = lines("apnic|JP|ipv4|1.0.16.0|4096|20110412|allocated\n");
        let outcome = parse_header(&mut iter, true).unwrap();
        assert_eq!(
            outcome,
            HeaderOutcome::Tolerated {
                pending: Some("apnic|JP|ipv4|1.0.16.0|4096|20110412|allocated".to_string())
            }
        );
    }

    #[test]
    fn test_parse_header_empty_stream() {
        let mut iter = lines("# only comments\n");
        let err = parse_header(&mut iter, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IngestError>(),
            Some(IngestError::MissingHeader)
        ));

        let mut iter = lines("");
        assert_eq!(
            parse_header(&mut iter, true).unwrap(),
            HeaderOutcome::Tolerated { pending: None }
        );
    }
}
