//! Line classification for delegated files
//!
//! Classification is purely syntactic and looks at one line at a time. The
//! header assembler and record decoder do the actual field parsing.

use super::types::{LifecycleState, RecordType, Registry};
use serde::{Deserialize, Serialize};

/// Syntactic kind of a delegated file line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineKind {
    Comment,
    VersionHeader,
    SummaryLine,
    RecordLine,
    Blank,
    Unrecognized,
}

/// Classify one line
pub fn classify(line: &str) -> LineKind {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    if line.starts_with('#') {
        return LineKind::Comment;
    }

    let fields = split_fields(line);
    if is_version_line(&fields) {
        LineKind::VersionHeader
    } else if is_summary_line(&fields) {
        LineKind::SummaryLine
    } else if is_record_line(&fields) {
        LineKind::RecordLine
    } else {
        LineKind::Unrecognized
    }
}

/// Split a line on `|`, ignoring a trailing carriage return
pub(crate) fn split_fields(line: &str) -> Vec<&str> {
    line.trim_end_matches(['\r', '\n']).split('|').collect()
}

pub(crate) fn is_digits(field: &str) -> bool {
    !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit())
}

fn is_version_field(field: &str) -> bool {
    field.starts_with(|c: char| c.is_ascii_digit())
        && field.bytes().all(|b| b.is_ascii_digit() || b == b'.')
}

fn is_version_line(fields: &[&str]) -> bool {
    fields.len() >= 7
        && is_version_field(fields[0])
        && fields[1].parse::<Registry>().is_ok()
        && fields[2..6].iter().all(|f| is_digits(f))
}

fn is_summary_line(fields: &[&str]) -> bool {
    fields.len() >= 6
        && fields[0].parse::<Registry>().is_ok()
        && fields[1] == "*"
        && fields[2].parse::<RecordType>().is_ok()
        && fields[3] == "*"
        && is_digits(fields[4])
        && fields[5] == "summary"
}

fn is_record_line(fields: &[&str]) -> bool {
    fields.len() >= 7
        && fields[0].parse::<Registry>().is_ok()
        && fields[2].parse::<RecordType>().is_ok()
        && fields[6].parse::<LifecycleState>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_and_comment() {
        assert_eq!(classify(""), LineKind::Blank);
        assert_eq!(classify("\r"), LineKind::Blank);
        assert_eq!(classify("   "), LineKind::Blank);
        assert_eq!(classify("# APNIC statistics"), LineKind::Comment);
    }

    #[test]
    fn test_header_lines() {
        assert_eq!(
            classify("2|apnic|20231012|71344|19830613|20231011|+1000"),
            LineKind::VersionHeader
        );
        assert_eq!(
            classify("2.3|apnic|20230101|3|20230101|20230101|900|"),
            LineKind::VersionHeader
        );
        assert_eq!(
            classify("apnic|*|ipv4|*|51235|summary"),
            LineKind::SummaryLine
        );
    }

    #[test]
    fn test_record_lines() {
        assert_eq!(
            classify("apnic|JP|ipv4|103.2.0.0|1024|20120101|allocated"),
            LineKind::RecordLine
        );
        assert_eq!(
            classify("arin||ipv6|2001:400::|32|20240101|available|\r"),
            LineKind::RecordLine
        );
        // syntactic only: a bad address still looks like a record line
        assert_eq!(
            classify("ripencc|NL|ipv4|not-an-ip|256|20100101|assigned"),
            LineKind::RecordLine
        );
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(classify("iana|ZZ|ipv4|0.0.0.0|256||reserved"), LineKind::Unrecognized);
        assert_eq!(classify("apnic|JP|ipv4"), LineKind::Unrecognized);
        assert_eq!(classify("hello world"), LineKind::Unrecognized);
    }
}
