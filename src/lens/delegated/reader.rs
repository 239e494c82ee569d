//! Line sequence over a byte stream
//!
//! Registries publish mostly ASCII, but a stray byte must not abort a run, so
//! lines are decoded lossily. Line terminators (`\n`, `\r\n`) are stripped.

use crate::error::IngestError;
use anyhow::Result;
use std::io::BufRead;

/// Iterator of lines read from a `BufRead`, counting every line it yields
pub struct LineReader<R> {
    reader: R,
    buf: Vec<u8>,
    lines_read: u64,
    failed: bool,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(256),
            lines_read: 0,
            failed: false,
        }
    }

    /// Number of lines yielded so far
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }
}

impl<R: BufRead> Iterator for LineReader<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.lines_read += 1;
                while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
                    self.buf.pop();
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(source) => {
                self.failed = true;
                Some(Err(IngestError::Read {
                    line_number: self.lines_read + 1,
                    source,
                }
                .into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, BufReader, Cursor, Read};

    #[test]
    fn test_lines_and_terminators() {
        let input = "a|b\r\nc|d\n\ne";
        let mut reader = LineReader::new(Cursor::new(input));
        let lines: Vec<String> = reader.by_ref().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["a|b", "c|d", "", "e"]);
        assert_eq!(reader.lines_read(), 4);
    }

    #[test]
    fn test_lossy_decoding() {
        let input: &[u8] = b"apnic|JP|ipv4|1.0.0.0|256|20110811|assigned|caf\xe9\n";
        let mut reader = LineReader::new(Cursor::new(input));
        let line = reader.next().unwrap().unwrap();
        assert!(line.starts_with("apnic|JP|ipv4"));
        assert!(line.ends_with('\u{FFFD}'));
    }

    struct FailingRead;

    impl Read for FailingRead {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("connection reset"))
        }
    }

    #[test]
    fn test_read_error_is_reported_once() {
        let mut reader = LineReader::new(BufReader::new(FailingRead));
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IngestError>(),
            Some(IngestError::Read { line_number: 1, .. })
        ));
        assert!(reader.next().is_none());
    }
}
