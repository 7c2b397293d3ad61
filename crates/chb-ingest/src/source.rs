//! Row source over the decoded export
//!
//! Wraps a CSV reader into a lazy, one-pass iterator of raw records. The
//! single header row is consumed by the reader; column-count enforcement is
//! the mapper's job, so the reader is configured flexible.

use std::io::Read;

use csv::{ReaderBuilder, StringRecord};
use tracing::warn;

/// Lazy iterator of raw rows from a decoded byte stream.
///
/// A row the CSV reader cannot tokenize is logged with its position and
/// skipped; it never ends the sequence. End of input ends the iterator
/// normally.
pub struct RowSource<R: Read> {
    reader: csv::Reader<R>,
    line: u64,
}

impl<R: Read> RowSource<R> {
    pub fn new(input: R) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(input);
        Self { reader, line: 0 }
    }
}

impl<R: Read> Iterator for RowSource<R> {
    type Item = StringRecord;

    fn next(&mut self) -> Option<StringRecord> {
        loop {
            let mut record = StringRecord::new();
            match self.reader.read_record(&mut record) {
                Ok(true) => {
                    self.line += 1;
                    return Some(record);
                },
                Ok(false) => return None,
                Err(err) => {
                    self.line += 1;
                    warn!(row = self.line, error = %err, "skipping unreadable row");
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn skips_exactly_one_header_row() {
        let data = "name,number\nACME,01\nBETA,02\n";
        let rows: Vec<_> = RowSource::new(Cursor::new(data)).collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "ACME");
        assert_eq!(&rows[1][1], "02");
    }

    #[test]
    fn empty_input_yields_nothing() {
        let rows: Vec<_> = RowSource::new(Cursor::new("")).collect();
        assert!(rows.is_empty());
    }

    #[test]
    fn header_only_input_yields_nothing() {
        let rows: Vec<_> = RowSource::new(Cursor::new("name,number\n")).collect();
        assert!(rows.is_empty());
    }

    #[test]
    fn ragged_rows_are_passed_through_not_rejected() {
        // Column-count policing belongs to the mapper.
        let data = "name,number\nACME,01,extra\nBETA\n";
        let rows: Vec<_> = RowSource::new(Cursor::new(data)).collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[1].len(), 1);
    }

    #[test]
    fn untokenizable_row_is_skipped_and_iteration_continues() {
        // Invalid UTF-8 in the middle row forces a reader error.
        let mut data = b"name,number\nACME,01\n".to_vec();
        data.extend_from_slice(b"BAD,\xff\xfe\n");
        data.extend_from_slice(b"BETA,02\n");

        let rows: Vec<_> = RowSource::new(Cursor::new(data)).collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "ACME");
        assert_eq!(&rows[1][0], "BETA");
    }

    #[test]
    fn quoted_fields_with_commas_stay_single_fields() {
        let data = "name,number\n\"ACME, INC\",01\n";
        let rows: Vec<_> = RowSource::new(Cursor::new(data)).collect();

        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "ACME, INC");
    }
}
