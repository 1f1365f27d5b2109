//! Synchronous journal reader with iterator interface
//!
//! Streams journal entries from a CSV file one row at a time, delegating
//! format concerns to the csv_format module.
//!
//! ```no_run
//! use doula_ledger::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("journal.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(entry) => println!("{}", entry.op_name()),
//!         Err(e) => eprintln!("{}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Opening the file fails fast from `new()`
//! - A malformed row is yielded as an `Err` carrying its line number, and
//!   iteration continues with the next row

use crate::io::csv_format::{convert_journal_record, JournalRecord};
use crate::types::{JournalEntry, LedgerError};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous journal reader
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl SyncReader {
    /// Open a journal file
    ///
    /// Fields are trimmed and short rows are accepted, since most ops leave
    /// trailing columns empty.
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|e| LedgerError::IoError {
            message: format!("Failed to open file '{}': {}", path.display(), e),
        })?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<JournalEntry, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<JournalRecord>();
        let next = deserializer.next()?;
        self.line_num += 1;

        Some(match next {
            Ok(record) => convert_journal_record(record).map_err(|e| LedgerError::ParseError {
                line: Some(self.line_num),
                message: e.to_string(),
            }),
            Err(e) => Err(e.into()),
        })
    }
}
