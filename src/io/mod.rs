//! I/O module
//!
//! Handles journal parsing and ledger output.
//!
//! # Components
//!
//! - `csv_format` - Journal record conversion and machine-readable output
//! - `sync_reader` - Synchronous journal reader with iterator interface
//! - `async_reader` - Asynchronous journal reader with batch reading interface
//! - `report` - Localized CSV reports with a byte order mark

pub mod async_reader;
pub mod csv_format;
pub mod report;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{
    convert_journal_record, write_installments_csv, write_transactions_csv, JournalRecord,
};
pub use report::{write_installment_report, write_transaction_report, ClientNames};
pub use sync_reader::SyncReader;
