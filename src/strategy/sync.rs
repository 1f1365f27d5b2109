//! Synchronous processing strategy
//!
//! Streams the journal through [`SyncReader`] one row at a time and replays
//! each entry on a single-threaded [`LedgerEngine`].

use crate::cli::OutputKind;
use crate::core::LedgerEngine;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{write_output, ProcessingStrategy};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;

/// Synchronous processing strategy
///
/// ```no_run
/// use doula_ledger::cli::OutputKind;
/// use doula_ledger::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
///
/// let strategy = SyncProcessingStrategy::new(OutputKind::Transactions);
/// strategy
///     .process(Path::new("journal.csv"), &mut std::io::stdout())
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy {
    output_kind: OutputKind,
}

impl SyncProcessingStrategy {
    pub fn new(output_kind: OutputKind) -> Self {
        Self { output_kind }
    }
}

impl Default for SyncProcessingStrategy {
    fn default() -> Self {
        Self::new(OutputKind::Transactions)
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError> {
        let mut engine = LedgerEngine::new();
        let reader = SyncReader::new(input_path)?;

        let mut rejected = 0usize;
        for result in reader {
            match result {
                Ok(entry) => {
                    let op = entry.op_name();
                    let tx = entry.tx();
                    if let Err(e) = engine.process(entry) {
                        rejected += 1;
                        tracing::warn!(op, tx = ?tx, error = %e, "journal entry rejected");
                    }
                }
                Err(e) => {
                    rejected += 1;
                    tracing::warn!(error = %e, "skipping journal row");
                }
            }
        }
        tracing::info!(rejected, "journal replayed");

        write_output(
            self.output_kind,
            &engine.transactions(),
            &engine.installments(),
            output,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    const JOURNAL: &str = "op,tx,client,amount,installments,installment,kind,date\n\
                           open,1,1,100.00,2,,,2024-01-10\n\
                           pay,1,,,,,total,2024-01-15\n\
                           pay,1,,30,,,parcial,2024-02-15\n";

    #[test]
    fn test_sync_strategy_writes_transactions() {
        let file = create_temp_csv(JOURNAL);
        let mut output = Vec::new();

        SyncProcessingStrategy::new(OutputKind::Transactions)
            .process(file.path(), &mut output)
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "tx,client,kind,amount,installments,amount_received,outstanding\n\
             1,1,income,100.00,2,80.00,20.00\n"
        );
    }

    #[test]
    fn test_sync_strategy_writes_installments() {
        let file = create_temp_csv(JOURNAL);
        let mut output = Vec::new();

        SyncProcessingStrategy::new(OutputKind::Installments)
            .process(file.path(), &mut output)
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("1,1,1,2,50.00,50.00,pago,2024-01-10,2024-01-15"));
        assert!(text.contains("1,1,2,2,50.00,30.00,parcial,2024-02-10,"));
    }

    #[test]
    fn test_sync_strategy_continues_after_rejected_entries() {
        let file = create_temp_csv(
            "op,tx,client,amount,installments,installment,kind,date\n\
             pay,9,,,,,total,2024-01-15\n\
             open,1,1,abc,,,,2024-01-10\n\
             open,2,1,60,,,,2024-01-10\n\
             pay,2,,0,,,parcial,2024-01-15\n\
             pay,2,,60,,,parcial,2024-01-15\n",
        );
        let mut output = Vec::new();

        SyncProcessingStrategy::default()
            .process(file.path(), &mut output)
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.ends_with("2,1,income,60.00,1,60.00,0.00\n"));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let mut output = Vec::new();
        let result = SyncProcessingStrategy::default().process(Path::new("nonexistent.csv"), &mut output);
        assert!(matches!(result, Err(LedgerError::IoError { .. })));
    }

    #[test]
    fn test_sync_strategy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncProcessingStrategy>();
    }
}
