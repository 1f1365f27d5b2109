//! Processing strategy module for journal replay
//!
//! A strategy is a complete pipeline: read the journal, replay it through an
//! engine, write the final ledger state. Synchronous and asynchronous batch
//! implementations can be selected at runtime and produce the same output.

use crate::cli::{OutputKind, StrategyType};
use crate::io::csv_format::{write_installments_csv, write_transactions_csv};
use crate::io::report::{write_installment_report, write_transaction_report, ClientNames};
use crate::types::{LedgerError, Payment, Transaction};
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete journal pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Replay the journal at `input_path` and write the result to `output`
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be opened or the output cannot
    /// be written. A rejected journal entry is logged and skipped; it never
    /// aborts processing.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError>;
}

/// Write the final ledger state in the requested shape
pub fn write_output(
    kind: OutputKind,
    transactions: &[Transaction],
    installments: &[Payment],
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    match kind {
        OutputKind::Transactions => write_transactions_csv(transactions, output),
        OutputKind::Installments => write_installments_csv(installments, output),
        OutputKind::Report => {
            write_transaction_report(transactions, &ClientNames::default(), output)?;
            Ok(())
        }
        OutputKind::InstallmentReport => {
            write_installment_report(installments, &ClientNames::default(), output)
        }
    }
}

/// Create a processing strategy
///
/// `config` only applies to the async strategy.
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
    output_kind: OutputKind,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(output_kind)),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config, output_kind))
        }
    }
}
