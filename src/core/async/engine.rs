//! Journal processing for concurrent batch processing
//!
//! This module provides the `AsyncLedgerEngine`, the concurrent counterpart of
//! [`crate::core::LedgerEngine`]. It replays the same journal entries with the
//! same results, but every write goes through [`SharedLedger`], whose entry
//! locks make provisioning and payment application atomic.
//!
//! # Architecture
//!
//! ```text
//! AsyncLedgerEngine
//!     └── Arc<SharedLedger>  (transactions + installment rows, per-entry locks)
//! ```
//!
//! The engine is cheap to clone and can be shared across tokio tasks.

use std::sync::Arc;

use super::SharedLedger;
use crate::core::dialog::default_selection;
use crate::core::engine::{legacy_row, validate_open_amount};
use crate::types::{
    JournalEntry, LedgerError, Payment, PaymentRequest, ReconcileOutcome, Transaction,
    TransactionId,
};

/// Journal engine over a shared ledger
#[derive(Debug, Clone)]
pub struct AsyncLedgerEngine {
    ledger: Arc<SharedLedger>,
}

impl AsyncLedgerEngine {
    pub fn new(ledger: Arc<SharedLedger>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Arc<SharedLedger> {
        &self.ledger
    }

    /// Process a single journal entry
    ///
    /// Errors match [`crate::core::LedgerEngine::process`] entry for entry.
    pub fn process(&self, entry: JournalEntry) -> Result<(), LedgerError> {
        match entry {
            JournalEntry::Open {
                tx,
                client,
                kind,
                amount,
                installments,
                date,
            } => {
                validate_open_amount(tx, amount)?;
                self.ledger.record_transaction(Transaction::new(
                    tx,
                    kind,
                    amount,
                    installments,
                    date,
                    client,
                ))
            }
            JournalEntry::Legacy {
                client,
                installment_number,
                total_installments,
                amount,
                due_date,
            } => {
                self.ledger.record_legacy_installment(legacy_row(
                    client,
                    installment_number,
                    total_installments,
                    amount,
                    due_date,
                ))?;
                Ok(())
            }
            JournalEntry::Provision { tx } => {
                self.ledger.provision(tx)?;
                Ok(())
            }
            JournalEntry::Pay {
                tx,
                installment,
                kind,
                amount,
                date,
            } => {
                let transaction = self.open_dialog(tx)?;
                let (rows, _) = self.ledger.payable_rows(tx, transaction.client_id);
                let installment_id = match installment {
                    Some(number) => Some(select_number(&rows, number, tx)?),
                    None => default_selection(&rows),
                };
                let request = PaymentRequest {
                    transaction_id: Some(tx),
                    transaction_amount: transaction.amount,
                    transaction_installments: transaction.installments,
                    client_id: transaction.client_id,
                    installment_id,
                    kind,
                    partial_amount: amount,
                    payment_date: date,
                };
                let outcome = self.apply(&request)?;
                tracing::debug!(tx, mode = ?outcome.mode, applied = %outcome.applied, "payment reconciled");
                Ok(())
            }
        }
    }

    /// Apply a prepared payment request atomically
    pub fn apply(&self, request: &PaymentRequest) -> Result<ReconcileOutcome, LedgerError> {
        self.ledger.apply_payment(request)
    }

    /// Load the transaction and provision its rows, like opening the dialog
    fn open_dialog(&self, tx: TransactionId) -> Result<Transaction, LedgerError> {
        let transaction = self
            .ledger
            .get_transaction(tx)
            .ok_or_else(|| LedgerError::transaction_not_found(tx))?;
        self.ledger.provision(tx)?;
        Ok(transaction)
    }

    /// Final transaction states, sorted by id
    pub fn transactions(&self) -> Vec<Transaction> {
        self.ledger.transactions()
    }

    /// Final installment rows, sorted by id
    pub fn installments(&self) -> Vec<Payment> {
        self.ledger.installments()
    }
}

fn select_number(rows: &[Payment], number: u32, tx: TransactionId) -> Result<u32, LedgerError> {
    rows.iter()
        .find(|row| row.installment_number == number)
        .map(|row| row.id)
        .ok_or_else(|| {
            LedgerError::not_found(
                "installment number",
                format!("{} of transaction {}", number, tx),
            )
        })
}
