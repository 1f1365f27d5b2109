//! Journal processing engine
//!
//! This module provides the `LedgerEngine`, which replays journal entries
//! against a [`Reconciler`] the way the staff UI drives it: transactions are
//! recorded, payment dialogs are opened (provisioning installment rows) and
//! payments are submitted through the dialog.

use crate::core::dialog::{PaymentDialog, PaymentForm};
use crate::core::ledger_store::MemoryLedger;
use crate::core::reconciler::Reconciler;
use crate::core::traits::LedgerBackend;
use crate::types::{JournalEntry, LedgerError, Payment, Transaction};
use rust_decimal::Decimal;

/// Single-threaded journal engine
#[derive(Debug)]
pub struct LedgerEngine<B: LedgerBackend = MemoryLedger> {
    reconciler: Reconciler<B>,
}

impl LedgerEngine<MemoryLedger> {
    /// Create an engine over an empty in-memory ledger
    pub fn new() -> Self {
        LedgerEngine {
            reconciler: Reconciler::in_memory(),
        }
    }
}

impl<B: LedgerBackend> LedgerEngine<B> {
    /// Create an engine over an existing backend
    pub fn with_backend(backend: B) -> Self {
        LedgerEngine {
            reconciler: Reconciler::new(backend),
        }
    }

    /// Process a single journal entry
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An `open` reuses a transaction id
    /// - A `provision` or `pay` references an unknown transaction
    /// - A `pay` selects an installment number the transaction does not have
    /// - The reconciler rejects the payment (validation, missing installment)
    pub fn process(&mut self, entry: JournalEntry) -> Result<(), LedgerError> {
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
                self.reconciler
                    .backend_mut()
                    .insert_transaction(Transaction::new(
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
                self.reconciler
                    .backend_mut()
                    .insert_legacy_installment(legacy_row(
                        client,
                        installment_number,
                        total_installments,
                        amount,
                        due_date,
                    ))?;
                Ok(())
            }
            JournalEntry::Provision { tx } => {
                PaymentDialog::open(&mut self.reconciler, tx)?;
                Ok(())
            }
            JournalEntry::Pay {
                tx,
                installment,
                kind,
                amount,
                date,
            } => {
                let mut dialog = PaymentDialog::open(&mut self.reconciler, tx)?;
                if let Some(number) = installment {
                    dialog.select(number)?;
                }
                let form = PaymentForm {
                    kind,
                    partial_amount: amount,
                    payment_date: date,
                };
                dialog.submit(&mut self.reconciler, &form)?;
                Ok(())
            }
        }
    }

    /// Final transaction states, sorted by id
    pub fn transactions(&self) -> Vec<Transaction> {
        self.reconciler.backend().all_transactions()
    }

    /// Final installment rows, sorted by id
    pub fn installments(&self) -> Vec<Payment> {
        self.reconciler.backend().all_installments()
    }

    pub fn reconciler(&self) -> &Reconciler<B> {
        &self.reconciler
    }
}

impl Default for LedgerEngine<MemoryLedger> {
    fn default() -> Self {
        Self::new()
    }
}

/// Transactions must bill a positive amount
pub(crate) fn validate_open_amount(tx: u32, amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation(
            "amount",
            &format!("transaction {} must have a positive amount", tx),
        ));
    }
    Ok(())
}

/// Build a legacy row from journal fields
pub(crate) fn legacy_row(
    client: u32,
    installment_number: u32,
    total_installments: u32,
    amount: Decimal,
    due_date: Option<chrono::NaiveDate>,
) -> Payment {
    Payment {
        id: 0,
        client_id: Some(client),
        transaction_id: None,
        installment_number,
        total_installments: total_installments.max(installment_number),
        amount,
        amount_paid: Decimal::ZERO,
        due_date,
        paid_at: None,
    }
}
