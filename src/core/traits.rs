//! Backend seam for the reconciliation logic
//!
//! The managed database is an external collaborator. Every read and write the
//! reconciler performs goes through [`LedgerBackend`], one call per round trip,
//! so the sequence of independent writes stays visible at the call site.

use crate::types::{ClientId, LedgerError, Payment, PaymentId, Transaction, TransactionId};
use rust_decimal::Decimal;

/// Row store for transactions and installment rows
pub trait LedgerBackend {
    /// Insert a new transaction; duplicate ids are rejected
    fn insert_transaction(&mut self, transaction: Transaction) -> Result<(), LedgerError>;

    /// Fetch a transaction by id
    fn transaction(&self, tx_id: TransactionId) -> Option<Transaction>;

    /// Overwrite a transaction's received aggregate
    fn set_amount_received(
        &mut self,
        tx_id: TransactionId,
        amount_received: Decimal,
    ) -> Result<(), LedgerError>;

    /// Rows referencing the transaction, ordered by installment number
    fn installments_for_transaction(&self, tx_id: TransactionId) -> Vec<Payment>;

    /// Client-owned rows without a transaction reference, ordered by installment number
    fn legacy_installments_for_client(&self, client_id: ClientId) -> Vec<Payment>;

    /// Insert a full installment schedule for a transaction
    ///
    /// Fails with [`LedgerError::AlreadyProvisioned`] if the transaction
    /// already has rows. Ids are assigned by the backend; the stored rows
    /// are returned.
    fn insert_installments(
        &mut self,
        tx_id: TransactionId,
        rows: Vec<Payment>,
    ) -> Result<Vec<Payment>, LedgerError>;

    /// Insert one client-owned legacy row, returning it with its id
    fn insert_legacy_installment(&mut self, row: Payment) -> Result<Payment, LedgerError>;

    /// Overwrite `amount_paid` and `paid_at` of an existing row
    fn update_installment(&mut self, row: &Payment) -> Result<(), LedgerError>;

    /// Fetch a row by id
    fn installment(&self, id: PaymentId) -> Option<Payment>;

    /// All transactions, ordered by id
    fn all_transactions(&self) -> Vec<Transaction>;

    /// All installment rows, ordered by id
    fn all_installments(&self) -> Vec<Payment>;
}
