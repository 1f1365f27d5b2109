//! In-memory ledger backend
//!
//! This module provides the `MemoryLedger`, a single-threaded [`LedgerBackend`]
//! holding transactions and installment rows in HashMaps. It stands in for the
//! managed database in the synchronous strategy and in tests.
//!
//! # Duplicate Handling
//!
//! Transaction ids are unique: a second insert with the same id is rejected
//! and the first transaction is kept. Installment schedules are inserted at
//! most once per transaction.

use crate::core::traits::LedgerBackend;
use crate::types::{ClientId, LedgerError, Payment, PaymentId, Transaction, TransactionId};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// HashMap-backed ledger
#[derive(Debug)]
pub struct MemoryLedger {
    transactions: HashMap<TransactionId, Transaction>,
    installments: HashMap<PaymentId, Payment>,
    next_payment_id: PaymentId,
}

impl MemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        MemoryLedger {
            transactions: HashMap::new(),
            installments: HashMap::new(),
            next_payment_id: 1,
        }
    }

    fn allocate_id(&mut self) -> PaymentId {
        let id = self.next_payment_id;
        self.next_payment_id += 1;
        id
    }

    fn sorted(mut rows: Vec<Payment>) -> Vec<Payment> {
        rows.sort_by_key(|row| (row.installment_number, row.id));
        rows
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerBackend for MemoryLedger {
    fn insert_transaction(&mut self, transaction: Transaction) -> Result<(), LedgerError> {
        if self.transactions.contains_key(&transaction.id) {
            return Err(LedgerError::duplicate_transaction(transaction.id));
        }
        self.transactions.insert(transaction.id, transaction);
        Ok(())
    }

    fn transaction(&self, tx_id: TransactionId) -> Option<Transaction> {
        self.transactions.get(&tx_id).cloned()
    }

    fn set_amount_received(
        &mut self,
        tx_id: TransactionId,
        amount_received: Decimal,
    ) -> Result<(), LedgerError> {
        let tx = self
            .transactions
            .get_mut(&tx_id)
            .ok_or_else(|| LedgerError::transaction_not_found(tx_id))?;
        tx.amount_received = amount_received;
        Ok(())
    }

    fn installments_for_transaction(&self, tx_id: TransactionId) -> Vec<Payment> {
        Self::sorted(
            self.installments
                .values()
                .filter(|row| row.transaction_id == Some(tx_id))
                .cloned()
                .collect(),
        )
    }

    fn legacy_installments_for_client(&self, client_id: ClientId) -> Vec<Payment> {
        Self::sorted(
            self.installments
                .values()
                .filter(|row| row.transaction_id.is_none() && row.client_id == Some(client_id))
                .cloned()
                .collect(),
        )
    }

    fn insert_installments(
        &mut self,
        tx_id: TransactionId,
        rows: Vec<Payment>,
    ) -> Result<Vec<Payment>, LedgerError> {
        if !self.transactions.contains_key(&tx_id) {
            return Err(LedgerError::transaction_not_found(tx_id));
        }
        if self
            .installments
            .values()
            .any(|row| row.transaction_id == Some(tx_id))
        {
            return Err(LedgerError::already_provisioned(tx_id));
        }

        let mut stored = Vec::with_capacity(rows.len());
        for mut row in rows {
            row.id = self.allocate_id();
            row.transaction_id = Some(tx_id);
            self.installments.insert(row.id, row.clone());
            stored.push(row);
        }
        Ok(stored)
    }

    fn insert_legacy_installment(&mut self, mut row: Payment) -> Result<Payment, LedgerError> {
        if row.client_id.is_none() {
            return Err(LedgerError::validation(
                "client",
                "legacy installments must reference a client",
            ));
        }
        row.id = self.allocate_id();
        row.transaction_id = None;
        self.installments.insert(row.id, row.clone());
        Ok(row)
    }

    fn update_installment(&mut self, row: &Payment) -> Result<(), LedgerError> {
        let stored = self
            .installments
            .get_mut(&row.id)
            .ok_or_else(|| LedgerError::installment_not_found(row.id))?;
        stored.amount_paid = row.amount_paid;
        stored.paid_at = row.paid_at;
        Ok(())
    }

    fn installment(&self, id: PaymentId) -> Option<Payment> {
        self.installments.get(&id).cloned()
    }

    fn all_transactions(&self) -> Vec<Transaction> {
        let mut transactions: Vec<Transaction> = self.transactions.values().cloned().collect();
        transactions.sort_by_key(|tx| tx.id);
        transactions
    }

    fn all_installments(&self) -> Vec<Payment> {
        let mut rows: Vec<Payment> = self.installments.values().cloned().collect();
        rows.sort_by_key(|row| row.id);
        rows
    }
}
