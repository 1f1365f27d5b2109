//! Thread-safe ledger for concurrent journal processing
//!
//! This module provides the `SharedLedger`, a DashMap-backed ledger where each
//! transaction entry owns its installment rows. Holding an entry's lock covers
//! both the rows and the aggregate, so a payment updates an installment and
//! recomputes `amount_received` in one atomic step instead of two round trips.
//!
//! # Lock Ordering
//!
//! Legacy rows live in a second map keyed by client. A payment that falls back
//! to legacy rows takes the transaction entry first and the client entry
//! second; nothing takes them in the opposite order.

use crate::core::provisioning::{plan_installments, Provisioning};
use crate::core::reconciler::{
    capped_add, parse_partial_amount, received_from_rows, settle_installment,
};
use crate::core::traits::LedgerBackend;
use crate::types::{
    ClientId, LedgerError, Payment, PaymentId, PaymentKind, PaymentRequest, ReconcileMode,
    ReconcileOutcome, Transaction, TransactionId,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU32, Ordering};

/// A transaction together with the rows that reference it
#[derive(Debug, Clone)]
struct LedgerEntry {
    transaction: Transaction,
    installments: Vec<Payment>,
}

/// Concurrent ledger with per-transaction locking
#[derive(Debug)]
pub struct SharedLedger {
    entries: DashMap<TransactionId, LedgerEntry>,
    legacy: DashMap<ClientId, Vec<Payment>>,
    next_payment_id: AtomicU32,
}

impl SharedLedger {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            legacy: DashMap::new(),
            next_payment_id: AtomicU32::new(1),
        }
    }

    fn allocate_id(&self) -> PaymentId {
        self.next_payment_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a new transaction; duplicate ids are rejected
    pub fn record_transaction(&self, transaction: Transaction) -> Result<(), LedgerError> {
        let tx_id = transaction.id;
        match self.entries.entry(tx_id) {
            Entry::Occupied(_) => Err(LedgerError::duplicate_transaction(tx_id)),
            Entry::Vacant(slot) => {
                slot.insert(LedgerEntry {
                    transaction,
                    installments: Vec::new(),
                });
                Ok(())
            }
        }
    }

    pub fn get_transaction(&self, tx_id: TransactionId) -> Option<Transaction> {
        self.entries
            .get(&tx_id)
            .map(|entry| entry.transaction.clone())
    }

    pub fn rows_for_transaction(&self, tx_id: TransactionId) -> Vec<Payment> {
        self.entries
            .get(&tx_id)
            .map(|entry| entry.installments.clone())
            .unwrap_or_default()
    }

    pub fn legacy_rows_for_client(&self, client_id: ClientId) -> Vec<Payment> {
        self.legacy
            .get(&client_id)
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    /// Import a client-owned row without a transaction reference
    pub fn record_legacy_installment(&self, mut row: Payment) -> Result<Payment, LedgerError> {
        let client = row.client_id.ok_or_else(|| {
            LedgerError::validation("client", "legacy installments must reference a client")
        })?;
        row.id = self.allocate_id();
        row.transaction_id = None;

        let mut rows = self.legacy.entry(client).or_default();
        rows.push(row.clone());
        rows.sort_by_key(|r| (r.installment_number, r.id));
        Ok(row)
    }

    /// Provision the schedule of a multi-installment transaction at most once
    ///
    /// The existence check and the insert happen under the same entry lock.
    /// A client with legacy rows gets no schedule; its rows are returned.
    pub fn provision(&self, tx_id: TransactionId) -> Result<Provisioning, LedgerError> {
        let mut entry = self
            .entries
            .get_mut(&tx_id)
            .ok_or_else(|| LedgerError::transaction_not_found(tx_id))?;

        if !entry.installments.is_empty() {
            return Ok(Provisioning::Existing(entry.installments.clone()));
        }
        if !entry.transaction.needs_installment_rows() {
            return Ok(Provisioning::NotRequired);
        }
        if let Some(client) = entry.transaction.client_id {
            let legacy = self.legacy_rows_for_client(client);
            if !legacy.is_empty() {
                return Ok(Provisioning::Legacy(legacy));
            }
        }

        let rows: Vec<Payment> = plan_installments(&entry.transaction)
            .into_iter()
            .map(|mut row| {
                row.id = self.allocate_id();
                row
            })
            .collect();
        entry.installments = rows.clone();
        tracing::info!(tx = tx_id, installments = rows.len(), "provisioned installment schedule");
        Ok(Provisioning::Created(rows))
    }

    /// Rows a payment on this transaction can land on
    pub fn payable_rows(
        &self,
        tx_id: TransactionId,
        client_id: Option<ClientId>,
    ) -> (Vec<Payment>, ReconcileMode) {
        let rows = self.rows_for_transaction(tx_id);
        if !rows.is_empty() {
            return (rows, ReconcileMode::Installment);
        }
        let legacy = client_id
            .map(|client| self.legacy_rows_for_client(client))
            .unwrap_or_default();
        if legacy.is_empty() {
            (legacy, ReconcileMode::Direct)
        } else {
            (legacy, ReconcileMode::Legacy)
        }
    }

    /// Apply one payment atomically
    ///
    /// Same rules and errors as [`crate::core::Reconciler::apply`], but the
    /// installment update and the aggregate recompute cannot be observed
    /// separately by another payment.
    pub fn apply_payment(&self, request: &PaymentRequest) -> Result<ReconcileOutcome, LedgerError> {
        let tx_id = request
            .transaction_id
            .ok_or_else(|| LedgerError::transaction_not_found("(none)"))?;
        let partial = match request.kind {
            PaymentKind::Total => None,
            PaymentKind::Parcial => Some(parse_partial_amount(request.partial_amount.as_deref())?),
        };

        let mut entry = self
            .entries
            .get_mut(&tx_id)
            .ok_or_else(|| LedgerError::transaction_not_found(tx_id))?;

        if !entry.installments.is_empty() {
            let (updated, applied) =
                settle_selected(&mut entry.installments, request, partial)?;
            let amount_received = received_from_rows(&entry.installments);
            entry.transaction.amount_received = amount_received;
            return Ok(ReconcileOutcome {
                mode: ReconcileMode::Installment,
                installment: Some(updated),
                amount_received,
                applied,
            });
        }

        if let Some(client) = request.client_id {
            if let Some(mut legacy) = self.legacy.get_mut(&client) {
                if !legacy.is_empty() {
                    let (updated, applied) = settle_selected(&mut legacy, request, partial)?;
                    let amount_received = received_from_rows(&legacy);
                    entry.transaction.amount_received = amount_received;
                    return Ok(ReconcileOutcome {
                        mode: ReconcileMode::Legacy,
                        installment: Some(updated),
                        amount_received,
                        applied,
                    });
                }
            }
        }

        let pay = partial.unwrap_or(request.transaction_amount);
        let current = entry.transaction.amount_received;
        let amount_received = capped_add(current, pay, request.transaction_amount);
        entry.transaction.amount_received = amount_received;
        Ok(ReconcileOutcome {
            mode: ReconcileMode::Direct,
            installment: None,
            amount_received,
            applied: (amount_received - current).max(Decimal::ZERO),
        })
    }

    /// Snapshot of all transactions, sorted by id
    pub fn transactions(&self) -> Vec<Transaction> {
        let mut transactions: Vec<Transaction> = self
            .entries
            .iter()
            .map(|entry| entry.value().transaction.clone())
            .collect();
        transactions.sort_by_key(|tx| tx.id);
        transactions
    }

    /// Snapshot of all installment rows, sorted by id
    pub fn installments(&self) -> Vec<Payment> {
        let mut rows: Vec<Payment> = self
            .entries
            .iter()
            .flat_map(|entry| entry.value().installments.clone())
            .chain(self.legacy.iter().flat_map(|rows| rows.value().clone()))
            .collect();
        rows.sort_by_key(|row| row.id);
        rows
    }
}

impl Default for SharedLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Settle the selected row in place
fn settle_selected(
    rows: &mut [Payment],
    request: &PaymentRequest,
    partial: Option<Decimal>,
) -> Result<(Payment, Decimal), LedgerError> {
    let selected_id = request
        .installment_id
        .ok_or_else(|| LedgerError::installment_not_found("(none)"))?;
    let row = rows
        .iter_mut()
        .find(|row| row.id == selected_id)
        .ok_or_else(|| LedgerError::installment_not_found(selected_id))?;

    let (updated, applied) = settle_installment(row, partial, request.payment_date);
    *row = updated.clone();
    Ok((updated, applied))
}

impl LedgerBackend for SharedLedger {
    fn insert_transaction(&mut self, transaction: Transaction) -> Result<(), LedgerError> {
        self.record_transaction(transaction)
    }

    fn transaction(&self, tx_id: TransactionId) -> Option<Transaction> {
        self.get_transaction(tx_id)
    }

    fn set_amount_received(
        &mut self,
        tx_id: TransactionId,
        amount_received: Decimal,
    ) -> Result<(), LedgerError> {
        let mut entry = self
            .entries
            .get_mut(&tx_id)
            .ok_or_else(|| LedgerError::transaction_not_found(tx_id))?;
        entry.transaction.amount_received = amount_received;
        Ok(())
    }

    fn installments_for_transaction(&self, tx_id: TransactionId) -> Vec<Payment> {
        self.rows_for_transaction(tx_id)
    }

    fn legacy_installments_for_client(&self, client_id: ClientId) -> Vec<Payment> {
        self.legacy_rows_for_client(client_id)
    }

    fn insert_installments(
        &mut self,
        tx_id: TransactionId,
        rows: Vec<Payment>,
    ) -> Result<Vec<Payment>, LedgerError> {
        let mut entry = self
            .entries
            .get_mut(&tx_id)
            .ok_or_else(|| LedgerError::transaction_not_found(tx_id))?;
        if !entry.installments.is_empty() {
            return Err(LedgerError::already_provisioned(tx_id));
        }

        let stored: Vec<Payment> = rows
            .into_iter()
            .map(|mut row| {
                row.id = self.allocate_id();
                row.transaction_id = Some(tx_id);
                row
            })
            .collect();
        entry.installments = stored.clone();
        Ok(stored)
    }

    fn insert_legacy_installment(&mut self, row: Payment) -> Result<Payment, LedgerError> {
        self.record_legacy_installment(row)
    }

    fn update_installment(&mut self, row: &Payment) -> Result<(), LedgerError> {
        let slot = match row.transaction_id {
            Some(tx_id) => self.entries.get_mut(&tx_id).and_then(|mut entry| {
                entry.installments.iter_mut().find(|r| r.id == row.id).map(|stored| {
                    stored.amount_paid = row.amount_paid;
                    stored.paid_at = row.paid_at;
                })
            }),
            None => row.client_id.and_then(|client| {
                self.legacy.get_mut(&client).and_then(|mut rows| {
                    rows.iter_mut().find(|r| r.id == row.id).map(|stored| {
                        stored.amount_paid = row.amount_paid;
                        stored.paid_at = row.paid_at;
                    })
                })
            }),
        };
        slot.ok_or_else(|| LedgerError::installment_not_found(row.id))
    }

    fn installment(&self, id: PaymentId) -> Option<Payment> {
        self.installments().into_iter().find(|row| row.id == id)
    }

    fn all_transactions(&self) -> Vec<Transaction> {
        self.transactions()
    }

    fn all_installments(&self) -> Vec<Payment> {
        self.installments()
    }
}
