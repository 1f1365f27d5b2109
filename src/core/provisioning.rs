//! Lazy installment provisioning
//!
//! The first time a payment dialog opens for a multi-installment transaction
//! that has no rows yet, a full schedule is generated. Once created, rows are
//! only updated, never regenerated.
//!
//! Each installment is `amount / N` rounded to cents and the last installment
//! absorbs the rounding remainder, so the schedule always sums to the
//! transaction amount. Installment `k` is due `k - 1` months after the
//! transaction date.

use crate::core::traits::LedgerBackend;
use crate::types::{LedgerError, Payment, Transaction};
use chrono::Months;
use rust_decimal::{Decimal, RoundingStrategy};

/// What opening the dialog found or created
#[derive(Debug, Clone, PartialEq)]
pub enum Provisioning {
    /// Single-installment transaction with no rows: direct mode
    NotRequired,

    /// Rows already existed and were left untouched
    Existing(Vec<Payment>),

    /// No schedule was created because the client owns legacy rows
    Legacy(Vec<Payment>),

    /// A new schedule was inserted
    Created(Vec<Payment>),
}

impl Provisioning {
    /// The rows visible to the dialog after provisioning
    pub fn rows(&self) -> &[Payment] {
        match self {
            Provisioning::NotRequired => &[],
            Provisioning::Existing(rows)
            | Provisioning::Legacy(rows)
            | Provisioning::Created(rows) => rows,
        }
    }
}

/// Split a transaction into its installment schedule
///
/// Returned rows carry no id yet; the backend assigns ids on insert.
pub fn plan_installments(transaction: &Transaction) -> Vec<Payment> {
    let count = transaction.installments.max(1);
    let share = (transaction.amount / Decimal::from(count))
        .round_dp_with_strategy(2, RoundingStrategy::ToZero);
    let last = transaction.amount - share * Decimal::from(count - 1);

    (1..=count)
        .map(|number| Payment {
            id: 0,
            client_id: transaction.client_id,
            transaction_id: Some(transaction.id),
            installment_number: number,
            total_installments: count,
            amount: if number == count { last } else { share },
            amount_paid: Decimal::ZERO,
            due_date: transaction
                .date
                .checked_add_months(Months::new(number - 1)),
            paid_at: None,
        })
        .collect()
}

/// Make sure a multi-installment transaction has its rows
///
/// Rows found by transaction reference are returned as they are. A
/// transaction with `installments > 1` and no rows gets a fresh schedule,
/// unless its client owns legacy rows: those are the rows payments land on.
/// A concurrent provisioning that wins the race is treated as existing rows.
pub fn ensure_installments<B: LedgerBackend>(
    backend: &mut B,
    transaction: &Transaction,
) -> Result<Provisioning, LedgerError> {
    let existing = backend.installments_for_transaction(transaction.id);
    if !existing.is_empty() {
        return Ok(Provisioning::Existing(existing));
    }
    if !transaction.needs_installment_rows() {
        return Ok(Provisioning::NotRequired);
    }
    if let Some(client) = transaction.client_id {
        let legacy = backend.legacy_installments_for_client(client);
        if !legacy.is_empty() {
            tracing::debug!(tx = transaction.id, client, "client has legacy rows, schedule skipped");
            return Ok(Provisioning::Legacy(legacy));
        }
    }

    match backend.insert_installments(transaction.id, plan_installments(transaction)) {
        Ok(rows) => {
            tracing::info!(
                tx = transaction.id,
                installments = rows.len(),
                "provisioned installment schedule"
            );
            Ok(Provisioning::Created(rows))
        }
        Err(LedgerError::AlreadyProvisioned { .. }) => Ok(Provisioning::Existing(
            backend.installments_for_transaction(transaction.id),
        )),
        Err(e) => Err(e),
    }
}
