//! Installment (payment row) types
//!
//! A payment row is one scheduled partial charge against a transaction. Rows
//! imported before transactions carried installment references have no
//! `transaction_id` and belong to the client directly.

use super::transaction::{ClientId, PaymentId, TransactionId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Settlement status of an installment, always derived from its amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Nothing paid yet
    Pendente,

    /// Partially paid
    Parcial,

    /// Fully settled
    Pago,
}

impl PaymentStatus {
    /// Derive the status from what is owed and what was paid
    pub fn derive(amount: Decimal, amount_paid: Decimal) -> Self {
        if amount_paid >= amount {
            PaymentStatus::Pago
        } else if amount_paid > Decimal::ZERO {
            PaymentStatus::Parcial
        } else {
            PaymentStatus::Pendente
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pendente => "pendente",
            PaymentStatus::Parcial => "parcial",
            PaymentStatus::Pago => "pago",
        }
    }
}

/// One installment row
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub id: PaymentId,
    pub client_id: Option<ClientId>,

    /// `None` marks a legacy row owned by the client
    pub transaction_id: Option<TransactionId>,

    /// 1-based position within the schedule
    pub installment_number: u32,
    pub total_installments: u32,

    /// This installment's share of the transaction
    pub amount: Decimal,

    /// Paid so far, `0 <= amount_paid <= amount`
    pub amount_paid: Decimal,

    pub due_date: Option<NaiveDate>,

    /// Set only when the installment is fully settled
    pub paid_at: Option<NaiveDate>,
}

impl Payment {
    pub fn status(&self) -> PaymentStatus {
        PaymentStatus::derive(self.amount, self.amount_paid)
    }

    pub fn is_settled(&self) -> bool {
        self.status() == PaymentStatus::Pago
    }

    /// Remaining balance on this installment
    pub fn remaining(&self) -> Decimal {
        (self.amount - self.amount_paid).max(Decimal::ZERO)
    }
}

/// How much of the selected balance a payment covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    /// Settle the selected installment (or the whole transaction in direct mode)
    Total,

    /// Pay a caller-supplied amount
    Parcial,
}

/// One submission of the payment dialog
///
/// Transaction amount and installment count come from the caller's
/// already-loaded transaction and are not re-fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub transaction_id: Option<TransactionId>,
    pub transaction_amount: Decimal,
    pub transaction_installments: u32,

    /// Only used to find legacy rows
    pub client_id: Option<ClientId>,

    /// Required when installment rows exist
    pub installment_id: Option<PaymentId>,

    pub kind: PaymentKind,

    /// Raw user input, required for [`PaymentKind::Parcial`]
    pub partial_amount: Option<String>,

    /// Recorded as `paid_at` when an installment becomes settled
    pub payment_date: NaiveDate,
}

/// Where a reconciled payment landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Applied to a row referencing the transaction
    Installment,

    /// Applied to a client-owned row without a transaction reference
    Legacy,

    /// No rows: accumulated on the transaction itself
    Direct,
}

/// Result of one successful reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub mode: ReconcileMode,

    /// The installment after the update, absent in direct mode
    pub installment: Option<Payment>,

    /// Transaction aggregate after the update
    pub amount_received: Decimal,

    /// Amount effectively applied after capping
    pub applied: Decimal,
}
