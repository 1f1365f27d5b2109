//! Transaction-related types for the doula ledger
//!
//! A transaction is the invoice-like ledger entry staff record for a service
//! or a recurring charge. Its `amount_received` is only ever moved by the
//! reconciliation logic in [`crate::core::reconciler`].

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Client identifier
pub type ClientId = u32;

/// Transaction identifier
pub type TransactionId = u32;

/// Installment (payment row) identifier
pub type PaymentId = u32;

/// Tenant identifier: one doula's isolated account scope
pub type OrganizationId = u32;

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money owed to the practice by a client
    Income,

    /// Money spent by the practice
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

/// Invoice-like ledger entry
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TransactionId,

    /// Tenant scope, `None` for rows imported without one
    pub organization_id: Option<OrganizationId>,

    /// Total amount billed
    pub amount: Decimal,

    /// Sum received so far, never decreases and never exceeds `amount`
    pub amount_received: Decimal,

    /// Number of installments, at least 1
    pub installments: u32,

    /// Nominal value of one installment (`amount / installments`, in cents)
    pub installment_value: Decimal,

    pub date: NaiveDate,
    pub client_id: Option<ClientId>,
    pub kind: TransactionKind,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

impl Transaction {
    /// Create a transaction with nothing received yet
    ///
    /// `installments` below 1 is clamped to 1.
    pub fn new(
        id: TransactionId,
        kind: TransactionKind,
        amount: Decimal,
        installments: u32,
        date: NaiveDate,
        client_id: Option<ClientId>,
    ) -> Self {
        let installments = installments.max(1);
        Transaction {
            id,
            organization_id: None,
            amount,
            amount_received: Decimal::ZERO,
            installments,
            installment_value: (amount / Decimal::from(installments))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            date,
            client_id,
            kind,
            payment_method: None,
            notes: None,
        }
    }

    /// Amount still owed on this transaction
    pub fn outstanding(&self) -> Decimal {
        (self.amount - self.amount_received).max(Decimal::ZERO)
    }

    /// Whether the dialog should lazily create installment rows for it
    pub fn needs_installment_rows(&self) -> bool {
        self.installments > 1
    }
}
