//! Journal entries replayed by the engines
//!
//! A journal is the ordered list of ledger actions staff performed: opening
//! transactions, importing legacy installment rows, opening payment dialogs
//! and submitting payments.

use super::payment::PaymentKind;
use super::transaction::{ClientId, TransactionId, TransactionKind};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// One journal line after conversion
#[derive(Debug, Clone, PartialEq)]
pub enum JournalEntry {
    /// Record a new transaction
    Open {
        tx: TransactionId,
        client: Option<ClientId>,
        kind: TransactionKind,
        amount: Decimal,
        installments: u32,
        date: NaiveDate,
    },

    /// Import a client-owned row that has no transaction reference
    Legacy {
        client: ClientId,
        installment_number: u32,
        total_installments: u32,
        amount: Decimal,
        due_date: Option<NaiveDate>,
    },

    /// Open the payment dialog without submitting
    Provision { tx: TransactionId },

    /// Open the payment dialog and submit a payment
    Pay {
        tx: TransactionId,
        /// Installment number to select, `None` keeps the default selection
        installment: Option<u32>,
        kind: PaymentKind,
        /// Raw amount as typed, validated by the reconciler
        amount: Option<String>,
        date: NaiveDate,
    },
}

impl JournalEntry {
    /// Transaction the entry refers to, if any
    pub fn tx(&self) -> Option<TransactionId> {
        match self {
            JournalEntry::Open { tx, .. }
            | JournalEntry::Provision { tx }
            | JournalEntry::Pay { tx, .. } => Some(*tx),
            JournalEntry::Legacy { .. } => None,
        }
    }

    /// Client named directly by the entry, if any
    pub fn client(&self) -> Option<ClientId> {
        match self {
            JournalEntry::Open { client, .. } => *client,
            JournalEntry::Legacy { client, .. } => Some(*client),
            JournalEntry::Provision { .. } | JournalEntry::Pay { .. } => None,
        }
    }

    /// Short operation name for logs
    pub fn op_name(&self) -> &'static str {
        match self {
            JournalEntry::Open {
                kind: TransactionKind::Income,
                ..
            } => "open",
            JournalEntry::Open {
                kind: TransactionKind::Expense,
                ..
            } => "expense",
            JournalEntry::Legacy { .. } => "legacy",
            JournalEntry::Provision { .. } => "provision",
            JournalEntry::Pay { .. } => "pay",
        }
    }
}
