//! Types module
//!
//! Contains core data structures used throughout the application.
//! - `transaction`: Transaction rows and identifiers
//! - `payment`: Installment rows, payment requests and outcomes
//! - `journal`: Journal entries replayed by the engines
//! - `error`: Error types for the ledger

pub mod error;
pub mod journal;
pub mod payment;
pub mod transaction;

pub use error::LedgerError;
pub use journal::JournalEntry;
pub use payment::{
    Payment, PaymentKind, PaymentRequest, PaymentStatus, ReconcileMode, ReconcileOutcome,
};
pub use transaction::{
    ClientId, OrganizationId, PaymentId, Transaction, TransactionId, TransactionKind,
};
