//! Doula Ledger Library
//! # Overview
//!
//! Business core of a doula practice: installment-payment reconciliation,
//! the staff and client session contexts, push notification fan-out,
//! credential recovery, report export and branding theme derivation.
//!
//! A journal replay driver runs the reconciliation rules from a CSV file
//! with a sync or an async strategy.
//!
//! # Architecture
//!
//! - [`types`] - Transactions, installment rows, journal entries, errors
//! - [`core`] - Reconciliation:
//!   - [`core::provisioning`] - Lazy installment schedule creation
//!   - [`core::reconciler`] - Payment application and aggregate recompute
//!   - [`core::dialog`] - Payment dialog flow
//!   - [`core::engine`] - Journal replay
//!   - [`core::r#async`] - Concurrent ledger and batch processing
//! - [`identity`] - Sessions, sign-in and credential recovery
//! - [`notify`] - Notification requests and push delivery
//! - [`io`] - Journal readers, ledger CSV and localized reports
//! - [`branding`] - Theme variables from organization colors
//! - [`strategy`] - Sync and async journal processing
//! - [`cli`] - Command line arguments and logging setup
//!
//! # Reconciliation
//!
//! A payment against a transaction with installment rows settles one row:
//!
//! - `amount_paid` is capped at the row amount, excess is dropped
//! - `paid_at` is set exactly when the row becomes fully paid
//! - the transaction's `amount_received` is recomputed as the sum of its rows
//!
//! Without rows the payment accumulates on the transaction itself, capped at
//! the transaction amount.

pub mod branding;
pub mod cli;
pub mod core;
pub mod identity;
pub mod io;
pub mod notify;
pub mod strategy;
pub mod types;

pub use core::{LedgerBackend, LedgerEngine, MemoryLedger, PaymentDialog, Reconciler};
pub use io::{write_installments_csv, write_transactions_csv};
pub use types::{
    ClientId, JournalEntry, LedgerError, Payment, PaymentKind, PaymentRequest, PaymentStatus,
    Transaction, TransactionId, TransactionKind,
};
