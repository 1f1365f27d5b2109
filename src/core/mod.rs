//! Core business logic module
//!
//! - `traits` - Backend seam over the row store
//! - `ledger_store` - In-memory backend
//! - `provisioning` - Lazy installment schedule creation
//! - `reconciler` - Payment application and aggregate recompute
//! - `dialog` - Payment dialog flow (open, select, submit)
//! - `engine` - Journal replay over a backend
//! - `async` - Concurrent ledger, engine and batch processor

pub mod r#async;
pub mod dialog;
pub mod engine;
pub mod ledger_store;
pub mod provisioning;
pub mod reconciler;
pub mod traits;

pub use dialog::{PaymentDialog, PaymentForm};
pub use engine::LedgerEngine;
pub use ledger_store::MemoryLedger;
pub use provisioning::{ensure_installments, plan_installments, Provisioning};
pub use r#async::{AsyncLedgerEngine, BatchProcessor, SharedLedger};
pub use reconciler::Reconciler;
pub use traits::LedgerBackend;
