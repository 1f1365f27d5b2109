//! Concurrent implementations of the core components
//!
//! The sequential [`crate::core::Reconciler`] writes an installment and the
//! transaction aggregate in two separate backend calls. Here both happen under
//! one DashMap entry lock:
//!
//! - **SharedLedger**: transactions with their installment rows, plus legacy
//!   rows keyed by client
//! - **AsyncLedgerEngine**: replays journal entries against a `SharedLedger`
//! - **BatchProcessor**: partitions a batch by client and runs partitions as
//!   tokio tasks
//!
//! # Thread Safety
//!
//! Operations on different transactions proceed in parallel. There is no
//! global lock.

pub mod batch_processor;
pub mod engine;
pub mod shared_ledger;

pub use batch_processor::{BatchProcessor, PartitionKey, ProcessingResult};
pub use engine::AsyncLedgerEngine;
pub use shared_ledger::SharedLedger;
