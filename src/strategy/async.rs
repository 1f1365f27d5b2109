//! Asynchronous batch processing strategy
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch journal reading)
//!     ├── BatchProcessor (client partitioning + tokio tasks)
//!     └── AsyncLedgerEngine
//!         └── SharedLedger (per-entry locks, atomic payments)
//! ```
//!
//! Batches run one after another so an entry never overtakes an earlier one
//! for the same client. Inside a batch, partitions run on the multi-threaded
//! runtime in parallel.

use crate::cli::OutputKind;
use crate::core::r#async::{AsyncLedgerEngine, BatchProcessor, SharedLedger};
use crate::io::async_reader::AsyncReader;
use crate::strategy::{write_output, ProcessingStrategy};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Configuration for batch processing
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of journal entries per batch
    pub batch_size: usize,
    /// Number of runtime worker threads
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a BatchConfig, replacing zero values with the defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            tracing::warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            tracing::warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "invalid max_concurrent_batches, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
    output_kind: OutputKind,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig, output_kind: OutputKind) -> Self {
        Self {
            config,
            output_kind,
        }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| LedgerError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        runtime.block_on(async {
            let engine = Arc::new(AsyncLedgerEngine::new(Arc::new(SharedLedger::new())));
            let processor = BatchProcessor::new(Arc::clone(&engine));

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| LedgerError::IoError {
                    message: format!("Failed to open file '{}': {}", input_path.display(), e),
                })?;
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut batches = 0usize;
            let mut rejected = 0usize;
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                // Wait for the whole batch before reading the next one
                let results = processor.process_batch(batch).await;
                batches += 1;
                rejected += results.iter().filter(|r| r.result.is_err()).count();
            }
            tracing::info!(batches, rejected, "journal replayed");

            write_output(
                self.output_kind,
                &engine.transactions(),
                &engine.installments(),
                output,
            )
        })
    }
}
