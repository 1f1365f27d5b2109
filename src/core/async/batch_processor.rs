//! Batch processing with ledger-based partitioning
//!
//! This module provides the `BatchProcessor`, which splits a batch of journal
//! entries into partitions that can run concurrently without changing the
//! result of replaying the batch in order.
//!
//! # Partitioning
//!
//! Entries touching the same client (its transactions and its legacy rows)
//! land in the same partition. Entries for a transaction without a client are
//! keyed by the transaction itself. `provision` and `pay` entries do not name
//! a client, so the processor resolves it from `open` entries earlier in the
//! same batch, then from the shared ledger.
//!
//! Partitions run in parallel; entries inside a partition run in order.

use std::collections::HashMap;
use std::sync::Arc;

use super::AsyncLedgerEngine;
use crate::types::{ClientId, JournalEntry, LedgerError, TransactionId};

/// Unit of ordering inside a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionKey {
    Client(ClientId),
    Transaction(TransactionId),
}

/// Result of processing a single journal entry
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The entry that was processed
    pub entry: JournalEntry,

    /// The result of processing (success or error)
    pub result: Result<(), LedgerError>,
}

/// Batch processor over a shared engine
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    engine: Arc<AsyncLedgerEngine>,
}

impl BatchProcessor {
    pub fn new(engine: Arc<AsyncLedgerEngine>) -> Self {
        Self { engine }
    }

    /// Partition a batch, keeping the original order inside each partition
    ///
    /// Each entry appears in exactly one partition.
    pub fn partition(&self, batch: Vec<JournalEntry>) -> HashMap<PartitionKey, Vec<JournalEntry>> {
        let mut opened: HashMap<TransactionId, Option<ClientId>> = HashMap::new();
        for entry in &batch {
            if let JournalEntry::Open { tx, client, .. } = entry {
                opened.entry(*tx).or_insert(*client);
            }
        }

        let mut partitions: HashMap<PartitionKey, Vec<JournalEntry>> = HashMap::new();
        for entry in batch {
            let key = self.partition_key(&entry, &opened);
            partitions.entry(key).or_default().push(entry);
        }
        partitions
    }

    fn partition_key(
        &self,
        entry: &JournalEntry,
        opened: &HashMap<TransactionId, Option<ClientId>>,
    ) -> PartitionKey {
        // An `open` follows the first `open` of its transaction in the batch,
        // so a duplicate naming another client runs after the original
        if let JournalEntry::Open { tx, .. } = entry {
            return match opened.get(tx).copied().flatten() {
                Some(client) => PartitionKey::Client(client),
                None => PartitionKey::Transaction(*tx),
            };
        }
        if let Some(client) = entry.client() {
            return PartitionKey::Client(client);
        }
        let tx = match entry.tx() {
            Some(tx) => tx,
            // Every entry without a client names a transaction
            None => return PartitionKey::Transaction(0),
        };

        // A duplicate `open` later in the batch must not move the entry
        let client = match opened.get(&tx) {
            Some(client) => *client,
            None => self
                .engine
                .ledger()
                .get_transaction(tx)
                .and_then(|transaction| transaction.client_id),
        };
        match client {
            Some(client) => PartitionKey::Client(client),
            None => PartitionKey::Transaction(tx),
        }
    }

    /// Process one partition sequentially
    ///
    /// Errors are captured per entry and do not stop the partition.
    pub async fn process_partition(&self, entries: Vec<JournalEntry>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(entries.len());

        for entry in entries {
            let result = self.engine.process(entry.clone());
            if let Err(ref e) = result {
                tracing::warn!(op = entry.op_name(), tx = ?entry.tx(), error = %e, "journal entry rejected");
            }
            results.push(ProcessingResult { entry, result });
        }

        results
    }

    /// Process a batch: partition, spawn one task per partition, wait for all
    ///
    /// Results are grouped by partition, not in input order.
    pub async fn process_batch(&self, batch: Vec<JournalEntry>) -> Vec<ProcessingResult> {
        let partitions = self.partition(batch);

        let mut tasks = Vec::with_capacity(partitions.len());
        for (_key, entries) in partitions {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_partition(entries).await
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(partition_results) => results.extend(partition_results),
                Err(e) => tracing::error!(error = ?e, "partition task panicked"),
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::r#async::SharedLedger;
    use crate::types::{PaymentKind, TransactionKind};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    }

    fn processor() -> BatchProcessor {
        BatchProcessor::new(Arc::new(AsyncLedgerEngine::new(Arc::new(SharedLedger::new()))))
    }

    fn open(tx: TransactionId, client: Option<ClientId>, amount: &str, installments: u32) -> JournalEntry {
        JournalEntry::Open {
            tx,
            client,
            kind: TransactionKind::Income,
            amount: d(amount),
            installments,
            date: date(),
        }
    }

    fn pay(tx: TransactionId, installment: Option<u32>, amount: Option<&str>) -> JournalEntry {
        JournalEntry::Pay {
            tx,
            installment,
            kind: if amount.is_some() {
                PaymentKind::Parcial
            } else {
                PaymentKind::Total
            },
            amount: amount.map(str::to_string),
            date: date(),
        }
    }

    #[test]
    fn test_partition_empty_batch() {
        assert!(processor().partition(vec![]).is_empty());
    }

    #[test]
    fn test_partition_resolves_client_from_batch() {
        let batch = vec![
            open(1, Some(5), "100", 2),
            pay(1, None, None),
            open(2, None, "50", 1),
            pay(2, None, None),
            JournalEntry::Provision { tx: 1 },
        ];

        let partitions = processor().partition(batch);

        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[&PartitionKey::Client(5)].len(), 3);
        assert_eq!(partitions[&PartitionKey::Transaction(2)].len(), 2);
    }

    #[test]
    fn test_partition_resolves_client_from_ledger() {
        let processor = processor();
        processor.engine.process(open(1, Some(8), "100", 1)).unwrap();

        let partitions = processor.partition(vec![pay(1, None, Some("10"))]);

        assert!(partitions.contains_key(&PartitionKey::Client(8)));
    }

    #[test]
    fn test_partition_keeps_order() {
        let batch = vec![
            open(1, Some(1), "100", 2),
            open(2, Some(2), "100", 1),
            pay(1, Some(2), None),
            pay(2, None, Some("1")),
            pay(1, Some(1), Some("3")),
        ];

        let partitions = processor().partition(batch);

        let client_one: Vec<_> = partitions[&PartitionKey::Client(1)]
            .iter()
            .map(|e| e.op_name())
            .collect();
        assert_eq!(client_one, vec!["open", "pay", "pay"]);
        assert!(matches!(
            partitions[&PartitionKey::Client(1)][1],
            JournalEntry::Pay { installment: Some(2), .. }
        ));
    }

    #[test]
    fn test_legacy_rows_share_client_partition() {
        let batch = vec![
            open(3, Some(4), "60", 1),
            JournalEntry::Legacy {
                client: 4,
                installment_number: 1,
                total_installments: 1,
                amount: d("60"),
                due_date: None,
            },
            pay(3, None, None),
        ];

        let partitions = processor().partition(batch);

        assert_eq!(partitions.len(), 1);
        assert_eq!(partitions[&PartitionKey::Client(4)].len(), 3);
    }

    #[test]
    fn test_duplicate_open_follows_first_open() {
        let batch = vec![
            open(1, Some(1), "100.00", 1),
            open(1, Some(2), "999.00", 1),
            pay(1, None, Some("40")),
            open(2, None, "10.00", 1),
            open(2, Some(3), "20.00", 1),
        ];

        let partitions = processor().partition(batch);

        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[&PartitionKey::Client(1)].len(), 3);
        assert_eq!(partitions[&PartitionKey::Transaction(2)].len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_duplicate_open_is_rejected_after_original() {
        let processor = processor();
        let results = processor
            .process_batch(vec![
                open(1, Some(1), "100.00", 1),
                open(1, Some(2), "999.00", 1),
                pay(1, None, Some("40")),
            ])
            .await;

        let rejected: Vec<_> = results.iter().filter(|r| r.result.is_err()).collect();
        assert_eq!(rejected.len(), 1);
        assert!(matches!(
            rejected[0].entry,
            JournalEntry::Open { client: Some(2), .. }
        ));

        let transaction = &processor.engine.transactions()[0];
        assert_eq!(transaction.client_id, Some(1));
        assert_eq!(transaction.amount, d("100.00"));
        assert_eq!(transaction.amount_received, d("40.00"));
    }

    #[tokio::test]
    async fn test_process_partition_continues_after_error() {
        let processor = processor();
        let results = processor
            .process_partition(vec![
                pay(1, None, None),
                open(1, Some(1), "100", 1),
                pay(1, None, Some("abc")),
                pay(1, None, Some("25")),
            ])
            .await;

        assert_eq!(results.len(), 4);
        assert!(matches!(results[0].result, Err(LedgerError::NotFound { .. })));
        assert!(results[1].result.is_ok());
        assert!(results[2].result.as_ref().unwrap_err().is_validation());
        assert!(results[3].result.is_ok());
        assert_eq!(processor.engine.transactions()[0].amount_received, d("25"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_process_batch_many_clients() {
        let processor = processor();
        let mut batch = Vec::new();
        for client in 1..=20u32 {
            batch.push(open(client, Some(client), "90.00", 3));
        }
        for client in 1..=20u32 {
            batch.push(pay(client, None, None));
            batch.push(pay(client, Some(3), Some("5")));
        }

        let results = processor.process_batch(batch).await;

        assert_eq!(results.len(), 60);
        assert!(results.iter().all(|r| r.result.is_ok()));
        let transactions = processor.engine.transactions();
        assert_eq!(transactions.len(), 20);
        assert!(transactions.iter().all(|tx| tx.amount_received == d("35.00")));
        assert_eq!(processor.engine.installments().len(), 60);
    }

    #[tokio::test]
    async fn test_batches_in_sequence_see_earlier_state() {
        let processor = processor();
        processor.process_batch(vec![open(1, Some(1), "100.00", 2)]).await;

        let results = processor
            .process_batch(vec![pay(1, Some(2), None), pay(1, None, None)])
            .await;

        assert!(results.iter().all(|r| r.result.is_ok()));
        assert_eq!(processor.engine.transactions()[0].amount_received, d("100.00"));
    }
}
