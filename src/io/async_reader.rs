//! Asynchronous journal reader with batch interface
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of JournalEntries
//!                  ↓
//!           csv_format module
//!           (JournalRecord, convert_journal_record)
//! ```

use crate::io::csv_format::{convert_journal_record, JournalRecord};
use crate::types::JournalEntry;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous journal reader
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: u64,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 1,
        }
    }

    /// Read up to `batch_size` journal entries
    ///
    /// Malformed rows are logged and skipped. Returns an empty vector at the
    /// end of the file.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<JournalEntry> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<JournalRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(record)) => {
                    self.line_num += 1;
                    match convert_journal_record(record) {
                        Ok(entry) => batch.push(entry),
                        Err(e) => tracing::warn!(line = self.line_num, error = %e, "skipping journal row"),
                    }
                }
                Some(Err(e)) => {
                    self.line_num += 1;
                    tracing::warn!(line = self.line_num, error = %e, "CSV parse error");
                }
                None => break,
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::io::Cursor;

    const HEADER: &str = "op,tx,client,amount,installments,installment,kind,date\n";

    fn reader(rows: &str) -> AsyncReader<Cursor<Vec<u8>>> {
        AsyncReader::new(Cursor::new(format!("{}{}", HEADER, rows).into_bytes()))
    }

    #[tokio::test]
    async fn test_async_reader_read_batch() {
        let mut async_reader = reader(
            "open,1,1,100,,,,2024-01-01\n\
             open,2,2,100,,,,2024-01-01\n\
             pay,1,,,,,total,2024-01-02\n",
        );

        let batch = async_reader.read_batch(2).await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].tx(), Some(1));
        assert_eq!(batch[1].tx(), Some(2));

        let batch = async_reader.read_batch(2).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].op_name(), "pay");

        assert!(async_reader.read_batch(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_empty_journal() {
        let mut async_reader = reader("");
        assert!(async_reader.read_batch(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_skips_invalid_rows() {
        let mut async_reader = reader(
            "refund,1,1,100,,,,2024-01-01\n\
             open,2,1,50,,,,2024-01-01\n\
             open,x,1,50,,,,2024-01-01\n",
        );

        let batch = async_reader.read_batch(10).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].tx(), Some(2));
    }

    #[tokio::test]
    async fn test_async_reader_batch_size_larger_than_records() {
        let mut async_reader = reader("provision,4,,,,,,\n");
        let batch = async_reader.read_batch(100).await;
        assert_eq!(batch, vec![JournalEntry::Provision { tx: 4 }]);
    }
}
