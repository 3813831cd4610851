//! Asynchronous CSV reader for replay scripts
//!
//! Provides a batch reading interface over ledger commands from a CSV file.
//!
//! # Design
//!
//! The AsyncReader uses:
//! - csv-async for streaming CSV parsing
//! - futures stream combinators to pull records
//! - Batch reading so memory stays bounded on large scripts
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of LedgerCommands
//!                  ↓
//!           csv_format module
//!           (CommandRecord, convert_command_record)
//! ```

use crate::io::csv_format::{convert_command_record, CommandRecord};
use crate::types::{LedgerCommand, LedgerError};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous CSV command reader
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    rejected: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader over a script with a header row
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            rejected: 0,
        }
    }

    /// Number of rows skipped so far because they failed to parse
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Read a batch of commands
    ///
    /// Reads up to `batch_size` rows. Rows that fail to parse or convert are
    /// logged at `warn` level, counted in [`AsyncReader::rejected`] and skipped.
    ///
    /// # Returns
    ///
    /// The successfully converted commands, in file order. An empty vector
    /// means the end of the file was reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<LedgerCommand> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CommandRecord>();

        while batch.len() < batch_size {
            let converted = match records.next().await {
                Some(Ok(record)) => convert_command_record(record),
                Some(Err(e)) => Err(LedgerError::from(e)),
                None => break,
            };

            match converted {
                Ok(command) => batch.push(command),
                Err(e) => {
                    self.rejected += 1;
                    tracing::warn!(error = %e, "skipping replay row");
                }
            }
        }

        batch
    }
}
