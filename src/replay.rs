//! Replay of CSV ledger scripts
//!
//! This module drives a [`Ledger`] from a CSV script of commands and writes
//! the final account snapshots as CSV.
//!
//! # Architecture
//!
//! ```text
//! Replay
//!     ├── ReplayConfig (settlement_delay, batch_size, worker_threads)
//!     ├── AsyncReader (batch CSV reading)
//!     └── Ledger (accounts + delayed transfer settlement)
//! ```
//!
//! Commands are applied in file order. Deposits, withdrawals, opens and
//! closes take effect immediately; transfers are scheduled and settle on the
//! runtime's worker threads once their delay elapses. The replay waits for
//! every scheduled transfer before writing output, so a script's final
//! balances never depend on an unsettled transfer.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio_util::compat::TokioAsyncReadCompatExt;

use crate::core::{
    Ledger, LedgerConfig, TransferHandle, TransferReceipt, DEFAULT_SETTLEMENT_DELAY,
};
use crate::io::csv_format::write_accounts_csv;
use crate::io::AsyncReader;
use crate::types::{AccountHolder, LedgerCommand, LedgerError};

/// Configuration for a replay run
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayConfig {
    /// Wait applied before each transfer settles
    pub settlement_delay: Duration,
    /// Number of script rows read per batch
    pub batch_size: usize,
    /// Worker threads of the tokio runtime settling transfers
    pub worker_threads: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            settlement_delay: DEFAULT_SETTLEMENT_DELAY,
            batch_size: 1000,
            worker_threads: num_cpus::get(),
        }
    }
}

impl ReplayConfig {
    /// Create a new ReplayConfig; zero sizes fall back to the defaults
    pub fn new(settlement_delay: Duration, batch_size: usize, worker_threads: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            tracing::warn!(
                "Invalid batch_size ({}), using default ({})",
                batch_size,
                default.batch_size
            );
            default.batch_size
        } else {
            batch_size
        };

        let worker_threads = if worker_threads == 0 {
            tracing::warn!(
                "Invalid worker_threads ({}), using default ({})",
                worker_threads,
                default.worker_threads
            );
            default.worker_threads
        } else {
            worker_threads
        };

        Self {
            settlement_delay,
            batch_size,
            worker_threads,
        }
    }
}

/// Counters reported at the end of a replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Commands accepted by the ledger (transfers count once scheduled)
    pub applied: usize,
    /// Rows that failed to parse or were refused by the ledger
    pub rejected: usize,
    /// Scheduled transfers whose both legs were applied
    pub transfers_settled: usize,
    /// Scheduled transfers that settled with an error
    pub transfers_failed: usize,
}

impl ReplaySummary {
    fn record_outcome(&mut self, outcome: &Result<TransferReceipt, LedgerError>) {
        match outcome {
            Ok(_) => self.transfers_settled += 1,
            Err(_) => self.transfers_failed += 1,
        }
    }
}

/// Collect the outcomes of transfers that have already settled
///
/// Unfinished handles stay in `pending`, so the set only holds transfers
/// still inside their settlement delay.
async fn drain_finished(pending: &mut Vec<TransferHandle>, summary: &mut ReplaySummary) {
    let (finished, unfinished): (Vec<_>, Vec<_>) = std::mem::take(pending)
        .into_iter()
        .partition(TransferHandle::is_finished);
    *pending = unfinished;

    for handle in finished {
        summary.record_outcome(&handle.outcome().await);
    }
}

/// Apply a single command to the ledger
///
/// Returns the settlement handle for transfers, `None` for everything else.
pub fn apply_command(
    ledger: &Ledger,
    command: LedgerCommand,
) -> Result<Option<TransferHandle>, LedgerError> {
    match command {
        LedgerCommand::Open {
            account,
            last_name,
            first_name,
            credit_rating,
        } => {
            let registration_date = Utc::now().format("%Y-%m-%d").to_string();
            let holder = AccountHolder::new(last_name, first_name, credit_rating, registration_date);
            ledger.open_account_with_id(account, holder)?;
            Ok(None)
        }
        LedgerCommand::Deposit { account, amount } => {
            ledger.deposit(account, amount)?;
            Ok(None)
        }
        LedgerCommand::Withdraw { account, amount } => {
            ledger.withdraw(account, amount)?;
            Ok(None)
        }
        LedgerCommand::Transfer { from, to, amount } => {
            ledger.transfer(from, to, amount).map(Some)
        }
        LedgerCommand::Close { account } => {
            ledger.close_account(account)?;
            Ok(None)
        }
    }
}

/// CSV script replay
#[derive(Debug, Clone)]
pub struct Replay {
    config: ReplayConfig,
}

impl Replay {
    pub fn new(config: ReplayConfig) -> Self {
        Self { config }
    }

    /// Replay the script at `input_path` and write final balances to `output`
    ///
    /// Builds a multi-threaded tokio runtime, reads the script in batches,
    /// applies each command, waits for every scheduled transfer and writes
    /// the account snapshots.
    ///
    /// # Error Handling
    ///
    /// Fatal errors (file not found, I/O errors, runtime errors) are returned
    /// immediately. Individual command errors are logged and counted in the
    /// summary; processing continues with the next row.
    pub fn run(
        &self,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<ReplaySummary, LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.worker_threads)
            .enable_all()
            .build()?;

        runtime.block_on(async {
            let ledger = Ledger::new(LedgerConfig::new(self.config.settlement_delay));

            let file = tokio::fs::File::open(input_path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    LedgerError::FileNotFound {
                        path: input_path.display().to_string(),
                    }
                } else {
                    LedgerError::from(e)
                }
            })?;

            let mut reader = AsyncReader::new(file.compat());
            let mut summary = ReplaySummary::default();
            let mut pending = Vec::new();

            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                for command in batch {
                    let account = command.account();
                    match apply_command(&ledger, command) {
                        Ok(handle) => {
                            summary.applied += 1;
                            pending.extend(handle);
                        }
                        Err(e) => {
                            summary.rejected += 1;
                            tracing::warn!(account, error = %e, "command rejected");
                        }
                    }
                }

                drain_finished(&mut pending, &mut summary).await;
            }
            summary.rejected += reader.rejected();

            for outcome in join_all(pending.into_iter().map(TransferHandle::outcome)).await {
                summary.record_outcome(&outcome);
            }

            write_accounts_csv(&ledger.snapshots(), output)?;

            tracing::info!(
                applied = summary.applied,
                rejected = summary.rejected,
                transfers_settled = summary.transfers_settled,
                transfers_failed = summary.transfers_failed,
                "replay complete"
            );

            Ok(summary)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "type,account,target,amount,last_name,first_name,credit_rating\n";

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(HEADER.as_bytes())
            .expect("Failed to write to temp file");
        file.write_all(rows.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn fast_config() -> ReplayConfig {
        ReplayConfig::new(Duration::ZERO, 2, 2)
    }

    #[test]
    fn test_config_zero_values_fall_back() {
        let config = ReplayConfig::new(Duration::from_millis(5), 0, 0);

        assert_eq!(config.settlement_delay, Duration::from_millis(5));
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.worker_threads, num_cpus::get());
    }

    #[test]
    fn test_replay_transfer_scenario() {
        let file = create_temp_csv(
            "open,1,,,Doe,Jane,700\n\
             open,2,,,Roe,Rich,650\n\
             deposit,1,,100,,,\n\
             transfer,1,2,50,,,\n",
        );
        let mut output = Vec::new();

        let summary = Replay::new(fast_config())
            .run(file.path(), &mut output)
            .unwrap();

        assert_eq!(
            summary,
            ReplaySummary {
                applied: 4,
                rejected: 0,
                transfers_settled: 1,
                transfers_failed: 0,
            }
        );
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "account,holder,balance,closed\n\
             1,\"Doe, Jane\",50.0000,false\n\
             2,\"Roe, Rich\",50.0000,false\n"
        );
    }

    #[test]
    fn test_replay_failed_transfer_leaves_balances() {
        let file = create_temp_csv(
            "open,1,,,Doe,Jane,700\n\
             open,2,,,Roe,Rich,650\n\
             deposit,1,,30,,,\n\
             transfer,1,2,50,,,\n",
        );
        let mut output = Vec::new();

        let summary = Replay::new(fast_config())
            .run(file.path(), &mut output)
            .unwrap();

        assert_eq!(summary.transfers_failed, 1);
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("1,\"Doe, Jane\",30.0000,false"));
        assert!(output.contains("2,\"Roe, Rich\",0.0000,false"));
    }

    #[test]
    fn test_replay_counts_rejections() {
        let file = create_temp_csv(
            "open,1,,,Doe,Jane,700\n\
             withdraw,1,,10,,,\n\
             deposit,9,,10,,,\n\
             bogus,1,,,,,\n\
             close,1,,,,,\n\
             deposit,1,,5,,,\n",
        );
        let mut output = Vec::new();

        let summary = Replay::new(fast_config())
            .run(file.path(), &mut output)
            .unwrap();

        assert_eq!(summary.applied, 2);
        assert_eq!(summary.rejected, 4);
        assert!(String::from_utf8(output)
            .unwrap()
            .contains("1,\"Doe, Jane\",0.0000,true"));
    }

    #[test]
    fn test_replay_handles_missing_file() {
        let mut output = Vec::new();

        let result = Replay::new(fast_config()).run(Path::new("nonexistent.csv"), &mut output);
        assert_eq!(
            result,
            Err(LedgerError::FileNotFound {
                path: "nonexistent.csv".to_string()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_finished_keeps_only_unsettled_transfers() {
        let ledger = Ledger::new(LedgerConfig::new(Duration::from_secs(1)));
        for (account, name) in [(1, "Doe"), (2, "Roe")] {
            apply_command(
                &ledger,
                LedgerCommand::Open {
                    account,
                    last_name: name.to_string(),
                    first_name: "J".to_string(),
                    credit_rating: 0,
                },
            )
            .unwrap();
        }
        ledger.deposit(1, Decimal::new(10, 0)).unwrap();

        let mut pending = vec![
            ledger.transfer(1, 2, Decimal::new(4, 0)).unwrap(),
            ledger.transfer(1, 2, Decimal::new(50, 0)).unwrap(),
        ];
        tokio::time::sleep(Duration::from_secs(2)).await;
        pending.push(ledger.transfer(2, 1, Decimal::ONE).unwrap());

        let mut summary = ReplaySummary::default();
        drain_finished(&mut pending, &mut summary).await;

        assert_eq!(pending.len(), 1);
        assert_eq!(summary.transfers_settled, 1);
        assert_eq!(summary.transfers_failed, 1);
        assert_eq!(ledger.balance(1).unwrap(), Decimal::new(6, 0));
    }

    #[test]
    fn test_replay_small_batches_count_every_transfer() {
        let mut rows = String::from(
            "open,1,,,Doe,Jane,700\n\
             open,2,,,Roe,Rich,650\n\
             deposit,1,,100,,,\n",
        );
        for _ in 0..20 {
            rows.push_str("transfer,1,2,1,,,\n");
        }
        let file = create_temp_csv(&rows);
        let mut output = Vec::new();

        let summary = Replay::new(ReplayConfig::new(Duration::ZERO, 1, 2))
            .run(file.path(), &mut output)
            .unwrap();

        assert_eq!(summary.applied, 23);
        assert_eq!(summary.transfers_settled, 20);
        assert_eq!(summary.transfers_failed, 0);
        assert!(String::from_utf8(output)
            .unwrap()
            .contains("2,\"Roe, Rich\",20.0000,false"));
    }

    #[tokio::test]
    async fn test_apply_command_returns_transfer_handle() {
        let ledger = Ledger::new(LedgerConfig::new(Duration::ZERO));
        for (account, name) in [(1, "Doe"), (2, "Roe")] {
            apply_command(
                &ledger,
                LedgerCommand::Open {
                    account,
                    last_name: name.to_string(),
                    first_name: "J".to_string(),
                    credit_rating: 0,
                },
            )
            .unwrap();
        }
        ledger.deposit(1, Decimal::new(10, 0)).unwrap();

        let handle = apply_command(
            &ledger,
            LedgerCommand::Transfer {
                from: 1,
                to: 2,
                amount: Decimal::new(10, 0),
            },
        )
        .unwrap()
        .expect("transfer yields a handle");

        handle.outcome().await.unwrap();
        assert_eq!(ledger.balance(2).unwrap(), Decimal::new(10, 0));
        let holder = ledger.account(1).unwrap().holder().clone();
        assert_eq!(holder.registration_date().len(), "2024-01-15".len());
    }
}
