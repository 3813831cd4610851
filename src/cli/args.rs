use crate::replay::ReplayConfig;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Replay a CSV script of ledger commands and print final balances
#[derive(Parser, Debug)]
#[command(name = "account-ledger")]
#[command(about = "Replay a CSV script of ledger commands and print final balances", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing ledger commands
    #[arg(value_name = "INPUT", help = "Path to the input CSV script")]
    pub input_file: PathBuf,

    /// Settlement delay applied to every transfer
    #[arg(
        long = "settlement-delay-ms",
        value_name = "MS",
        default_value_t = 3000,
        help = "Milliseconds a transfer waits before settling (default: 3000)"
    )]
    pub settlement_delay_ms: u64,

    /// Number of script rows read per batch
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of script rows read per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Worker threads settling transfers
    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Worker threads settling transfers (default: CPU cores)"
    )]
    pub workers: Option<usize>,
}

impl CliArgs {
    /// Create a ReplayConfig from CLI arguments
    ///
    /// Missing values fall back to the defaults; zero sizes are replaced by
    /// the defaults with a warning.
    pub fn to_replay_config(&self) -> ReplayConfig {
        let default = ReplayConfig::default();
        ReplayConfig::new(
            Duration::from_millis(self.settlement_delay_ms),
            self.batch_size.unwrap_or(default.batch_size),
            self.workers.unwrap_or(default.worker_threads),
        )
    }
}
