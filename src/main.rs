//! Account ledger replay CLI
//!
//! Replays a CSV script of ledger commands and prints the final account
//! balances.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- script.csv > balances.csv
//! cargo run -- --settlement-delay-ms 0 script.csv > balances.csv
//! RUST_LOG=info cargo run -- --workers 4 script.csv > balances.csv
//! ```
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default `warn`).
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (file not found, file not readable, output failure, etc.)

use account_ledger::cli;
use account_ledger::replay::Replay;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = cli::parse_args();
    let replay = Replay::new(args.to_replay_config());

    let mut output = std::io::stdout();
    if let Err(e) = replay.run(&args.input_file, &mut output) {
        tracing::error!(error = %e, "replay failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
