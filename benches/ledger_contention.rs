//! Benchmark suite for account lock contention
//!
//! Measures deposit/withdraw throughput on a single shared account and
//! transfer settlement between two accounts, using the divan benchmarking
//! framework.
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench
//! ```

use account_ledger::{AccountHolder, Ledger, LedgerConfig};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() {
    divan::main();
}

fn holder() -> AccountHolder {
    AccountHolder::new("Bench", "Mark", 0, "2024-01-01")
}

/// Deposits and withdrawals from several threads on one account
#[divan::bench(args = [1, 4, 8])]
fn shared_account_deposit_withdraw(threads: usize) {
    let ledger = Ledger::new(LedgerConfig::new(Duration::ZERO));
    let account = ledger.open_account(holder()).expect("open failed");

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let account = Arc::clone(&account);
            thread::spawn(move || {
                for _ in 0..1_000 {
                    account.deposit(Decimal::ONE).expect("deposit failed");
                    account.try_withdraw(Decimal::ONE);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }
}

/// Opposite-direction transfers settled without delay
#[divan::bench(args = [100, 1_000])]
fn opposite_transfers(count: usize) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create tokio runtime");

    runtime.block_on(async {
        let ledger = Ledger::new(LedgerConfig::new(Duration::ZERO));
        let a = ledger.open_account(holder()).expect("open failed").id();
        let b = ledger.open_account(holder()).expect("open failed").id();
        ledger.deposit(a, Decimal::new(1_000_000, 0)).expect("deposit failed");
        ledger.deposit(b, Decimal::new(1_000_000, 0)).expect("deposit failed");

        let handles: Vec<_> = (0..count)
            .map(|i| {
                let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
                ledger
                    .transfer(from, to, Decimal::ONE)
                    .expect("transfer rejected")
            })
            .collect();

        for handle in handles {
            handle.outcome().await.expect("transfer failed");
        }
    });
}
