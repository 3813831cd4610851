//! Account Ledger Library
//! # Overview
//!
//! A small in-process ledger: account holders, lock-guarded accounts with
//! deposit, withdraw and delayed transfer operations, and a per-account
//! journal recording the outcome of every balance-affecting action.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (AccountHolder, Operation, LedgerError, etc.)
//! - [`core`] - Business logic components:
//!   - [`core::account`] - Balance, closing time and journal under one lock
//!   - [`core::settlement`] - Deferred transfers with observable outcomes
//!   - [`core::ledger`] - Concurrent registry of accounts
//! - [`io`] - CSV replay scripts and balance output
//! - [`replay`] - Runs a script against a ledger on a tokio runtime
//! - [`cli`] - CLI arguments parsing
//!
//! # Transfers
//!
//! A transfer records a pending withdraw on the source account and settles
//! after a fixed delay. Settlement locks both accounts in ascending id order
//! and applies both legs or neither. The outcome is returned through a
//! [`TransferHandle`] and written to the pending journal entry.
//!
//! # Accounts
//!
//! Each account maintains:
//! - `balance`: never negative, only changed under the account lock
//! - `closed_at`: once set, deposits, withdrawals and transfers are refused
//! - `journal`: one [`Operation`] per attempted action

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod replay;
pub mod types;

pub use core::{Account, Ledger, LedgerConfig, TransferHandle, TransferReceipt};
pub use io::write_accounts_csv;
pub use types::{
    AccountHolder, AccountId, AccountSnapshot, LedgerCommand, LedgerError, Operation, OperationId,
    OperationKind, OperationStatus,
};
