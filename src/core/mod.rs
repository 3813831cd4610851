//! Core business logic module
//!
//! This module contains the ledger components:
//! - `account` - Lock-guarded account with balance, closing time and journal
//! - `settlement` - Deferred transfer settlement and its caller-side handle
//! - `ledger` - Concurrent registry routing operations to accounts by id

pub mod account;
pub mod ledger;
pub mod settlement;

pub use account::{Account, DEFAULT_SETTLEMENT_DELAY};
pub use ledger::{Ledger, LedgerConfig};
pub use settlement::{TransferHandle, TransferReceipt};
