//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `holder`: Account holder identity
//! - `account`: Account identifiers and snapshots
//! - `command`: Parsed replay script rows
//! - `operation`: Journal records for balance-affecting actions
//! - `error`: Error types for the ledger

pub mod account;
pub mod command;
pub mod error;
pub mod holder;
pub mod operation;

pub use account::{AccountId, AccountSnapshot};
pub use command::LedgerCommand;
pub use error::LedgerError;
pub use holder::AccountHolder;
pub use operation::{Operation, OperationId, OperationKind, OperationStatus};
