//! Error types for the account ledger
//!
//! Every balance-affecting operation reports through [`LedgerError`], including
//! transfers that settle on a background task. Errors are `Clone` so the same
//! value can be stored in an operation journal and returned to the caller.
//!
//! # Error Categories
//!
//! - **Validation Errors**: invalid amounts, same-account transfers
//! - **Account Errors**: insufficient funds, closed, missing or duplicate
//!   accounts, exhausted id space
//! - **Arithmetic Errors**: overflow in balance calculations
//! - **Settlement Errors**: a transfer task that never reported back, or no
//!   runtime to run it on
//! - **Replay Errors**: file and CSV problems in the replay binary

use rust_decimal::Decimal;
use thiserror::Error;

use super::account::AccountId;

/// Main error type for the ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Amount is zero or negative
    ///
    /// Deposits, withdrawals and transfers all require a strictly positive amount.
    #[error("Invalid amount {amount} for {operation} on account {account}")]
    InvalidAmount {
        /// Account the operation targeted
        account: AccountId,
        /// The rejected amount
        amount: Decimal,
        /// Operation that was attempted
        operation: String,
    },

    /// Insufficient funds for a withdrawal or transfer
    ///
    /// The balance is left untouched.
    #[error(
        "Insufficient funds on account {account}: available {available}, requested {requested}"
    )]
    InsufficientFunds {
        /// Account that was debited
        account: AccountId,
        /// Balance at the time of the attempt
        available: Decimal,
        /// Requested amount
        requested: Decimal,
    },

    /// Account has a closing time and accepts no further operations
    #[error("Account {account} is closed")]
    AccountClosed {
        /// Closed account
        account: AccountId,
    },

    /// No account with this id is registered in the ledger
    #[error("Account {account} not found")]
    AccountNotFound {
        /// Missing account id
        account: AccountId,
    },

    /// An account with this id already exists
    #[error("Account {account} already exists")]
    DuplicateAccount {
        /// Duplicated account id
        account: AccountId,
    },

    /// Source and destination of a transfer are the same account
    #[error("Cannot transfer from account {account} to itself")]
    SameAccount {
        /// The account used on both sides
        account: AccountId,
    },

    /// Arithmetic overflow would occur
    #[error("Arithmetic overflow in {operation} on account {account}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Account id
        account: AccountId,
    },

    /// The settlement task panicked or was aborted before reporting an outcome
    #[error("Settlement of operation {operation} on account {account} aborted: {reason}")]
    SettlementAborted {
        /// Source account of the transfer
        account: AccountId,
        /// Pending operation id on the source account
        operation: u64,
        /// Reason reported by the runtime
        reason: String,
    },

    /// A transfer was scheduled with no tokio runtime to settle it
    #[error("Transfer from account {account} requires a running tokio runtime")]
    NoRuntime {
        /// Source account of the transfer
        account: AccountId,
    },

    /// Every account id has been handed out
    #[error("No account ids left to assign")]
    AccountIdsExhausted,

    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// A replay command could not be parsed
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl From<csv_async::Error> for LedgerError {
    fn from(error: csv_async::Error) -> Self {
        LedgerError::ParseError {
            line: None,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    /// Create an InvalidAmount error
    pub fn invalid_amount(account: AccountId, amount: Decimal, operation: &str) -> Self {
        LedgerError::InvalidAmount {
            account,
            amount,
            operation: operation.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account: AccountId, available: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientFunds {
            account,
            available,
            requested,
        }
    }

    /// Create an AccountClosed error
    pub fn account_closed(account: AccountId) -> Self {
        LedgerError::AccountClosed { account }
    }

    /// Create an AccountNotFound error
    pub fn account_not_found(account: AccountId) -> Self {
        LedgerError::AccountNotFound { account }
    }

    /// Create a DuplicateAccount error
    pub fn duplicate_account(account: AccountId) -> Self {
        LedgerError::DuplicateAccount { account }
    }

    /// Create a SameAccount error
    pub fn same_account(account: AccountId) -> Self {
        LedgerError::SameAccount { account }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account: AccountId) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account,
        }
    }

    /// Create a SettlementAborted error
    pub fn settlement_aborted(account: AccountId, operation: u64, reason: &str) -> Self {
        LedgerError::SettlementAborted {
            account,
            operation,
            reason: reason.to_string(),
        }
    }

    /// Create a NoRuntime error
    pub fn no_runtime(account: AccountId) -> Self {
        LedgerError::NoRuntime { account }
    }

    /// Create a ParseError without line information
    pub fn parse(message: impl Into<String>) -> Self {
        LedgerError::ParseError {
            line: None,
            message: message.into(),
        }
    }
}
