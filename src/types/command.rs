//! Replay commands
//!
//! A [`LedgerCommand`] is one parsed row of a replay script. Each variant
//! maps onto a single [`crate::core::Ledger`] call.

use rust_decimal::Decimal;

use super::account::AccountId;

/// A single ledger action read from a replay script
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCommand {
    /// Register a new account under an explicit id
    Open {
        account: AccountId,
        last_name: String,
        first_name: String,
        credit_rating: i32,
    },

    /// Credit funds to an account
    Deposit { account: AccountId, amount: Decimal },

    /// Debit funds from an account if the balance covers it
    Withdraw { account: AccountId, amount: Decimal },

    /// Schedule a delayed transfer between two accounts
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    },

    /// Set the closing time of an account
    Close { account: AccountId },
}

impl LedgerCommand {
    /// Account the command is issued against (the source for transfers)
    pub fn account(&self) -> AccountId {
        match self {
            LedgerCommand::Open { account, .. }
            | LedgerCommand::Deposit { account, .. }
            | LedgerCommand::Withdraw { account, .. }
            | LedgerCommand::Close { account } => *account,
            LedgerCommand::Transfer { from, .. } => *from,
        }
    }
}
