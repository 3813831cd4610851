//! Account-related types for the account ledger
//!
//! The live, lock-guarded account lives in [`crate::core::account`]. This
//! module holds the identifier type and the plain snapshot used for output.

use rust_decimal::Decimal;

/// Account identifier
///
/// Supports account IDs from 0 to 4,294,967,295
pub type AccountId = u32;

/// Point-in-time view of an account
///
/// Produced by [`crate::core::Ledger::snapshots`] and consumed by the CSV
/// writer. Taking a snapshot holds the account lock only while copying.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    /// The account ID
    pub account: AccountId,

    /// Display name of the holder ("Last, First")
    pub holder: String,

    /// Balance at the time of the snapshot
    pub balance: Decimal,

    /// Whether the account had a closing time set
    pub closed: bool,
}
