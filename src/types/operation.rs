//! Operation records for the per-account journal
//!
//! Every deposit, withdrawal and transfer leg produces exactly one
//! [`Operation`]. Its status is written under the same account lock as the
//! balance change it describes, so a reader never sees a balance that
//! disagrees with the journal.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::account::AccountId;
use super::error::LedgerError;

/// Per-account operation sequence number, starting at 1
pub type OperationId = u64;

/// Kind of balance-affecting action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Credit funds to the account
    ///
    /// Also used for the receiving leg of a transfer.
    Deposit,

    /// Debit funds from the account
    ///
    /// Also used for the sending leg of a transfer.
    Withdraw,
}

/// Outcome of an operation
#[derive(Debug, Clone, PartialEq)]
pub enum OperationStatus {
    /// Recorded, not yet applied (transfers awaiting settlement)
    Pending,

    /// Applied to the balance
    Succeeded,

    /// Rejected; the balance was left unchanged
    Failed(LedgerError),
}

/// A recorded attempt at a balance-affecting action
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    id: OperationId,
    kind: OperationKind,
    amount: Decimal,
    counterparty: Option<AccountId>,
    created_at: DateTime<Utc>,
    status: OperationStatus,
}

impl Operation {
    pub fn new(
        id: OperationId,
        kind: OperationKind,
        amount: Decimal,
        counterparty: Option<AccountId>,
        created_at: DateTime<Utc>,
        status: OperationStatus,
    ) -> Self {
        Self {
            id,
            kind,
            amount,
            counterparty,
            created_at,
            status,
        }
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// The other account of a transfer leg, `None` for direct deposits and withdrawals
    pub fn counterparty(&self) -> Option<AccountId> {
        self.counterparty
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn outcome(&self) -> &OperationStatus {
        &self.status
    }

    /// `true` only once the operation has been applied
    pub fn status(&self) -> bool {
        matches!(self.status, OperationStatus::Succeeded)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, OperationStatus::Pending)
    }

    pub fn set_status(&mut self, status: OperationStatus) {
        self.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn operation(status: OperationStatus) -> Operation {
        Operation::new(
            1,
            OperationKind::Withdraw,
            Decimal::new(500, 1),
            Some(2),
            Utc::now(),
            status,
        )
    }

    #[rstest]
    #[case::pending(OperationStatus::Pending, false, true)]
    #[case::succeeded(OperationStatus::Succeeded, true, false)]
    #[case::failed(
        OperationStatus::Failed(LedgerError::insufficient_funds(1, Decimal::ZERO, Decimal::ONE)),
        false,
        false
    )]
    fn test_status_flags(
        #[case] status: OperationStatus,
        #[case] succeeded: bool,
        #[case] pending: bool,
    ) {
        let op = operation(status);
        assert_eq!(op.status(), succeeded);
        assert_eq!(op.is_pending(), pending);
    }

    #[test]
    fn test_set_status_is_late_bound() {
        let mut op = operation(OperationStatus::Pending);
        op.set_status(OperationStatus::Succeeded);

        assert!(op.status());
        assert_eq!(op.kind(), OperationKind::Withdraw);
        assert_eq!(op.amount(), Decimal::new(500, 1));
        assert_eq!(op.counterparty(), Some(2));
    }
}
