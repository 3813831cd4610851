//! Lock-guarded account with an operation journal
//!
//! This module provides the `Account` struct. Each account owns one mutex
//! that guards its balance, closing time and journal together.
//!
//! # Design
//!
//! Balance changes are computed first (`credited` / `debited` return the new
//! balance without mutating) and only assigned once every check has passed.
//! The journal entry describing the change is written while the same guard is
//! held, so the journal always agrees with the balance.
//!
//! # Thread Safety
//!
//! `Account` is `Send + Sync` and is shared as `Arc<Account>`. Deposits,
//! withdrawals and reads on the same account are serialized by its mutex;
//! operations on different accounts never contend. Transfers take two locks
//! in ascending account id order (see [`crate::core::settlement`]).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::settlement::{self, TransferHandle};
use crate::types::{
    AccountHolder, AccountId, AccountSnapshot, LedgerError, Operation, OperationId, OperationKind,
    OperationStatus,
};

/// Wait applied before a transfer's withdraw/deposit pair executes
pub const DEFAULT_SETTLEMENT_DELAY: Duration = Duration::from_secs(3);

/// Mutable account state, only reachable through the account's lock
#[derive(Debug, Default)]
pub(crate) struct AccountState {
    pub(crate) balance: Decimal,
    pub(crate) closed_at: Option<DateTime<Utc>>,
    journal: Vec<Operation>,
}

impl AccountState {
    /// Append a journal entry and return its id
    pub(crate) fn record(
        &mut self,
        kind: OperationKind,
        amount: Decimal,
        counterparty: Option<AccountId>,
        status: OperationStatus,
    ) -> OperationId {
        let id = self.journal.len() as OperationId + 1;
        self.journal.push(Operation::new(
            id,
            kind,
            amount,
            counterparty,
            Utc::now(),
            status,
        ));
        id
    }

    /// Update the status of an existing entry; unknown ids are ignored
    pub(crate) fn set_status(&mut self, id: OperationId, status: OperationStatus) {
        if let Some(op) = id
            .checked_sub(1)
            .and_then(|index| self.journal.get_mut(index as usize))
        {
            op.set_status(status);
        }
    }

    pub(crate) fn operation(&self, id: OperationId) -> Option<&Operation> {
        id.checked_sub(1)
            .and_then(|index| self.journal.get(index as usize))
    }

    pub(crate) fn ensure_open(&self, account: AccountId) -> Result<(), LedgerError> {
        match self.closed_at {
            Some(_) => Err(LedgerError::account_closed(account)),
            None => Ok(()),
        }
    }

    /// Balance after crediting `amount`, without applying it
    pub(crate) fn credited(&self, account: AccountId, amount: Decimal) -> Result<Decimal, LedgerError> {
        self.ensure_open(account)?;
        self.balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow("deposit", account))
    }

    /// Balance after debiting `amount`, without applying it
    pub(crate) fn debited(&self, account: AccountId, amount: Decimal) -> Result<Decimal, LedgerError> {
        self.ensure_open(account)?;
        if self.balance < amount {
            return Err(LedgerError::insufficient_funds(
                account,
                self.balance,
                amount,
            ));
        }
        self.balance
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow("withdraw", account))
    }
}

/// Reject zero and negative amounts
pub(crate) fn validate_amount(
    account: AccountId,
    amount: Decimal,
    operation: &str,
) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::invalid_amount(account, amount, operation));
    }
    Ok(())
}

fn status_of<T>(result: &Result<T, LedgerError>) -> OperationStatus {
    match result {
        Ok(_) => OperationStatus::Succeeded,
        Err(e) => OperationStatus::Failed(e.clone()),
    }
}

/// A single account holding a balance
///
/// Created through [`crate::core::Ledger::open_account`] or directly with
/// [`Account::new`] when no registry is needed.
#[derive(Debug)]
pub struct Account {
    id: AccountId,
    holder: Arc<AccountHolder>,
    opened_at: DateTime<Utc>,
    settlement_delay: Duration,
    state: Mutex<AccountState>,
}

impl Account {
    /// Create an open account with a zero balance
    pub fn new(
        id: AccountId,
        holder: impl Into<Arc<AccountHolder>>,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            holder: holder.into(),
            opened_at,
            settlement_delay: DEFAULT_SETTLEMENT_DELAY,
            state: Mutex::new(AccountState::default()),
        }
    }

    /// Override the delay applied to transfers sent from this account
    pub fn with_settlement_delay(mut self, settlement_delay: Duration) -> Self {
        self.settlement_delay = settlement_delay;
        self
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn holder(&self) -> &AccountHolder {
        &self.holder
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn settlement_delay(&self) -> Duration {
        self.settlement_delay
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.lock().closed_at
    }

    /// Acquire the account lock
    ///
    /// Every critical section assigns state only after all fallible checks,
    /// so a poisoned lock still guards consistent data and is recovered.
    pub(crate) fn lock(&self) -> MutexGuard<'_, AccountState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Credit `amount` to the account
    ///
    /// # Returns
    ///
    /// * `Ok(OperationId)` - id of the journal entry recording the deposit
    /// * `Err(LedgerError::InvalidAmount)` - if `amount <= 0`
    /// * `Err(LedgerError::AccountClosed)` - if the account has been closed
    /// * `Err(LedgerError::ArithmeticOverflow)` - if the balance would overflow
    ///
    /// Rejected attempts are journaled with a `Failed` status.
    pub fn deposit(&self, amount: Decimal) -> Result<OperationId, LedgerError> {
        let mut state = self.lock();

        let result = validate_amount(self.id, amount, "deposit")
            .and_then(|()| state.credited(self.id, amount));
        if let Ok(balance) = result {
            state.balance = balance;
        }

        let id = state.record(OperationKind::Deposit, amount, None, status_of(&result));
        result.map(|_| id)
    }

    /// Debit `amount` from the account if the balance covers it
    ///
    /// # Returns
    ///
    /// * `Ok(OperationId)` - id of the journal entry recording the withdrawal
    /// * `Err(LedgerError::InsufficientFunds)` - balance is below `amount`; nothing changes
    /// * `Err(LedgerError::InvalidAmount)` - if `amount <= 0`
    /// * `Err(LedgerError::AccountClosed)` - if the account has been closed
    pub fn withdraw(&self, amount: Decimal) -> Result<OperationId, LedgerError> {
        let mut state = self.lock();

        let result = validate_amount(self.id, amount, "withdraw")
            .and_then(|()| state.debited(self.id, amount));
        if let Ok(balance) = result {
            state.balance = balance;
        }

        let id = state.record(OperationKind::Withdraw, amount, None, status_of(&result));
        if let Err(e) = &result {
            tracing::debug!(account = self.id, %amount, error = %e, "withdraw rejected");
        }
        result.map(|_| id)
    }

    /// Boolean form of [`Account::withdraw`]
    pub fn try_withdraw(&self, amount: Decimal) -> bool {
        self.withdraw(amount).is_ok()
    }

    pub fn get_balance(&self) -> Decimal {
        self.lock().balance
    }

    /// Set the closing time
    ///
    /// A closed account rejects deposits, withdrawals and both legs of a
    /// transfer. Closing twice is an error.
    pub fn close(&self, at: DateTime<Utc>) -> Result<(), LedgerError> {
        let mut state = self.lock();
        state.ensure_open(self.id)?;
        state.closed_at = Some(at);
        Ok(())
    }

    /// Schedule a transfer of `amount` to `to`
    ///
    /// A `Pending` withdraw entry is recorded on this account right away.
    /// After the settlement delay both legs are applied under both account
    /// locks, or neither is. The returned handle resolves to the outcome,
    /// which is also written to the pending journal entry.
    ///
    /// Must be called from within a tokio runtime; otherwise `NoRuntime` is
    /// returned and nothing is journaled.
    pub fn transfer(
        self: &Arc<Self>,
        to: &Arc<Account>,
        amount: Decimal,
    ) -> Result<TransferHandle, LedgerError> {
        settlement::schedule(Arc::clone(self), Arc::clone(to), amount)
    }

    /// Copy of a single journal entry
    pub fn operation(&self, id: OperationId) -> Option<Operation> {
        self.lock().operation(id).cloned()
    }

    /// Copy of the whole journal, oldest first
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().journal.clone()
    }

    pub fn snapshot(&self) -> AccountSnapshot {
        let state = self.lock();
        AccountSnapshot {
            account: self.id,
            holder: self.holder.to_string(),
            balance: state.balance,
            closed: state.closed_at.is_some(),
        }
    }
}
