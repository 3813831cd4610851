//! Deferred transfer settlement
//!
//! A transfer is scheduled on the source account and settled on a tokio task
//! after the source's settlement delay. The outcome is never lost: it is
//! returned through the [`TransferHandle`] and written to the source's
//! pending journal entry. If the task is dropped before it settles (runtime
//! shutdown, abort, panic) the pending entry is marked `SettlementAborted`
//! even when nobody holds the handle.
//!
//! # Lock Ordering
//!
//! Settlement holds both account locks for the whole withdraw+deposit pair.
//! Locks are always taken in ascending account id order, so transfers running
//! in opposite directions between the same two accounts cannot deadlock.

use std::sync::{Arc, MutexGuard};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::account::{validate_amount, Account, AccountState};
use crate::types::{AccountId, LedgerError, OperationId, OperationKind, OperationStatus};

/// Record of a settled transfer
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Decimal,
    /// Journal entry on the source account
    pub withdraw_op: OperationId,
    /// Journal entry on the destination account
    pub deposit_op: OperationId,
    pub settled_at: DateTime<Utc>,
}

/// Caller-side handle to a scheduled transfer
///
/// Dropping the handle does not cancel the transfer; the outcome can still be
/// read from the source account's journal via [`TransferHandle::operation_id`].
#[derive(Debug)]
pub struct TransferHandle {
    source: Arc<Account>,
    operation: OperationId,
    join: JoinHandle<Result<TransferReceipt, LedgerError>>,
}

impl TransferHandle {
    /// Id of the pending withdraw entry on the source account
    pub fn operation_id(&self) -> OperationId {
        self.operation
    }

    pub fn source(&self) -> AccountId {
        self.source.id()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for settlement and return its outcome
    ///
    /// # Returns
    ///
    /// * `Ok(TransferReceipt)` - both legs were applied
    /// * `Err(LedgerError::InsufficientFunds)` - the source could not cover the amount
    /// * `Err(LedgerError::AccountClosed)` - either account was closed at settlement time
    /// * `Err(LedgerError::ArithmeticOverflow)` - the destination balance would overflow
    /// * `Err(LedgerError::SettlementAborted)` - the task panicked or its runtime shut down;
    ///   the pending entry is marked failed
    pub async fn outcome(self) -> Result<TransferReceipt, LedgerError> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => {
                let error = record_abort(&self.source, self.operation, &e.to_string());
                tracing::error!(
                    account = self.source.id(),
                    operation = self.operation,
                    error = %error,
                    "transfer settlement aborted"
                );
                Err(error)
            }
        }
    }
}

/// Mark a still-pending transfer entry as aborted
///
/// Returns the failure recorded in the journal, which may already have been
/// written by the settlement task's [`PendingGuard`].
fn record_abort(account: &Account, operation: OperationId, reason: &str) -> LedgerError {
    let error = LedgerError::settlement_aborted(account.id(), operation, reason);
    let mut state = account.lock();
    match state.operation(operation).map(|op| op.outcome().clone()) {
        Some(OperationStatus::Failed(recorded)) => recorded,
        Some(OperationStatus::Pending) => {
            state.set_status(operation, OperationStatus::Failed(error.clone()));
            error
        }
        _ => error,
    }
}

/// Fails the pending entry if the settlement future is dropped unfinished
///
/// Moved into the spawned future, so it also fires when the runtime shuts
/// down before the task was ever polled.
struct PendingGuard {
    source: Arc<Account>,
    operation: OperationId,
    armed: bool,
}

impl PendingGuard {
    fn new(source: Arc<Account>, operation: OperationId) -> Self {
        Self {
            source,
            operation,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.armed {
            let error = record_abort(
                &self.source,
                self.operation,
                "settlement task dropped before completion",
            );
            tracing::warn!(
                account = self.source.id(),
                operation = self.operation,
                error = %error,
                "transfer settlement dropped"
            );
        }
    }
}

/// Validate a transfer, record it as pending and spawn its settlement task
pub(crate) fn schedule(
    from: Arc<Account>,
    to: Arc<Account>,
    amount: Decimal,
) -> Result<TransferHandle, LedgerError> {
    if Arc::ptr_eq(&from, &to) || from.id() == to.id() {
        return Err(LedgerError::same_account(from.id()));
    }

    let runtime = Handle::try_current().map_err(|_| LedgerError::no_runtime(from.id()))?;

    let operation = {
        let mut state = from.lock();
        let checked = validate_amount(from.id(), amount, "transfer")
            .and_then(|()| state.ensure_open(from.id()));
        let status = match &checked {
            Ok(()) => OperationStatus::Pending,
            Err(e) => OperationStatus::Failed(e.clone()),
        };
        let id = state.record(OperationKind::Withdraw, amount, Some(to.id()), status);
        checked?;
        id
    };

    tracing::debug!(
        from = from.id(),
        to = to.id(),
        %amount,
        operation,
        delay_ms = from.settlement_delay().as_millis() as u64,
        "transfer scheduled"
    );

    let source = Arc::clone(&from);
    let guard = PendingGuard::new(Arc::clone(&from), operation);
    let join = runtime.spawn(async move {
        tokio::time::sleep(from.settlement_delay()).await;
        let result = settle(&from, &to, operation, amount);
        guard.disarm();
        result
    });

    Ok(TransferHandle {
        source,
        operation,
        join,
    })
}

/// Lock two distinct accounts in ascending id order
///
/// Returns the guards as (source, destination).
fn lock_pair<'a>(
    from: &'a Account,
    to: &'a Account,
) -> (MutexGuard<'a, AccountState>, MutexGuard<'a, AccountState>) {
    if from.id() < to.id() {
        let source = from.lock();
        let destination = to.lock();
        (source, destination)
    } else {
        let destination = to.lock();
        let source = from.lock();
        (source, destination)
    }
}

/// Apply both legs of a transfer, or neither
fn settle(
    from: &Account,
    to: &Account,
    operation: OperationId,
    amount: Decimal,
) -> Result<TransferReceipt, LedgerError> {
    let result = {
        let (mut source, mut destination) = lock_pair(from, to);

        let balances = source
            .debited(from.id(), amount)
            .and_then(|s| destination.credited(to.id(), amount).map(|d| (s, d)));

        match balances {
            Ok((source_balance, destination_balance)) => {
                source.balance = source_balance;
                destination.balance = destination_balance;
                source.set_status(operation, OperationStatus::Succeeded);
                let deposit_op = destination.record(
                    OperationKind::Deposit,
                    amount,
                    Some(from.id()),
                    OperationStatus::Succeeded,
                );
                Ok(TransferReceipt {
                    from: from.id(),
                    to: to.id(),
                    amount,
                    withdraw_op: operation,
                    deposit_op,
                    settled_at: Utc::now(),
                })
            }
            Err(e) => {
                source.set_status(operation, OperationStatus::Failed(e.clone()));
                Err(e)
            }
        }
    };

    match &result {
        Ok(_) => tracing::info!(from = from.id(), to = to.id(), %amount, "transfer settled"),
        Err(e) => {
            tracing::warn!(from = from.id(), to = to.id(), %amount, error = %e, "transfer failed")
        }
    }

    result
}
