//! Concurrent account registry
//!
//! This module provides the `Ledger` struct, which owns every account of a
//! replay or service instance and routes operations to them by id.
//!
//! # Design
//!
//! Accounts are stored as `Arc<Account>` in a `DashMap`. Lookups clone the
//! `Arc` and release the map shard immediately, so an account's own mutex is
//! never acquired while a shard guard is held. This keeps the only lock
//! nesting in the system the ordered pair taken by transfer settlement.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;

use super::account::{Account, DEFAULT_SETTLEMENT_DELAY};
use super::settlement::TransferHandle;
use crate::types::{AccountHolder, AccountId, AccountSnapshot, LedgerError, OperationId};

/// Configuration shared by every account opened through a ledger
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerConfig {
    /// Wait applied before a transfer's withdraw/deposit pair executes
    pub settlement_delay: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            settlement_delay: DEFAULT_SETTLEMENT_DELAY,
        }
    }
}

impl LedgerConfig {
    pub fn new(settlement_delay: Duration) -> Self {
        Self { settlement_delay }
    }
}

/// Thread-safe registry of accounts
///
/// Share it as `Arc<Ledger>` across tasks; every method takes `&self`.
#[derive(Debug)]
pub struct Ledger {
    accounts: DashMap<AccountId, Arc<Account>>,
    /// Next sequential id; wider than `AccountId` so it never wraps
    next_id: AtomicU64,
    config: LedgerConfig,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            accounts: DashMap::new(),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Insert a new account under `id` unless the id is taken
    fn try_insert(&self, id: AccountId, holder: &Arc<AccountHolder>) -> Option<Arc<Account>> {
        let mut created = false;
        let account = Arc::clone(
            self.accounts
                .entry(id)
                .or_insert_with(|| {
                    created = true;
                    Arc::new(
                        Account::new(id, Arc::clone(holder), Utc::now())
                            .with_settlement_delay(self.config.settlement_delay),
                    )
                })
                .value(),
        );

        if created {
            tracing::debug!(account = id, holder = %holder, "account opened");
            Some(account)
        } else {
            None
        }
    }

    /// Open an account under the next free sequential id
    ///
    /// Ids taken through [`Ledger::open_account_with_id`] are skipped. Once the
    /// sequence passes `AccountId::MAX` every call returns
    /// `AccountIdsExhausted`; ids never wrap back to 0.
    pub fn open_account(
        &self,
        holder: impl Into<Arc<AccountHolder>>,
    ) -> Result<Arc<Account>, LedgerError> {
        let holder = holder.into();
        loop {
            let next = self.next_id.fetch_add(1, Ordering::Relaxed);
            let id = AccountId::try_from(next).map_err(|_| LedgerError::AccountIdsExhausted)?;
            if let Some(account) = self.try_insert(id, &holder) {
                return Ok(account);
            }
        }
    }

    /// Open an account under a caller-chosen id
    ///
    /// # Returns
    ///
    /// * `Ok(Arc<Account>)` - the new account
    /// * `Err(LedgerError::DuplicateAccount)` - the id is already taken
    pub fn open_account_with_id(
        &self,
        id: AccountId,
        holder: impl Into<Arc<AccountHolder>>,
    ) -> Result<Arc<Account>, LedgerError> {
        let account = self
            .try_insert(id, &holder.into())
            .ok_or_else(|| LedgerError::duplicate_account(id))?;
        self.next_id
            .fetch_max(u64::from(id) + 1, Ordering::Relaxed);
        Ok(account)
    }

    pub fn account(&self, id: AccountId) -> Result<Arc<Account>, LedgerError> {
        self.accounts
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    pub fn deposit(&self, id: AccountId, amount: Decimal) -> Result<OperationId, LedgerError> {
        self.account(id)?.deposit(amount)
    }

    pub fn withdraw(&self, id: AccountId, amount: Decimal) -> Result<OperationId, LedgerError> {
        self.account(id)?.withdraw(amount)
    }

    pub fn balance(&self, id: AccountId) -> Result<Decimal, LedgerError> {
        Ok(self.account(id)?.get_balance())
    }

    /// Close an account; it stays registered and keeps its balance
    pub fn close_account(&self, id: AccountId) -> Result<(), LedgerError> {
        self.account(id)?.close(Utc::now())?;
        tracing::debug!(account = id, "account closed");
        Ok(())
    }

    /// Schedule a transfer between two registered accounts
    ///
    /// See [`Account::transfer`]. Must be called from within a tokio runtime.
    pub fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<TransferHandle, LedgerError> {
        let source = self.account(from)?;
        let destination = self.account(to)?;
        source.transfer(&destination, amount)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Snapshot every account, sorted by id
    pub fn snapshots(&self) -> Vec<AccountSnapshot> {
        let accounts: Vec<Arc<Account>> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut snapshots: Vec<AccountSnapshot> =
            accounts.iter().map(|account| account.snapshot()).collect();
        snapshots.sort_by_key(|snapshot| snapshot.account);
        snapshots
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}
