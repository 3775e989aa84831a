//! Account Aggregate
//!
//! An account owns its balance and enforces the invariants around it:
//! only the owner mutates or reads it, the currency is fixed at creation,
//! and the balance never goes negative. The aggregate itself is plain data;
//! per-account serialization of mutations is provided by the store, which
//! keeps each account behind its own lock (see `uow::memory`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{CurrencyCode, FlowKind, Money};
use crate::error::{LedgerError, LedgerResult};

use super::transaction::TransactionRecord;

/// Account Aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    id: Uuid,
    user_id: Uuid,

    /// Balance in smallest currency units, never negative
    balance: i64,

    /// Fixed at creation
    currency: CurrencyCode,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with a zero balance
    pub fn new(user_id: Uuid, currency: CurrencyCode) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            balance: 0,
            currency,
            created_at: now,
            updated_at: now,
        }
    }

    /// Credit the account and return the ledger entry.
    ///
    /// Checks run in a fixed order: authorization, positivity, currency
    /// match, overflow. Nothing is applied unless all pass.
    pub fn deposit(
        &mut self,
        user_id: Uuid,
        money: &Money,
        flow: FlowKind,
        workflow_id: Uuid,
    ) -> LedgerResult<TransactionRecord> {
        self.authorize(user_id)?;
        self.check_amount(money)?;

        let new_balance = self
            .balance
            .checked_add(money.minor())
            .ok_or(LedgerError::AmountExceedsMaxSafeInt)?;

        self.balance = new_balance;
        self.updated_at = Utc::now();

        Ok(TransactionRecord::new(
            flow,
            workflow_id,
            self.user_id,
            self.id,
            money.minor(),
            new_balance,
            self.currency,
        ))
    }

    /// Debit the account and return the ledger entry (negative amount).
    pub fn withdraw(
        &mut self,
        user_id: Uuid,
        money: &Money,
        flow: FlowKind,
        workflow_id: Uuid,
    ) -> LedgerResult<TransactionRecord> {
        self.authorize(user_id)?;
        self.check_amount(money)?;

        if money.minor() > self.balance {
            return Err(LedgerError::InsufficientFunds {
                requested: money.minor(),
                available: self.balance,
            });
        }

        let new_balance = self.balance - money.minor();
        self.balance = new_balance;
        self.updated_at = Utc::now();

        Ok(TransactionRecord::new(
            flow,
            workflow_id,
            self.user_id,
            self.id,
            -money.minor(),
            new_balance,
            self.currency,
        ))
    }

    /// Authorized balance read
    pub fn balance_for(&self, user_id: Uuid) -> LedgerResult<Money> {
        self.authorize(user_id)?;
        Ok(Money::from_minor(self.balance, self.currency))
    }

    /// Whether the balance covers a debit of `money` in the account currency
    pub fn can_cover(&self, money: &Money) -> bool {
        money.currency() == self.currency && self.balance >= money.minor()
    }

    fn authorize(&self, user_id: Uuid) -> LedgerResult<()> {
        if user_id != self.user_id {
            return Err(LedgerError::Unauthorized {
                user_id,
                account_id: self.id,
            });
        }
        Ok(())
    }

    fn check_amount(&self, money: &Money) -> LedgerResult<()> {
        if !money.is_positive() {
            return Err(LedgerError::InvalidAmount(
                "amount must be positive".to_string(),
            ));
        }
        if money.currency() != self.currency {
            return Err(LedgerError::CurrencyMismatch {
                expected: self.currency,
                actual: money.currency(),
            });
        }
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn currency(&self) -> CurrencyCode {
        self.currency
    }

    pub fn balance_minor(&self) -> i64 {
        self.balance
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
