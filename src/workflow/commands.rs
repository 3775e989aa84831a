//! Command definitions
//!
//! Commands represent intentions to move money. Amounts travel as decimal
//! strings and are parsed exactly once at the engine boundary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Command to deposit into an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositCommand {
    pub user_id: Uuid,
    pub account_id: Uuid,

    /// Amount as a decimal string for precise parsing
    pub amount: String,

    /// ISO-4217 code of the requested amount
    pub currency: String,

    /// Payment source on the external rail (card token, IBAN, ...)
    pub source: Option<String>,
}

impl DepositCommand {
    pub fn new(user_id: Uuid, account_id: Uuid, amount: String, currency: String) -> Self {
        Self {
            user_id,
            account_id,
            amount,
            currency,
            source: None,
        }
    }

    pub fn with_source(mut self, source: String) -> Self {
        self.source = Some(source);
        self
    }
}

/// Command to withdraw from an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawCommand {
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub amount: String,
    pub currency: String,

    /// Payout destination on the external rail
    pub target: Option<String>,
}

impl WithdrawCommand {
    pub fn new(user_id: Uuid, account_id: Uuid, amount: String, currency: String) -> Self {
        Self {
            user_id,
            account_id,
            amount,
            currency,
            target: None,
        }
    }

    pub fn with_target(mut self, target: String) -> Self {
        self.target = Some(target);
        self
    }
}

/// Command to transfer between two accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCommand {
    pub user_id: Uuid,
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,

    /// Amount in the source account's currency
    pub amount: String,
    pub currency: String,
}

impl TransferCommand {
    pub fn new(
        user_id: Uuid,
        from_account_id: Uuid,
        to_account_id: Uuid,
        amount: String,
        currency: String,
    ) -> Self {
        Self {
            user_id,
            from_account_id,
            to_account_id,
            amount,
            currency,
        }
    }
}
