//! Ledger transactions
//!
//! One record per successful account mutation. Financial fields are written
//! once and never change; the payment id and settlement status are workflow
//! annotations added as the saga progresses.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{CurrencyCode, FlowKind, Money};

/// Settlement state of a ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Recorded, external payment not yet confirmed
    Pending,

    /// Payment provider confirmed completion
    Settled,
}

/// Requested amount and rate behind a cross-currency mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginalAmount {
    pub amount: Money,
    pub rate: Decimal,
}

/// Append-only ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,

    /// Workflow that produced this entry
    pub workflow_id: Uuid,

    pub flow: FlowKind,
    pub user_id: Uuid,
    pub account_id: Uuid,

    /// Signed amount in smallest units: positive credits, negative debits
    pub amount: i64,

    /// Balance snapshot after applying the mutation
    pub balance_after: i64,

    pub currency: CurrencyCode,

    /// Present for cross-currency operations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<OriginalAmount>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,

    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub(crate) fn new(
        flow: FlowKind,
        workflow_id: Uuid,
        user_id: Uuid,
        account_id: Uuid,
        amount: i64,
        balance_after: i64,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id,
            flow,
            user_id,
            account_id,
            amount,
            balance_after,
            currency,
            original: None,
            payment_id: None,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn with_original(mut self, amount: Money, rate: Decimal) -> Self {
        self.original = Some(OriginalAmount { amount, rate });
        self
    }

    pub fn with_payment(mut self, payment_id: impl Into<String>) -> Self {
        self.payment_id = Some(payment_id.into());
        self
    }

    pub fn settle(&mut self) {
        self.status = TransactionStatus::Settled;
    }

    pub fn is_settled(&self) -> bool {
        self.status == TransactionStatus::Settled
    }

    pub fn is_credit(&self) -> bool {
        self.amount > 0
    }
}
