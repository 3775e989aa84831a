//! Workflow Events
//!
//! Events are immutable facts describing the progress of one money-movement
//! workflow. A workflow is the ordered sequence of events a single user
//! request produces; the event bus routes them by type name
//! (`"<flow>.<stage>"`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::currency::CurrencyCode;
use super::money::Money;

/// The three money-movement flows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Deposit,
    Withdraw,
    Transfer,
}

impl FlowKind {
    pub const ALL: [FlowKind; 3] = [FlowKind::Deposit, FlowKind::Withdraw, FlowKind::Transfer];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowKind::Deposit => "deposit",
            FlowKind::Withdraw => "withdraw",
            FlowKind::Transfer => "transfer",
        }
    }
}

/// Saga stages a workflow moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Requested,
    Validated,
    Persisted,
    ConversionRequested,
    ConversionDone,
    BusinessValidated,
    PaymentInitiated,
    PaymentPersisted,
    PaymentCompleted,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::Requested,
        Stage::Validated,
        Stage::Persisted,
        Stage::ConversionRequested,
        Stage::ConversionDone,
        Stage::BusinessValidated,
        Stage::PaymentInitiated,
        Stage::PaymentPersisted,
        Stage::PaymentCompleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Requested => "requested",
            Stage::Validated => "validated",
            Stage::Persisted => "persisted",
            Stage::ConversionRequested => "conversion_requested",
            Stage::ConversionDone => "conversion_done",
            Stage::BusinessValidated => "business_validated",
            Stage::PaymentInitiated => "payment_initiated",
            Stage::PaymentPersisted => "payment_persisted",
            Stage::PaymentCompleted => "payment_completed",
        }
    }
}

/// Event type name for a flow/stage pair
pub fn event_type(flow: FlowKind, stage: Stage) -> String {
    format!("{}.{}", flow.as_str(), stage.as_str())
}

/// Result of converting an amount into another currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    /// Amount as originally requested
    pub original: Money,

    /// Amount in the target currency
    pub converted: Money,

    /// Rate applied (target units per original unit)
    pub rate: Decimal,
}

/// One immutable fact in a money-movement workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub workflow_id: Uuid,
    pub flow: FlowKind,
    pub stage: Stage,
    pub user_id: Uuid,
    pub account_id: Uuid,

    /// Amount as requested by the user
    pub amount: Money,

    /// Credit-side account for transfers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_id: Option<Uuid>,

    /// External payment rail target (IBAN, card token, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_target: Option<String>,

    /// Currency the pending conversion must produce
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_currency: Option<CurrencyCode>,

    /// Conversion result, threaded forward once available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion: Option<ConversionOutcome>,

    /// Ledger transaction written for this workflow, once persisted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<Uuid>,

    /// Provider-assigned payment id, once initiated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,

    pub occurred_at: DateTime<Utc>,
}

impl WorkflowEvent {
    /// Starting event of a new workflow
    pub fn requested(flow: FlowKind, user_id: Uuid, account_id: Uuid, amount: Money) -> Self {
        Self {
            workflow_id: Uuid::new_v4(),
            flow,
            stage: Stage::Requested,
            user_id,
            account_id,
            amount,
            destination_id: None,
            external_target: None,
            target_currency: None,
            conversion: None,
            transaction_id: None,
            payment_id: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn event_type(&self) -> String {
        event_type(self.flow, self.stage)
    }

    /// Follow-up event at the next stage, carrying everything forward
    pub fn advance(&self, stage: Stage) -> Self {
        let mut next = self.clone();
        next.stage = stage;
        next.occurred_at = Utc::now();
        next
    }

    pub fn with_destination(mut self, destination_id: Uuid) -> Self {
        self.destination_id = Some(destination_id);
        self
    }

    pub fn with_target_currency(mut self, currency: CurrencyCode) -> Self {
        self.target_currency = Some(currency);
        self
    }

    pub fn with_conversion(mut self, conversion: ConversionOutcome) -> Self {
        self.conversion = Some(conversion);
        self
    }

    pub fn with_transaction(mut self, transaction_id: Uuid) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    pub fn with_payment(mut self, payment_id: impl Into<String>) -> Self {
        self.payment_id = Some(payment_id.into());
        self
    }

    /// Amount the ledger mutation must apply: the converted amount when a
    /// conversion ran, the requested amount otherwise.
    pub fn effective_amount(&self) -> Money {
        self.conversion
            .as_ref()
            .map(|outcome| outcome.converted)
            .unwrap_or(self.amount)
    }
}
