//! Validation handler
//!
//! First saga step. Checks the structural validity of a request against a
//! read-only unit-of-work lookup: positive amount, registered currency,
//! account exists and belongs to the requesting user, and for transfers a
//! distinct existing destination. A failure terminates the flow; no event
//! is emitted.

use std::sync::Arc;

use async_trait::async_trait;

use crate::bus::EventHandler;
use crate::domain::{CurrencyLookup, FlowKind, OperationContext, Stage, WorkflowEvent};
use crate::error::{LedgerError, LedgerResult};
use crate::uow::UnitOfWorkFactory;

pub struct ValidationHandler {
    uow: Arc<dyn UnitOfWorkFactory>,
    currencies: Arc<dyn CurrencyLookup>,
}

impl ValidationHandler {
    pub fn new(uow: Arc<dyn UnitOfWorkFactory>, currencies: Arc<dyn CurrencyLookup>) -> Self {
        Self { uow, currencies }
    }
}

#[async_trait]
impl EventHandler for ValidationHandler {
    fn name(&self) -> &'static str {
        "validation"
    }

    async fn handle(
        &self,
        ctx: &OperationContext,
        event: &WorkflowEvent,
    ) -> LedgerResult<Vec<WorkflowEvent>> {
        if ctx.is_expired() {
            return Err(LedgerError::DeadlineExceeded);
        }

        if !event.amount.is_positive() {
            return Err(LedgerError::InvalidAmount(
                "amount must be positive".to_string(),
            ));
        }
        self.currencies.get(event.amount.currency())?;

        let mut uow = self.uow.create();
        uow.begin().await?;
        let accounts = uow.accounts();

        let account = accounts.get(event.account_id).await?;
        if account.user_id() != event.user_id {
            uow.rollback().await?;
            return Err(LedgerError::Unauthorized {
                user_id: event.user_id,
                account_id: event.account_id,
            });
        }

        if event.flow == FlowKind::Transfer {
            let destination_id = event.destination_id.ok_or_else(|| {
                LedgerError::InvalidTransfer("transfer without a destination account".to_string())
            })?;
            if destination_id == event.account_id {
                uow.rollback().await?;
                return Err(LedgerError::InvalidTransfer(
                    "cannot transfer to the same account".to_string(),
                ));
            }
            // Transfers are denominated in the source account's currency
            if event.amount.currency() != account.currency() {
                uow.rollback().await?;
                return Err(LedgerError::CurrencyMismatch {
                    expected: account.currency(),
                    actual: event.amount.currency(),
                });
            }
            accounts.get(destination_id).await?;
        }

        uow.rollback().await?;

        tracing::debug!(
            flow = event.flow.as_str(),
            workflow_id = %event.workflow_id,
            account_id = %event.account_id,
            "request validated"
        );

        Ok(vec![event.advance(Stage::Validated)])
    }
}
