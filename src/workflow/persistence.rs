//! Persistence handler
//!
//! Second saga step. For a same-currency deposit or withdrawal it applies
//! the aggregate inside a unit of work and commits the ledger entry. When
//! the requested currency differs from the account's, the balance mutation
//! is deferred: the handler emits `conversion_requested` instead. Transfers
//! never mutate here; both legs are applied together in final persistence,
//! so the handler only raises the conversion request when the destination
//! currency differs.

use std::sync::Arc;

use async_trait::async_trait;

use crate::bus::EventHandler;
use crate::domain::{FlowKind, OperationContext, Stage, WorkflowEvent};
use crate::error::{LedgerError, LedgerResult};
use crate::uow::UnitOfWorkFactory;

pub struct PersistenceHandler {
    uow: Arc<dyn UnitOfWorkFactory>,
}

impl PersistenceHandler {
    pub fn new(uow: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl EventHandler for PersistenceHandler {
    fn name(&self) -> &'static str {
        "persistence"
    }

    async fn handle(
        &self,
        ctx: &OperationContext,
        event: &WorkflowEvent,
    ) -> LedgerResult<Vec<WorkflowEvent>> {
        if ctx.is_expired() {
            return Err(LedgerError::DeadlineExceeded);
        }

        if event.flow == FlowKind::Transfer {
            let destination_id = event.destination_id.ok_or_else(|| {
                LedgerError::InvalidTransfer("transfer without a destination account".to_string())
            })?;

            let mut uow = self.uow.create();
            uow.begin().await?;
            let destination = uow.accounts().get(destination_id).await?;
            uow.rollback().await?;

            if destination.currency() != event.amount.currency() {
                return Ok(vec![event
                    .advance(Stage::ConversionRequested)
                    .with_target_currency(destination.currency())]);
            }
            // Same currency on both legs: nothing to persist yet
            return Ok(vec![]);
        }

        let mut uow = self.uow.create();
        uow.begin().await?;
        let accounts = uow.accounts();

        let account = accounts.get(event.account_id).await?;
        if account.currency() != event.amount.currency() {
            uow.rollback().await?;
            return Ok(vec![event
                .advance(Stage::ConversionRequested)
                .with_target_currency(account.currency())]);
        }

        // Same currency: apply the aggregate under the row lock and commit
        let mut account = accounts.get_for_update(event.account_id).await?;
        let record = match event.flow {
            FlowKind::Deposit => {
                account.deposit(event.user_id, &event.amount, event.flow, event.workflow_id)?
            }
            FlowKind::Withdraw | FlowKind::Transfer => {
                account.withdraw(event.user_id, &event.amount, event.flow, event.workflow_id)?
            }
        };
        let transaction_id = record.id;

        accounts.update(account).await?;
        uow.transactions().create(record).await?;
        uow.commit().await?;

        tracing::info!(
            flow = event.flow.as_str(),
            workflow_id = %event.workflow_id,
            account_id = %event.account_id,
            %transaction_id,
            "ledger mutation committed"
        );

        Ok(vec![event
            .advance(Stage::Persisted)
            .with_transaction(transaction_id)])
    }
}
