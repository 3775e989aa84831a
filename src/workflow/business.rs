//! Business validation handler
//!
//! Gate between the ledger work and payment initiation. Runs on
//! `conversion_done`, and on `validated` for flows that need no conversion.
//! Rules here need the amount in account currency: a debit whose ledger
//! mutation is still pending (transfer legs, converted withdrawals) must be
//! covered by the current balance, and a same-currency deposit/withdraw must
//! actually have its ledger entry committed before any real money moves.

use std::sync::Arc;

use async_trait::async_trait;

use crate::bus::EventHandler;
use crate::domain::{FlowKind, Money, OperationContext, Stage, WorkflowEvent};
use crate::error::{LedgerError, LedgerResult};
use crate::uow::UnitOfWorkFactory;

pub struct BusinessValidationHandler {
    uow: Arc<dyn UnitOfWorkFactory>,
}

impl BusinessValidationHandler {
    pub fn new(uow: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl EventHandler for BusinessValidationHandler {
    fn name(&self) -> &'static str {
        "business-validation"
    }

    async fn handle(
        &self,
        ctx: &OperationContext,
        event: &WorkflowEvent,
    ) -> LedgerResult<Vec<WorkflowEvent>> {
        if ctx.is_expired() {
            return Err(LedgerError::DeadlineExceeded);
        }

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

        if event.stage == Stage::Validated {
            // When a conversion is still ahead of us this branch stays
            // silent; the flow re-enters here at conversion_done.
            let target = match event.flow {
                FlowKind::Transfer => {
                    let destination_id = event.destination_id.ok_or_else(|| {
                        LedgerError::InvalidTransfer(
                            "transfer without a destination account".to_string(),
                        )
                    })?;
                    accounts.get(destination_id).await?.currency()
                }
                _ => account.currency(),
            };
            if target != event.amount.currency() {
                uow.rollback().await?;
                return Ok(vec![]);
            }

            // Same-currency deposit/withdraw: the persistence step must have
            // committed its ledger entry before real money moves.
            if event.flow != FlowKind::Transfer {
                let persisted = !uow
                    .transactions()
                    .find_by_workflow(event.workflow_id)
                    .await?
                    .is_empty();
                if !persisted {
                    uow.rollback().await?;
                    return Err(LedgerError::Transaction(
                        "ledger persistence did not complete".to_string(),
                    ));
                }
            }
        }

        // Debits not yet applied to the ledger must fit the current balance
        let pending_debit: Option<Money> = match event.flow {
            FlowKind::Transfer => Some(event.amount),
            FlowKind::Withdraw if event.conversion.is_some() => Some(event.effective_amount()),
            _ => None,
        };
        if let Some(needed) = pending_debit {
            if !account.can_cover(&needed) {
                uow.rollback().await?;
                return Err(LedgerError::InsufficientFunds {
                    requested: needed.minor(),
                    available: account.balance_minor(),
                });
            }
        }

        uow.rollback().await?;

        tracing::debug!(
            flow = event.flow.as_str(),
            workflow_id = %event.workflow_id,
            "business rules validated"
        );

        Ok(vec![event.advance(Stage::BusinessValidated)])
    }
}
