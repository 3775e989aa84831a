//! Final persistence and settlement handlers
//!
//! `FinalPersistenceHandler` closes the money-movement part of the saga on
//! `payment_initiated`: it attaches the payment id to the ledger entry of a
//! same-currency flow, applies the deferred mutation of a cross-currency
//! flow, and applies both transfer legs inside one unit of work so either
//! both commit or neither does. `SettlementHandler` reacts to the webhook's
//! `payment_completed` and marks the workflow's entries settled.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::aggregate::TransactionRecord;
use crate::bus::EventHandler;
use crate::domain::{FlowKind, OperationContext, Stage, WorkflowEvent};
use crate::error::{LedgerError, LedgerResult};
use crate::uow::{UnitOfWork, UnitOfWorkFactory};

pub struct FinalPersistenceHandler {
    uow: Arc<dyn UnitOfWorkFactory>,
}

impl FinalPersistenceHandler {
    pub fn new(uow: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow }
    }

    /// Deposit/withdraw close-out: annotate the committed entry, or apply
    /// the deferred cross-currency mutation now.
    async fn finalize_single(
        &self,
        uow: &mut Box<dyn UnitOfWork>,
        event: &WorkflowEvent,
        payment_id: &str,
    ) -> LedgerResult<Uuid> {
        let transactions = uow.transactions();
        let mut existing = transactions.find_by_workflow(event.workflow_id).await?;

        if let Some(mut record) = existing.pop() {
            let transaction_id = record.id;
            record.payment_id = Some(payment_id.to_string());
            transactions.update(record).await?;
            return Ok(transaction_id);
        }

        // No committed entry means the mutation was deferred for conversion
        let outcome = event.conversion.clone().ok_or_else(|| {
            LedgerError::Transaction(
                "no persisted transaction and no conversion outcome".to_string(),
            )
        })?;

        let accounts = uow.accounts();
        let mut account = accounts.get_for_update(event.account_id).await?;
        let record = match event.flow {
            FlowKind::Deposit => account.deposit(
                event.user_id,
                &outcome.converted,
                event.flow,
                event.workflow_id,
            )?,
            _ => account.withdraw(
                event.user_id,
                &outcome.converted,
                event.flow,
                event.workflow_id,
            )?,
        };
        let record = record
            .with_original(outcome.original, outcome.rate)
            .with_payment(payment_id);
        let transaction_id = record.id;

        accounts.update(account).await?;
        uow.transactions().create(record).await?;
        Ok(transaction_id)
    }

    /// Transfer close-out: debit and credit inside the same session, row
    /// locks taken in ascending account-id order.
    async fn finalize_transfer(
        &self,
        uow: &mut Box<dyn UnitOfWork>,
        event: &WorkflowEvent,
        payment_id: &str,
    ) -> LedgerResult<Uuid> {
        let destination_id = event.destination_id.ok_or_else(|| {
            LedgerError::InvalidTransfer("transfer without a destination account".to_string())
        })?;

        let accounts = uow.accounts();
        let (first, second) = if event.account_id <= destination_id {
            (event.account_id, destination_id)
        } else {
            (destination_id, event.account_id)
        };
        let first_account = accounts.get_for_update(first).await?;
        let second_account = accounts.get_for_update(second).await?;
        let (mut source, mut destination) = if first == event.account_id {
            (first_account, second_account)
        } else {
            (second_account, first_account)
        };

        let debit: TransactionRecord = source
            .withdraw(event.user_id, &event.amount, event.flow, event.workflow_id)?
            .with_payment(payment_id);

        let credit_amount = event.effective_amount();
        let destination_owner = destination.user_id();
        let mut credit = destination.deposit(
            destination_owner,
            &credit_amount,
            event.flow,
            event.workflow_id,
        )?;
        if let Some(outcome) = &event.conversion {
            credit = credit.with_original(outcome.original, outcome.rate);
        }
        let credit = credit.with_payment(payment_id);

        let debit_id = debit.id;
        accounts.update(source).await?;
        accounts.update(destination).await?;
        let transactions = uow.transactions();
        transactions.create(debit).await?;
        transactions.create(credit).await?;
        Ok(debit_id)
    }
}

#[async_trait]
impl EventHandler for FinalPersistenceHandler {
    fn name(&self) -> &'static str {
        "final-persistence"
    }

    async fn handle(
        &self,
        ctx: &OperationContext,
        event: &WorkflowEvent,
    ) -> LedgerResult<Vec<WorkflowEvent>> {
        if ctx.is_expired() {
            return Err(LedgerError::DeadlineExceeded);
        }

        let payment_id = event.payment_id.clone().ok_or_else(|| {
            LedgerError::Transaction("payment_initiated event without a payment id".to_string())
        })?;

        let mut uow = self.uow.create();
        uow.begin().await?;

        let result = match event.flow {
            FlowKind::Transfer => self.finalize_transfer(&mut uow, event, &payment_id).await,
            _ => self.finalize_single(&mut uow, event, &payment_id).await,
        };

        // Any failed leg rolls back the whole session
        let transaction_id = match result {
            Ok(transaction_id) => transaction_id,
            Err(error) => {
                uow.rollback().await?;
                return Err(error);
            }
        };
        uow.commit().await?;

        tracing::info!(
            flow = event.flow.as_str(),
            workflow_id = %event.workflow_id,
            %transaction_id,
            %payment_id,
            "payment recorded against ledger"
        );

        Ok(vec![event
            .advance(Stage::PaymentPersisted)
            .with_transaction(transaction_id)])
    }
}

/// Marks ledger entries settled once the provider confirms completion
pub struct SettlementHandler {
    uow: Arc<dyn UnitOfWorkFactory>,
}

impl SettlementHandler {
    pub fn new(uow: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl EventHandler for SettlementHandler {
    fn name(&self) -> &'static str {
        "settlement"
    }

    async fn handle(
        &self,
        ctx: &OperationContext,
        event: &WorkflowEvent,
    ) -> LedgerResult<Vec<WorkflowEvent>> {
        if ctx.is_expired() {
            return Err(LedgerError::DeadlineExceeded);
        }

        let payment_id = event.payment_id.clone().ok_or_else(|| {
            LedgerError::Transaction("payment_completed event without a payment id".to_string())
        })?;

        let mut uow = self.uow.create();
        uow.begin().await?;
        let transactions = uow.transactions();

        let records = transactions.find_by_payment(&payment_id).await?;
        if records.is_empty() {
            uow.rollback().await?;
            return Err(LedgerError::UnknownPayment(payment_id));
        }
        for mut record in records {
            record.settle();
            transactions.update(record).await?;
        }
        uow.commit().await?;

        tracing::info!(
            flow = event.flow.as_str(),
            workflow_id = %event.workflow_id,
            %payment_id,
            "payment settled"
        );

        // Terminal stage of the saga
        Ok(vec![])
    }
}
