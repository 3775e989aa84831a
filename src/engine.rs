//! Engine facade
//!
//! Entry point for the host application. Translates inbound commands into
//! `requested` events on the bus, exposes authorized reads, and receives the
//! payment provider's completion webhook. Command amounts are parsed from
//! decimal strings exactly once, here at the boundary.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::aggregate::{Account, TransactionRecord};
use crate::bus::EventBus;
use crate::domain::{
    CurrencyCode, CurrencyLookup, FlowKind, Money, OperationContext, Stage, WorkflowEvent,
};
use crate::error::{LedgerError, LedgerResult};
use crate::uow::UnitOfWorkFactory;
use crate::workflow::{DepositCommand, TransferCommand, WithdrawCommand};

pub struct Engine {
    bus: EventBus,
    uow: Arc<dyn UnitOfWorkFactory>,
    currencies: Arc<dyn CurrencyLookup>,
}

impl Engine {
    /// Build the engine over a wired bus. Register all workflows (and any
    /// extra observers) on the bus before constructing the engine; the
    /// routing table is fixed from here on.
    pub fn new(
        bus: EventBus,
        uow: Arc<dyn UnitOfWorkFactory>,
        currencies: Arc<dyn CurrencyLookup>,
    ) -> Self {
        Self {
            bus,
            uow,
            currencies,
        }
    }

    /// Open a new account with a zero balance.
    pub async fn create_account(&self, user_id: Uuid, currency: &str) -> LedgerResult<Uuid> {
        let code = CurrencyCode::new(currency)?;
        self.currencies.get(code)?;

        let account = Account::new(user_id, code);
        let account_id = account.id();

        let mut uow = self.uow.create();
        uow.begin().await?;
        uow.accounts().create(account).await?;
        uow.commit().await?;

        tracing::info!(%account_id, %user_id, currency = %code, "account created");
        Ok(account_id)
    }

    /// Start a deposit workflow. Returns the workflow id; progress and
    /// failures are reported through the operator log and the ledger.
    pub async fn deposit(
        &self,
        ctx: &OperationContext,
        command: DepositCommand,
    ) -> LedgerResult<Uuid> {
        let money = self.parse_money(&command.amount, &command.currency)?;
        let mut event = WorkflowEvent::requested(
            FlowKind::Deposit,
            command.user_id,
            command.account_id,
            money,
        );
        event.external_target = command.source;
        self.start(ctx, event).await
    }

    /// Start a withdrawal workflow.
    pub async fn withdraw(
        &self,
        ctx: &OperationContext,
        command: WithdrawCommand,
    ) -> LedgerResult<Uuid> {
        let money = self.parse_money(&command.amount, &command.currency)?;
        let mut event = WorkflowEvent::requested(
            FlowKind::Withdraw,
            command.user_id,
            command.account_id,
            money,
        );
        event.external_target = command.target;
        self.start(ctx, event).await
    }

    /// Start a transfer workflow between two accounts.
    pub async fn transfer(
        &self,
        ctx: &OperationContext,
        command: TransferCommand,
    ) -> LedgerResult<Uuid> {
        let money = self.parse_money(&command.amount, &command.currency)?;
        let event = WorkflowEvent::requested(
            FlowKind::Transfer,
            command.user_id,
            command.from_account_id,
            money,
        )
        .with_destination(command.to_account_id);
        self.start(ctx, event).await
    }

    /// Authorized balance read.
    pub async fn balance(&self, user_id: Uuid, account_id: Uuid) -> LedgerResult<Money> {
        let mut uow = self.uow.create();
        uow.begin().await?;
        let account = uow.accounts().get(account_id).await?;
        uow.rollback().await?;
        account.balance_for(user_id)
    }

    /// Authorized ledger listing for one account, oldest first.
    pub async fn transactions(
        &self,
        user_id: Uuid,
        account_id: Uuid,
    ) -> LedgerResult<Vec<TransactionRecord>> {
        let mut uow = self.uow.create();
        uow.begin().await?;
        let account = uow.accounts().get(account_id).await?;
        if account.user_id() != user_id {
            uow.rollback().await?;
            return Err(LedgerError::Unauthorized {
                user_id,
                account_id,
            });
        }
        let records = uow.transactions().list_for_account(account_id).await?;
        uow.rollback().await?;
        Ok(records)
    }

    /// Webhook entry point: the payment provider confirmed completion.
    /// Resolves the payment id back to its workflow and emits the terminal
    /// `payment_completed` event.
    pub async fn payment_completed(
        &self,
        ctx: &OperationContext,
        payment_id: &str,
    ) -> LedgerResult<()> {
        let mut uow = self.uow.create();
        uow.begin().await?;
        let records = uow.transactions().find_by_payment(payment_id).await?;
        uow.rollback().await?;

        let record = records
            .first()
            .ok_or_else(|| LedgerError::UnknownPayment(payment_id.to_string()))?;

        let mut event = WorkflowEvent::requested(
            record.flow,
            record.user_id,
            record.account_id,
            Money::from_minor(record.amount.abs(), record.currency),
        );
        event.workflow_id = record.workflow_id;
        event.stage = Stage::PaymentCompleted;
        event.payment_id = Some(payment_id.to_string());

        self.bus.emit(ctx, event).await
    }

    async fn start(&self, ctx: &OperationContext, event: WorkflowEvent) -> LedgerResult<Uuid> {
        let workflow_id = event.workflow_id;
        tracing::info!(
            flow = event.flow.as_str(),
            %workflow_id,
            account_id = %event.account_id,
            "workflow started"
        );
        self.bus.emit(ctx, event).await?;
        Ok(workflow_id)
    }

    fn parse_money(&self, amount: &str, currency: &str) -> LedgerResult<Money> {
        let code = CurrencyCode::new(currency)?;
        let info = self.currencies.get(code)?;
        let value = Decimal::from_str(amount)
            .map_err(|error| LedgerError::InvalidAmount(error.to_string()))?;
        Money::from_decimal(value, code, info.decimals)
    }
}
