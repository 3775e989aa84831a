//! Payment initiation handler
//!
//! Consumes `business_validated` and asks the payment provider to move real
//! funds. The amount handed to the provider is the effective one: converted
//! when a conversion ran, as requested otherwise.

use std::sync::Arc;

use async_trait::async_trait;

use crate::bus::EventHandler;
use crate::domain::{OperationContext, Stage, WorkflowEvent};
use crate::error::LedgerResult;
use crate::payment::PaymentProvider;

pub struct PaymentInitiationHandler {
    payments: Arc<dyn PaymentProvider>,
}

impl PaymentInitiationHandler {
    pub fn new(payments: Arc<dyn PaymentProvider>) -> Self {
        Self { payments }
    }
}

#[async_trait]
impl EventHandler for PaymentInitiationHandler {
    fn name(&self) -> &'static str {
        "payment-initiation"
    }

    async fn handle(
        &self,
        ctx: &OperationContext,
        event: &WorkflowEvent,
    ) -> LedgerResult<Vec<WorkflowEvent>> {
        let amount = event.effective_amount();
        let payment_id = self
            .payments
            .initiate(ctx, &amount, event.external_target.as_deref())
            .await?;

        tracing::info!(
            flow = event.flow.as_str(),
            workflow_id = %event.workflow_id,
            %payment_id,
            minor = amount.minor(),
            currency = %amount.currency(),
            "payment initiated"
        );

        Ok(vec![event
            .advance(Stage::PaymentInitiated)
            .with_payment(payment_id)])
    }
}
