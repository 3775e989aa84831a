//! Conversion handler
//!
//! Bridges the saga to the conversion service. Consumes
//! `conversion_requested`, emits `conversion_done` with the converted
//! amount, or stops the flow when no provider can quote the pair.

use std::sync::Arc;

use async_trait::async_trait;

use crate::bus::EventHandler;
use crate::convert::ConversionService;
use crate::domain::{OperationContext, Stage, WorkflowEvent};
use crate::error::{LedgerError, LedgerResult};

pub struct ConversionHandler {
    converter: Arc<ConversionService>,
}

impl ConversionHandler {
    pub fn new(converter: Arc<ConversionService>) -> Self {
        Self { converter }
    }
}

#[async_trait]
impl EventHandler for ConversionHandler {
    fn name(&self) -> &'static str {
        "conversion"
    }

    async fn handle(
        &self,
        ctx: &OperationContext,
        event: &WorkflowEvent,
    ) -> LedgerResult<Vec<WorkflowEvent>> {
        let target = event.target_currency.ok_or_else(|| {
            LedgerError::Transaction("conversion requested without a target currency".to_string())
        })?;

        let outcome = self.converter.convert(ctx, &event.amount, target).await?;

        tracing::info!(
            flow = event.flow.as_str(),
            workflow_id = %event.workflow_id,
            from = %outcome.original.currency(),
            to = %outcome.converted.currency(),
            rate = %outcome.rate,
            "conversion completed"
        );

        Ok(vec![event
            .advance(Stage::ConversionDone)
            .with_conversion(outcome)])
    }
}
