//! Payment provider boundary
//!
//! The engine initiates movement of real funds through this trait and learns
//! about completion asynchronously via the webhook entry point on the
//! engine. `SandboxPayment` is the in-process stand-in for development and
//! tests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Money, OperationContext};
use crate::error::{LedgerError, LedgerResult};

/// External payment rail
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Initiate a payment and return the provider-assigned payment id.
    ///
    /// Must respect the context deadline and fail fast with a typed error
    /// rather than block.
    async fn initiate(
        &self,
        ctx: &OperationContext,
        amount: &Money,
        target: Option<&str>,
    ) -> LedgerResult<String>;
}

/// In-process provider for development and tests
#[derive(Debug, Clone, Default)]
pub struct SandboxPayment {
    fail: bool,
}

impl SandboxPayment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that rejects every initiation
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl PaymentProvider for SandboxPayment {
    async fn initiate(
        &self,
        ctx: &OperationContext,
        amount: &Money,
        target: Option<&str>,
    ) -> LedgerResult<String> {
        if ctx.is_expired() {
            return Err(LedgerError::DeadlineExceeded);
        }
        if self.fail {
            return Err(LedgerError::PaymentProvider(
                "sandbox provider configured to fail".to_string(),
            ));
        }

        let payment_id = format!("pay_{}", Uuid::new_v4().simple());
        tracing::debug!(
            %payment_id,
            minor = amount.minor(),
            currency = %amount.currency(),
            target = target.unwrap_or("default"),
            "sandbox payment initiated"
        );
        Ok(payment_id)
    }
}
