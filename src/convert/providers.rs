//! Rate providers
//!
//! External sources of exchange rates. Real deployments plug HTTP-backed
//! providers in behind the same trait; `StaticRates` serves development and
//! tests.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{CurrencyCode, OperationContext};
use crate::error::{LedgerError, LedgerResult};

/// One source of exchange rates
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    /// Quote for converting one unit of `from` into `to`.
    ///
    /// Must respect the context deadline and fail fast rather than block.
    async fn rate(
        &self,
        ctx: &OperationContext,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> LedgerResult<Decimal>;
}

/// Fixed rate table
#[derive(Debug, Clone, Default)]
pub struct StaticRates {
    rates: HashMap<(CurrencyCode, CurrencyCode), Decimal>,
}

impl StaticRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, from: CurrencyCode, to: CurrencyCode, rate: Decimal) -> Self {
        self.rates.insert((from, to), rate);
        self
    }
}

#[async_trait]
impl RateProvider for StaticRates {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn rate(
        &self,
        ctx: &OperationContext,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> LedgerResult<Decimal> {
        if ctx.is_expired() {
            return Err(LedgerError::DeadlineExceeded);
        }
        self.rates
            .get(&(from, to))
            .copied()
            .ok_or(LedgerError::ExchangeRateUnavailable { from, to })
    }
}
