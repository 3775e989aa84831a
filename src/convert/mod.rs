//! Currency Conversion Service
//!
//! Converts an amount between currencies through an ordered list of rate
//! providers, with a per-pair rate cache and provider fallback. Provider
//! calls are bounded by the configured timeout and the context deadline.

pub mod providers;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::{Decimal, RoundingStrategy};
use tokio::sync::RwLock;

use crate::config::EngineConfig;
use crate::domain::{ConversionOutcome, CurrencyCode, CurrencyLookup, Money, OperationContext};
use crate::error::{LedgerError, LedgerResult};

pub use providers::{RateProvider, StaticRates};

struct CachedRate {
    rate: Decimal,
    fetched_at: Instant,
}

/// Conversion with caching and provider fallback
pub struct ConversionService {
    providers: Vec<Arc<dyn RateProvider>>,
    currencies: Arc<dyn CurrencyLookup>,
    cache: RwLock<HashMap<(CurrencyCode, CurrencyCode), CachedRate>>,
    cache_ttl: Duration,
    call_timeout: Duration,
}

impl ConversionService {
    pub fn new(
        providers: Vec<Arc<dyn RateProvider>>,
        currencies: Arc<dyn CurrencyLookup>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            providers,
            currencies,
            cache: RwLock::new(HashMap::new()),
            cache_ttl: config.rate_cache_ttl(),
            call_timeout: config.provider_timeout(),
        }
    }

    /// Convert `amount` into `to`.
    ///
    /// The result is rounded half-away-from-zero to the target currency's
    /// precision; only derived values are ever rounded, user input is not.
    ///
    /// # Errors
    /// - `LedgerError::ExchangeRateUnavailable` when every provider fails
    /// - `LedgerError::DeadlineExceeded` when the context deadline passes
    pub async fn convert(
        &self,
        ctx: &OperationContext,
        amount: &Money,
        to: CurrencyCode,
    ) -> LedgerResult<ConversionOutcome> {
        let from = amount.currency();
        if from == to {
            return Ok(ConversionOutcome {
                original: *amount,
                converted: *amount,
                rate: Decimal::ONE,
            });
        }

        let from_info = self.currencies.get(from)?;
        let to_info = self.currencies.get(to)?;
        let rate = self.lookup_rate(ctx, from, to).await?;

        let value = amount
            .to_decimal(from_info.decimals)
            .checked_mul(rate)
            .ok_or(LedgerError::AmountExceedsMaxSafeInt)?;
        let rounded =
            value.round_dp_with_strategy(to_info.decimals, RoundingStrategy::MidpointAwayFromZero);
        let converted = Money::from_decimal(rounded, to, to_info.decimals)?;

        tracing::debug!(%from, %to, %rate, "converted amount");

        Ok(ConversionOutcome {
            original: *amount,
            converted,
            rate,
        })
    }

    async fn lookup_rate(
        &self,
        ctx: &OperationContext,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> LedgerResult<Decimal> {
        if let Some(rate) = self.cached(from, to).await {
            return Ok(rate);
        }

        for provider in &self.providers {
            if ctx.is_expired() {
                return Err(LedgerError::DeadlineExceeded);
            }

            let budget = match ctx.remaining() {
                Some(remaining) => self.call_timeout.min(remaining),
                None => self.call_timeout,
            };

            match tokio::time::timeout(budget, provider.rate(ctx, from, to)).await {
                Ok(Ok(rate)) => {
                    self.cache.write().await.insert(
                        (from, to),
                        CachedRate {
                            rate,
                            fetched_at: Instant::now(),
                        },
                    );
                    return Ok(rate);
                }
                Ok(Err(error)) => {
                    tracing::warn!(provider = provider.name(), %from, %to, %error, "rate provider failed; trying next");
                }
                Err(_) => {
                    tracing::warn!(provider = provider.name(), %from, %to, "rate provider timed out; trying next");
                }
            }
        }

        Err(LedgerError::ExchangeRateUnavailable { from, to })
    }

    async fn cached(&self, from: CurrencyCode, to: CurrencyCode) -> Option<Decimal> {
        let cache = self.cache.read().await;
        cache
            .get(&(from, to))
            .filter(|cached| cached.fetched_at.elapsed() < self.cache_ttl)
            .map(|cached| cached.rate)
    }
}
