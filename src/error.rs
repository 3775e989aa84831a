//! Error handling module
//!
//! Centralized error taxonomy for the money-movement engine.

use uuid::Uuid;

use crate::domain::CurrencyCode;

/// Engine-wide Result type
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Engine error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    /// Requesting user does not own the account
    #[error("unauthorized: user {user_id} does not own account {account_id}")]
    Unauthorized { user_id: Uuid, account_id: Uuid },

    /// Amount is non-positive or otherwise malformed
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Amount carries more fractional digits than the currency supports
    #[error("amount exceeds the {decimals}-digit precision of {currency}")]
    PrecisionExceeded { currency: CurrencyCode, decimals: u32 },

    /// Operation mixes two different currencies
    #[error("currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch {
        expected: CurrencyCode,
        actual: CurrencyCode,
    },

    /// Balance arithmetic would leave the signed 64-bit range
    #[error("amount exceeds the maximum safe integer range")]
    AmountExceedsMaxSafeInt,

    /// Withdrawal or transfer larger than the available balance
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: i64, available: i64 },

    /// Account not found
    #[error("account not found: {0}")]
    AccountNotFound(Uuid),

    /// Ledger transaction not found
    #[error("transaction not found: {0}")]
    TransactionNotFound(Uuid),

    /// Malformed ISO-4217 currency code
    #[error("invalid currency code: {0:?}")]
    InvalidCurrency(String),

    /// Well-formed code with no registry entry
    #[error("unknown currency: {0}")]
    UnknownCurrency(CurrencyCode),

    /// Structurally invalid transfer request
    #[error("invalid transfer: {0}")]
    InvalidTransfer(String),

    /// No rate provider could quote the pair
    #[error("exchange rate unavailable for {from} -> {to}")]
    ExchangeRateUnavailable {
        from: CurrencyCode,
        to: CurrencyCode,
    },

    /// External payment provider failure
    #[error("payment provider error: {0}")]
    PaymentProvider(String),

    /// No ledger transaction carries this provider payment id
    #[error("no transaction recorded for payment id {0:?}")]
    UnknownPayment(String),

    /// Persistence failure inside a unit of work
    #[error("transaction error: {0}")]
    Transaction(String),

    /// The operation context deadline has passed
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
}

impl LedgerError {
    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. }
                | Self::InvalidAmount(_)
                | Self::PrecisionExceeded { .. }
                | Self::CurrencyMismatch { .. }
                | Self::AmountExceedsMaxSafeInt
                | Self::InsufficientFunds { .. }
                | Self::AccountNotFound(_)
                | Self::InvalidCurrency(_)
                | Self::UnknownCurrency(_)
                | Self::InvalidTransfer(_)
        )
    }

    /// Check if retrying the operation may help
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ExchangeRateUnavailable { .. }
                | Self::PaymentProvider(_)
                | Self::Transaction(_)
                | Self::DeadlineExceeded
        )
    }
}
