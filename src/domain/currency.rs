//! Currency codes and the currency registry
//!
//! Currencies are identified by ISO-4217 alphabetic codes. The registry is
//! the lookup service that maps a code to its decimal precision and symbol;
//! managing registry contents is a boundary concern, the engine only reads it.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Decimal precision assumed for currencies registered without an explicit one
pub const DEFAULT_DECIMALS: u32 = 2;

/// A validated ISO-4217 alphabetic currency code.
///
/// Always exactly three ASCII uppercase letters, so it is `Copy` and cheap
/// to pass around.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    /// Parse and validate a currency code.
    ///
    /// # Errors
    /// `LedgerError::InvalidCurrency` unless the input is exactly three
    /// ASCII uppercase letters.
    pub fn new(code: &str) -> LedgerResult<Self> {
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_uppercase) {
            return Err(LedgerError::InvalidCurrency(code.to_string()));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2]]))
    }

    pub fn as_str(&self) -> &str {
        // Constructor guarantees ASCII
        std::str::from_utf8(&self.0).expect("currency code is always ASCII")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CurrencyCode({})", self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.as_str().to_string()
    }
}

/// Registry metadata for one currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyInfo {
    /// Number of fractional digits in the currency's smallest unit
    pub decimals: u32,

    /// Display symbol
    pub symbol: String,
}

/// Read side of the currency registry
pub trait CurrencyLookup: Send + Sync {
    /// Look up a currency.
    ///
    /// # Errors
    /// `LedgerError::UnknownCurrency` if the code has no registry entry.
    fn get(&self, code: CurrencyCode) -> LedgerResult<CurrencyInfo>;
}

/// In-memory currency registry
#[derive(Debug, Clone, Default)]
pub struct CurrencyRegistry {
    entries: HashMap<CurrencyCode, CurrencyInfo>,
}

impl CurrencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with commonly traded currencies
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("USD", DEFAULT_DECIMALS, "$");
        registry.register("EUR", DEFAULT_DECIMALS, "\u{20ac}");
        registry.register("GBP", DEFAULT_DECIMALS, "\u{a3}");
        registry.register("CHF", DEFAULT_DECIMALS, "CHF");
        registry.register("JPY", 0, "\u{a5}");
        registry.register("BHD", 3, ".\u{62f}.\u{628}");
        registry.register("KWD", 3, "\u{62f}.\u{643}");
        registry
    }

    /// Add or replace a registry entry. Invalid codes are ignored with a log
    /// line rather than failing startup.
    pub fn register(&mut self, code: &str, decimals: u32, symbol: &str) {
        match CurrencyCode::new(code) {
            Ok(code) => {
                self.entries.insert(
                    code,
                    CurrencyInfo {
                        decimals,
                        symbol: symbol.to_string(),
                    },
                );
            }
            Err(error) => {
                tracing::warn!(code, %error, "skipping malformed currency registration");
            }
        }
    }
}

impl CurrencyLookup for CurrencyRegistry {
    fn get(&self, code: CurrencyCode) -> LedgerResult<CurrencyInfo> {
        self.entries
            .get(&code)
            .cloned()
            .ok_or(LedgerError::UnknownCurrency(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_accepts_uppercase_ascii() {
        let code = CurrencyCode::new("USD").unwrap();
        assert_eq!(code.as_str(), "USD");
        assert_eq!(code.to_string(), "USD");
    }

    #[test]
    fn test_code_rejects_malformed_input() {
        for bad in ["usd", "US", "USDT", "U$D", ""] {
            assert!(matches!(
                CurrencyCode::new(bad),
                Err(LedgerError::InvalidCurrency(_))
            ));
        }
    }

    #[test]
    fn test_code_serde_round_trip() {
        let code = CurrencyCode::new("EUR").unwrap();
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, r#""EUR""#);

        let back: CurrencyCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);
    }

    #[test]
    fn test_registry_defaults() {
        let registry = CurrencyRegistry::with_defaults();

        let usd = registry.get(CurrencyCode::new("USD").unwrap()).unwrap();
        assert_eq!(usd.decimals, 2);

        let jpy = registry.get(CurrencyCode::new("JPY").unwrap()).unwrap();
        assert_eq!(jpy.decimals, 0);

        let bhd = registry.get(CurrencyCode::new("BHD").unwrap()).unwrap();
        assert_eq!(bhd.decimals, 3);
    }

    #[test]
    fn test_registry_unknown_currency() {
        let registry = CurrencyRegistry::with_defaults();
        let code = CurrencyCode::new("XXX").unwrap();

        assert!(matches!(
            registry.get(code),
            Err(LedgerError::UnknownCurrency(c)) if c == code
        ));
    }
}
