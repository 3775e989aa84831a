//! Aggregate module
//!
//! The account aggregate and the ledger entries it produces.

pub mod account;
pub mod transaction;

pub use account::Account;
pub use transaction::{OriginalAmount, TransactionRecord, TransactionStatus};
