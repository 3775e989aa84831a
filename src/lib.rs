//! payflow
//!
//! Money-movement engine for a multi-currency account ledger. Deposits,
//! withdrawals and transfers run as event-driven sagas over a transactional
//! unit of work, with balance integrity enforced by the account aggregate.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod aggregate;
pub mod bus;
pub mod config;
pub mod convert;
pub mod domain;
pub mod engine;
pub mod error;
pub mod payment;
pub mod uow;
pub mod workflow;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{LedgerError, LedgerResult};

pub use aggregate::{Account, TransactionRecord, TransactionStatus};
pub use domain::{
    CurrencyCode, CurrencyLookup, CurrencyRegistry, FlowKind, Money, OperationContext, Stage,
    WorkflowEvent,
};

/// Initialize tracing/logging. Safe to call more than once; later calls are
/// no-ops, which keeps it usable from tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "payflow=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
