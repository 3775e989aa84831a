//! Domain module
//!
//! Value objects and facts shared across the engine.

pub mod context;
pub mod currency;
pub mod events;
pub mod money;

pub use context::OperationContext;
pub use currency::{CurrencyCode, CurrencyInfo, CurrencyLookup, CurrencyRegistry, DEFAULT_DECIMALS};
pub use events::{event_type, ConversionOutcome, FlowKind, Stage, WorkflowEvent};
pub use money::Money;
