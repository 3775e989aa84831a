//! Workflow module
//!
//! The saga: per-step handlers plus one explicit transition table per flow,
//! so each flow's full chain is visible and verifiable in one place instead
//! of being scattered across subscription calls.
//!
//! The canonical chain is
//! `requested -> validated -> persisted -> conversion_requested ->
//! conversion_done -> business_validated -> payment_initiated ->
//! payment_persisted -> payment_completed`, with stages skipped when not
//! applicable: same-currency flows never enter conversion, and
//! cross-currency flows defer the ledger mutation past the conversion, so
//! their `persisted` fact only appears at final persistence.

mod business;
mod commands;
mod conversion;
mod finalize;
mod payment;
mod persistence;
mod validation;

use std::sync::Arc;

use crate::bus::{EventBus, EventHandler};
use crate::convert::ConversionService;
use crate::domain::{event_type, CurrencyLookup, FlowKind, Stage};
use crate::payment::PaymentProvider;
use crate::uow::UnitOfWorkFactory;

pub use business::BusinessValidationHandler;
pub use commands::{DepositCommand, TransferCommand, WithdrawCommand};
pub use conversion::ConversionHandler;
pub use finalize::{FinalPersistenceHandler, SettlementHandler};
pub use payment::PaymentInitiationHandler;
pub use persistence::PersistenceHandler;
pub use validation::ValidationHandler;

/// Saga steps a stage can route to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Validate,
    Persist,
    Convert,
    BusinessValidate,
    InitiatePayment,
    Finalize,
    Settle,
}

/// Deposit saga. `Validated` fans out to persistence first, then business
/// validation, in that registration order.
const DEPOSIT_ROUTES: &[(Stage, Step)] = &[
    (Stage::Requested, Step::Validate),
    (Stage::Validated, Step::Persist),
    (Stage::Validated, Step::BusinessValidate),
    (Stage::ConversionRequested, Step::Convert),
    (Stage::ConversionDone, Step::BusinessValidate),
    (Stage::BusinessValidated, Step::InitiatePayment),
    (Stage::PaymentInitiated, Step::Finalize),
    (Stage::PaymentCompleted, Step::Settle),
];

/// Withdraw saga; same shape as deposit, the handlers differ on direction.
const WITHDRAW_ROUTES: &[(Stage, Step)] = &[
    (Stage::Requested, Step::Validate),
    (Stage::Validated, Step::Persist),
    (Stage::Validated, Step::BusinessValidate),
    (Stage::ConversionRequested, Step::Convert),
    (Stage::ConversionDone, Step::BusinessValidate),
    (Stage::BusinessValidated, Step::InitiatePayment),
    (Stage::PaymentInitiated, Step::Finalize),
    (Stage::PaymentCompleted, Step::Settle),
];

/// Transfer saga. The persistence step never mutates; it only raises the
/// conversion request for a cross-currency credit leg. Both legs land in
/// final persistence.
const TRANSFER_ROUTES: &[(Stage, Step)] = &[
    (Stage::Requested, Step::Validate),
    (Stage::Validated, Step::Persist),
    (Stage::Validated, Step::BusinessValidate),
    (Stage::ConversionRequested, Step::Convert),
    (Stage::ConversionDone, Step::BusinessValidate),
    (Stage::BusinessValidated, Step::InitiatePayment),
    (Stage::PaymentInitiated, Step::Finalize),
    (Stage::PaymentCompleted, Step::Settle),
];

fn routes(flow: FlowKind) -> &'static [(Stage, Step)] {
    match flow {
        FlowKind::Deposit => DEPOSIT_ROUTES,
        FlowKind::Withdraw => WITHDRAW_ROUTES,
        FlowKind::Transfer => TRANSFER_ROUTES,
    }
}

/// Dependencies the saga handlers are constructed with
#[derive(Clone)]
pub struct WorkflowDeps {
    pub uow: Arc<dyn UnitOfWorkFactory>,
    pub currencies: Arc<dyn CurrencyLookup>,
    pub converter: Arc<ConversionService>,
    pub payments: Arc<dyn PaymentProvider>,
}

/// Build every handler and register the three flows on the bus.
///
/// Must run before dispatch begins; the bus routing table is read-only
/// afterwards.
pub fn register_workflows(bus: &mut EventBus, deps: &WorkflowDeps) {
    let validate: Arc<dyn EventHandler> = Arc::new(ValidationHandler::new(
        deps.uow.clone(),
        deps.currencies.clone(),
    ));
    let persist: Arc<dyn EventHandler> = Arc::new(PersistenceHandler::new(deps.uow.clone()));
    let convert: Arc<dyn EventHandler> = Arc::new(ConversionHandler::new(deps.converter.clone()));
    let business: Arc<dyn EventHandler> =
        Arc::new(BusinessValidationHandler::new(deps.uow.clone()));
    let initiate: Arc<dyn EventHandler> =
        Arc::new(PaymentInitiationHandler::new(deps.payments.clone()));
    let finalize: Arc<dyn EventHandler> = Arc::new(FinalPersistenceHandler::new(deps.uow.clone()));
    let settle: Arc<dyn EventHandler> = Arc::new(SettlementHandler::new(deps.uow.clone()));

    for flow in FlowKind::ALL {
        for (stage, step) in routes(flow) {
            let handler = match step {
                Step::Validate => validate.clone(),
                Step::Persist => persist.clone(),
                Step::Convert => convert.clone(),
                Step::BusinessValidate => business.clone(),
                Step::InitiatePayment => initiate.clone(),
                Step::Finalize => finalize.clone(),
                Step::Settle => settle.clone(),
            };
            bus.register(event_type(flow, *stage), handler);
        }
    }
}
