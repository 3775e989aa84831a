//! Shared test harness
//!
//! Wires a full engine over the in-memory store, with a recording handler
//! subscribed to every event type so tests can assert the exact order of a
//! saga's events.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal_macros::dec;

use payflow::bus::{EventBus, EventHandler};
use payflow::convert::{ConversionService, StaticRates};
use payflow::domain::{event_type, CurrencyLookup, OperationContext, WorkflowEvent};
use payflow::payment::{PaymentProvider, SandboxPayment};
use payflow::uow::{MemoryStore, MemoryUnitOfWorkFactory, UnitOfWorkFactory};
use payflow::workflow::{register_workflows, WorkflowDeps};
use payflow::{
    CurrencyCode, CurrencyRegistry, Engine, EngineConfig, FlowKind, LedgerResult, Stage,
};

/// Captures every dispatched event type, in order
pub struct Recorder {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl EventHandler for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    async fn handle(
        &self,
        _ctx: &OperationContext,
        event: &WorkflowEvent,
    ) -> LedgerResult<Vec<WorkflowEvent>> {
        self.seen.lock().unwrap().push(event.event_type());
        Ok(vec![])
    }
}

pub struct Harness {
    pub engine: Arc<Engine>,
    pub events: Arc<Mutex<Vec<String>>>,
}

impl Harness {
    pub fn recorded(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().unwrap().clear();
    }
}

pub fn usd() -> CurrencyCode {
    CurrencyCode::new("USD").unwrap()
}

pub fn eur() -> CurrencyCode {
    CurrencyCode::new("EUR").unwrap()
}

/// USD/EUR both ways at 0.9 and its inverse
pub fn default_rates() -> StaticRates {
    StaticRates::new()
        .with_rate(usd(), eur(), dec!(0.9))
        .with_rate(eur(), usd(), dec!(1.11))
}

pub fn build_harness(rates: StaticRates, payments: Arc<dyn PaymentProvider>) -> Harness {
    payflow::init_tracing();

    let store = Arc::new(MemoryStore::new());
    let uow: Arc<dyn UnitOfWorkFactory> = Arc::new(MemoryUnitOfWorkFactory::new(store));
    let currencies: Arc<dyn CurrencyLookup> = Arc::new(CurrencyRegistry::with_defaults());
    let converter = Arc::new(ConversionService::new(
        vec![Arc::new(rates)],
        currencies.clone(),
        &EngineConfig::default(),
    ));
    let deps = WorkflowDeps {
        uow: uow.clone(),
        currencies: currencies.clone(),
        converter,
        payments,
    };

    let mut bus = EventBus::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let recorder: Arc<dyn EventHandler> = Arc::new(Recorder {
        seen: events.clone(),
    });
    for flow in FlowKind::ALL {
        for stage in Stage::ALL {
            bus.register(event_type(flow, stage), recorder.clone());
        }
    }
    register_workflows(&mut bus, &deps);

    Harness {
        engine: Arc::new(Engine::new(bus, uow, currencies)),
        events,
    }
}

/// Engine with default rates and an always-succeeding payment provider
pub fn harness() -> Harness {
    build_harness(default_rates(), Arc::new(SandboxPayment::new()))
}
