//! Event Bus
//!
//! In-process publish/subscribe dispatcher. The routing table is built once
//! at startup (`register` takes `&mut self`) and is read-only during
//! dispatch, so no runtime locking is needed. Dispatch is synchronous and in
//! registration order; a handler failure is logged with full event context
//! and never prevents sibling handlers from running, but the failed step's
//! follow-up events are not produced, which is how a saga stops early.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{OperationContext, WorkflowEvent};
use crate::error::{LedgerError, LedgerResult};

/// One workflow step: consumes an event, returns zero or more follow-ups
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handler name for operator-visible logs
    fn name(&self) -> &'static str;

    async fn handle(
        &self,
        ctx: &OperationContext,
        event: &WorkflowEvent,
    ) -> LedgerResult<Vec<WorkflowEvent>>;
}

/// Event type name to handler routing table
#[derive(Default)]
pub struct EventBus {
    routes: HashMap<String, Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a handler to an event type. Startup only; subscriptions are
    /// fixed before dispatch begins.
    pub fn register(&mut self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) {
        self.routes.entry(event_type.into()).or_default().push(handler);
    }

    /// Dispatch an event and drain every follow-up it produces.
    ///
    /// Follow-ups are processed breadth-first from an internal queue, so the
    /// ordering within one workflow matches the order handlers emitted them.
    /// The per-flow transition tables are acyclic, which bounds the drain.
    ///
    /// # Errors
    /// `LedgerError::DeadlineExceeded` once the context deadline has passed;
    /// already-dispatched steps are not undone.
    pub async fn emit(&self, ctx: &OperationContext, event: WorkflowEvent) -> LedgerResult<()> {
        let mut queue = VecDeque::new();
        queue.push_back(event);

        while let Some(event) = queue.pop_front() {
            if ctx.is_expired() {
                return Err(LedgerError::DeadlineExceeded);
            }

            let event_type = event.event_type();
            let Some(handlers) = self.routes.get(&event_type) else {
                tracing::trace!(%event_type, "no handlers registered");
                continue;
            };

            for handler in handlers {
                match handler.handle(ctx, &event).await {
                    Ok(follow_ups) => queue.extend(follow_ups),
                    Err(error) => {
                        tracing::error!(
                            handler = handler.name(),
                            %event_type,
                            flow = event.flow.as_str(),
                            workflow_id = %event.workflow_id,
                            account_id = %event.account_id,
                            user_id = %event.user_id,
                            %error,
                            "workflow step failed; no follow-up event emitted"
                        );
                    }
                }
            }
        }

        Ok(())
    }
}
