//! Operation Context
//!
//! Metadata about the current operation, threaded through every workflow
//! handler and external call. Carries the deadline used for cancellation.

use std::time::{Duration, Instant};

use uuid::Uuid;

/// Context for one operation
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    /// Correlation ID for tracing one request across handlers
    pub correlation_id: Option<Uuid>,

    /// User on whose behalf the operation runs
    pub request_user_id: Option<Uuid>,

    /// Absolute deadline; external calls must fail fast once it passes
    pub deadline: Option<Instant>,
}

impl OperationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_user(mut self, user_id: Uuid) -> Self {
        self.request_user_id = Some(user_id);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set the deadline relative to now
    pub fn with_deadline_in(self, budget: Duration) -> Self {
        self.with_deadline(Instant::now() + budget)
    }

    /// Generate a correlation ID if not present
    pub fn ensure_correlation_id(&mut self) -> Uuid {
        *self.correlation_id.get_or_insert_with(Uuid::new_v4)
    }

    pub fn is_expired(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    /// Time left until the deadline, `None` when no deadline is set
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let user_id = Uuid::new_v4();
        let correlation_id = Uuid::new_v4();

        let context = OperationContext::new()
            .with_request_user(user_id)
            .with_correlation_id(correlation_id);

        assert_eq!(context.request_user_id, Some(user_id));
        assert_eq!(context.correlation_id, Some(correlation_id));
        assert!(context.deadline.is_none());
        assert!(!context.is_expired());
        assert!(context.remaining().is_none());
    }

    #[test]
    fn test_ensure_correlation_id() {
        let mut context = OperationContext::new();
        assert!(context.correlation_id.is_none());

        let id = context.ensure_correlation_id();
        assert_eq!(context.correlation_id, Some(id));

        let id2 = context.ensure_correlation_id();
        assert_eq!(id, id2);
    }

    #[test]
    fn test_deadline_expiry() {
        let context = OperationContext::new().with_deadline(Instant::now() - Duration::from_millis(1));
        assert!(context.is_expired());
        assert_eq!(context.remaining(), Some(Duration::ZERO));

        let context = OperationContext::new().with_deadline_in(Duration::from_secs(60));
        assert!(!context.is_expired());
        assert!(context.remaining().unwrap() > Duration::from_secs(59));
    }
}
