//! Unit of Work
//!
//! Transactional boundary for one workflow step. Every repository handed out
//! by a unit of work is bound to the same session, so all writes between
//! `begin` and `commit` land atomically, and `rollback` (or dropping the
//! unit of work) discards them and releases any row locks.
//!
//! State machine: `NotStarted -> Started` on `begin`, back to `NotStarted`
//! on `commit` or `rollback`. `begin` on a started unit of work and
//! `commit`/`rollback` on a not-started one are no-op successes.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::aggregate::{Account, TransactionRecord};
use crate::error::LedgerResult;

pub use memory::{MemoryStore, MemoryUnitOfWork, MemoryUnitOfWorkFactory};

/// Account persistence bound to one unit-of-work session
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Stage a new account; visible after commit.
    async fn create(&self, account: Account) -> LedgerResult<()>;

    /// Consistent read of the current committed state.
    async fn get(&self, id: Uuid) -> LedgerResult<Account>;

    /// Read the account and hold its row lock until commit or rollback.
    ///
    /// The whole read-modify-write sequence runs under this lock, so
    /// concurrent units of work on the same account serialize. Callers
    /// locking several accounts must acquire them in ascending id order.
    async fn get_for_update(&self, id: Uuid) -> LedgerResult<Account>;

    /// Stage an updated state for an account previously fetched with
    /// `get_for_update`.
    async fn update(&self, account: Account) -> LedgerResult<()>;
}

/// Ledger transaction persistence bound to one unit-of-work session
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Stage a new ledger entry.
    async fn create(&self, record: TransactionRecord) -> LedgerResult<()>;

    async fn get(&self, id: Uuid) -> LedgerResult<TransactionRecord>;

    /// Stage an update to workflow annotations (payment id, status).
    async fn update(&self, record: TransactionRecord) -> LedgerResult<()>;

    /// Ledger entries for one account, oldest first.
    async fn list_for_account(&self, account_id: Uuid) -> LedgerResult<Vec<TransactionRecord>>;

    /// Entries written by one workflow.
    async fn find_by_workflow(&self, workflow_id: Uuid) -> LedgerResult<Vec<TransactionRecord>>;

    /// Entries annotated with a provider payment id.
    async fn find_by_payment(&self, payment_id: &str) -> LedgerResult<Vec<TransactionRecord>>;
}

/// One transactional session
#[async_trait]
pub trait UnitOfWork: Send {
    /// Start the session. Idempotent.
    async fn begin(&mut self) -> LedgerResult<()>;

    /// Apply all staged writes atomically and release row locks. No-op on a
    /// not-started session.
    async fn commit(&mut self) -> LedgerResult<()>;

    /// Discard staged writes and release row locks. No-op on a not-started
    /// session.
    async fn rollback(&mut self) -> LedgerResult<()>;

    fn accounts(&self) -> Box<dyn AccountRepository>;

    fn transactions(&self) -> Box<dyn TransactionRepository>;
}

/// Produces a fresh unit of work per workflow step. Sessions are never
/// shared across concurrently running steps.
pub trait UnitOfWorkFactory: Send + Sync {
    fn create(&self) -> Box<dyn UnitOfWork>;
}
