//! In-memory store and unit of work
//!
//! The store keeps an arena of accounts, each behind its own async mutex,
//! plus the committed ledger. A unit of work stages writes privately and
//! applies them on commit while holding the row locks taken by
//! `get_for_update`, which gives the same serialization a database row lock
//! would: the lock is held from the read until commit or rollback.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::aggregate::{Account, TransactionRecord};
use crate::error::{LedgerError, LedgerResult};

use super::{AccountRepository, TransactionRepository, UnitOfWork, UnitOfWorkFactory};

/// Shared in-memory persistence backing all units of work
#[derive(Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<Uuid, Arc<Mutex<Account>>>>,
    transactions: RwLock<Vec<TransactionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Session state shared between a unit of work and its repositories
struct Session {
    store: Arc<MemoryStore>,
    active: bool,

    /// Row locks held from `get_for_update` until commit or rollback
    locks: HashMap<Uuid, OwnedMutexGuard<Account>>,

    staged_accounts: HashMap<Uuid, Account>,
    new_accounts: Vec<Account>,
    new_records: Vec<TransactionRecord>,
    updated_records: Vec<TransactionRecord>,
}

impl Session {
    fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            active: false,
            locks: HashMap::new(),
            staged_accounts: HashMap::new(),
            new_accounts: Vec::new(),
            new_records: Vec::new(),
            updated_records: Vec::new(),
        }
    }

    /// Discard staged writes and release row locks. Synchronous so the drop
    /// guard can call it.
    fn discard(&mut self) {
        self.staged_accounts.clear();
        self.new_accounts.clear();
        self.new_records.clear();
        self.updated_records.clear();
        self.locks.clear();
        self.active = false;
    }
}

/// Unit of work over the in-memory store
pub struct MemoryUnitOfWork {
    session: Arc<Mutex<Session>>,
}

impl MemoryUnitOfWork {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::new(store))),
        }
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn begin(&mut self) -> LedgerResult<()> {
        let mut session = self.session.lock().await;
        session.active = true;
        Ok(())
    }

    async fn commit(&mut self) -> LedgerResult<()> {
        let mut session = self.session.lock().await;
        if !session.active {
            return Ok(());
        }

        // Write locked account snapshots back through their held guards
        let staged: Vec<(Uuid, Account)> = session.staged_accounts.drain().collect();
        for (id, account) in staged {
            match session.locks.get_mut(&id) {
                Some(guard) => **guard = account,
                None => {
                    session.discard();
                    return Err(LedgerError::Transaction(format!(
                        "account {id} staged without a row lock"
                    )));
                }
            }
        }

        // New accounts join the arena
        if !session.new_accounts.is_empty() {
            let new_accounts: Vec<Account> = session.new_accounts.drain(..).collect();
            let mut accounts = session.store.accounts.write().await;
            for account in new_accounts {
                accounts.insert(account.id(), Arc::new(Mutex::new(account)));
            }
        }

        // Ledger appends and annotation updates under one log lock
        if !session.new_records.is_empty() || !session.updated_records.is_empty() {
            let new_records: Vec<TransactionRecord> = session.new_records.drain(..).collect();
            let updated_records: Vec<TransactionRecord> =
                session.updated_records.drain(..).collect();
            let mut log = session.store.transactions.write().await;
            for updated in updated_records {
                if let Some(slot) = log.iter_mut().find(|record| record.id == updated.id) {
                    *slot = updated;
                }
            }
            log.extend(new_records);
        }

        session.locks.clear();
        session.active = false;
        Ok(())
    }

    async fn rollback(&mut self) -> LedgerResult<()> {
        let mut session = self.session.lock().await;
        if !session.active {
            return Ok(());
        }
        session.discard();
        Ok(())
    }

    fn accounts(&self) -> Box<dyn AccountRepository> {
        Box::new(MemoryAccountRepository {
            session: self.session.clone(),
        })
    }

    fn transactions(&self) -> Box<dyn TransactionRepository> {
        Box::new(MemoryTransactionRepository {
            session: self.session.clone(),
        })
    }
}

impl Drop for MemoryUnitOfWork {
    fn drop(&mut self) {
        // Guaranteed release on every exit path, panics included: an active
        // session left behind is rolled back before the lock guards go away.
        if let Ok(mut session) = self.session.try_lock() {
            if session.active {
                tracing::warn!("unit of work dropped while active; rolling back");
                session.discard();
            }
        }
    }
}

/// Accounts view over one session
struct MemoryAccountRepository {
    session: Arc<Mutex<Session>>,
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn create(&self, account: Account) -> LedgerResult<()> {
        let mut session = self.session.lock().await;
        let exists = session.store.accounts.read().await.contains_key(&account.id());
        if exists {
            return Err(LedgerError::Transaction(format!(
                "account {} already exists",
                account.id()
            )));
        }
        session.new_accounts.push(account);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> LedgerResult<Account> {
        let slot = {
            let session = self.session.lock().await;

            // Read-your-writes inside one session
            if let Some(account) = session.staged_accounts.get(&id) {
                return Ok(account.clone());
            }
            if let Some(guard) = session.locks.get(&id) {
                return Ok((**guard).clone());
            }

            let slot = session.store.accounts.read().await.get(&id).cloned();
            slot
        };

        let slot = slot.ok_or(LedgerError::AccountNotFound(id))?;
        let account = slot.lock().await.clone();
        Ok(account)
    }

    async fn get_for_update(&self, id: Uuid) -> LedgerResult<Account> {
        let slot = {
            let session = self.session.lock().await;

            if let Some(guard) = session.locks.get(&id) {
                // Already locked by this session
                return Ok(session
                    .staged_accounts
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| (**guard).clone()));
            }

            let slot = session.store.accounts.read().await.get(&id).cloned();
            slot
        };

        let slot = slot.ok_or(LedgerError::AccountNotFound(id))?;

        // Block here until any competing session commits or rolls back. The
        // session mutex is not held while waiting.
        let guard = slot.lock_owned().await;
        let snapshot = guard.clone();

        let mut session = self.session.lock().await;
        session.locks.insert(id, guard);
        Ok(snapshot)
    }

    async fn update(&self, account: Account) -> LedgerResult<()> {
        let mut session = self.session.lock().await;
        if !session.locks.contains_key(&account.id()) {
            return Err(LedgerError::Transaction(format!(
                "account {} was not fetched for update",
                account.id()
            )));
        }
        session.staged_accounts.insert(account.id(), account);
        Ok(())
    }
}

/// Ledger view over one session
struct MemoryTransactionRepository {
    session: Arc<Mutex<Session>>,
}

impl MemoryTransactionRepository {
    /// Committed records plus this session's staged ones, matching `filter`.
    async fn collect(
        &self,
        filter: impl Fn(&TransactionRecord) -> bool,
    ) -> Vec<TransactionRecord> {
        let session = self.session.lock().await;
        let mut records: Vec<TransactionRecord> = session
            .store
            .transactions
            .read()
            .await
            .iter()
            .filter(|record| filter(record))
            .cloned()
            .collect();
        records.extend(session.new_records.iter().filter(|r| filter(r)).cloned());
        records
    }
}

#[async_trait]
impl TransactionRepository for MemoryTransactionRepository {
    async fn create(&self, record: TransactionRecord) -> LedgerResult<()> {
        let mut session = self.session.lock().await;
        session.new_records.push(record);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> LedgerResult<TransactionRecord> {
        self.collect(|record| record.id == id)
            .await
            .into_iter()
            .next()
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    async fn update(&self, record: TransactionRecord) -> LedgerResult<()> {
        let mut session = self.session.lock().await;

        // A record staged in this session is replaced in place
        if let Some(slot) = session
            .new_records
            .iter_mut()
            .find(|staged| staged.id == record.id)
        {
            *slot = record;
            return Ok(());
        }

        let exists = session
            .store
            .transactions
            .read()
            .await
            .iter()
            .any(|committed| committed.id == record.id);
        if !exists {
            return Err(LedgerError::TransactionNotFound(record.id));
        }
        session.updated_records.push(record);
        Ok(())
    }

    async fn list_for_account(&self, account_id: Uuid) -> LedgerResult<Vec<TransactionRecord>> {
        Ok(self.collect(|record| record.account_id == account_id).await)
    }

    async fn find_by_workflow(&self, workflow_id: Uuid) -> LedgerResult<Vec<TransactionRecord>> {
        Ok(self.collect(|record| record.workflow_id == workflow_id).await)
    }

    async fn find_by_payment(&self, payment_id: &str) -> LedgerResult<Vec<TransactionRecord>> {
        Ok(self
            .collect(|record| record.payment_id.as_deref() == Some(payment_id))
            .await)
    }
}

/// Factory handing out independent sessions over one shared store
pub struct MemoryUnitOfWorkFactory {
    store: Arc<MemoryStore>,
}

impl MemoryUnitOfWorkFactory {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

impl UnitOfWorkFactory for MemoryUnitOfWorkFactory {
    fn create(&self) -> Box<dyn UnitOfWork> {
        Box::new(MemoryUnitOfWork::new(self.store.clone()))
    }
}
