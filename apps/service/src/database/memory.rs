//! In-process store with failure injection.
//!
//! Writes are staged per transaction and applied under a single lock on
//! commit, so atomicity is observable the same way it is against libsql.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use super::models::{Check, Monitor, MonitorStatus, NewCheck};
use super::repository::{Store, StoreError, StoreTransaction};

#[derive(Default)]
struct State {
    monitors: Vec<Monitor>,
    checks: Vec<Check>,
    next_check_id: i64,
    fail_listing: bool,
    /// 1-based sequence numbers of transactions whose commit must fail
    failing_commits: HashSet<usize>,
    transactions_begun: usize,
    commits: usize,
    list_calls: usize,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_monitors(monitors: impl IntoIterator<Item = Monitor>) -> Self {
        let store = Self::new();
        store.lock().monitors.extend(monitors);
        store
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every `list_monitors` call fail
    pub fn fail_listing(&self) {
        self.lock().fail_listing = true;
    }

    /// Make the commit of the `n`th transaction (1-based) fail
    pub fn fail_transaction(&self, n: usize) {
        self.lock().failing_commits.insert(n);
    }

    pub fn monitors(&self) -> Vec<Monitor> {
        self.lock().monitors.clone()
    }

    pub fn monitor(&self, id: Uuid) -> Option<Monitor> {
        self.lock().monitors.iter().find(|m| m.id == id).cloned()
    }

    pub fn checks(&self) -> Vec<Check> {
        self.lock().checks.clone()
    }

    pub fn transactions_begun(&self) -> usize {
        self.lock().transactions_begun
    }

    pub fn commits(&self) -> usize {
        self.lock().commits
    }

    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_monitors(&self) -> Result<Vec<Monitor>, StoreError> {
        let mut state = self.lock();
        state.list_calls += 1;
        if state.fail_listing {
            return Err(StoreError::Unavailable("listing disabled".into()));
        }
        Ok(state.monitors.clone())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let sequence = {
            let mut state = self.lock();
            state.transactions_begun += 1;
            state.transactions_begun
        };

        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            sequence,
            staged_checks: Vec::new(),
            staged_updates: Vec::new(),
            finished: false,
        }))
    }
}

struct MemoryTransaction {
    store: MemoryStore,
    sequence: usize,
    staged_checks: Vec<NewCheck>,
    staged_updates: Vec<(Uuid, MonitorStatus, DateTime<Utc>)>,
    finished: bool,
}

impl MemoryTransaction {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.finished { Err(StoreError::TransactionClosed) } else { Ok(()) }
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn create_checks(&mut self, checks: &[NewCheck]) -> Result<Vec<Check>, StoreError> {
        self.ensure_open()?;
        let state = self.store.lock();
        let base = state.next_check_id + self.staged_checks.len() as i64;
        drop(state);

        let created = checks
            .iter()
            .enumerate()
            .map(|(offset, check)| Check::from_new(base + offset as i64 + 1, check))
            .collect();
        self.staged_checks.extend_from_slice(checks);
        Ok(created)
    }

    async fn update_monitor_status(
        &mut self,
        monitor_id: Uuid,
        status: MonitorStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<Monitor, StoreError> {
        self.ensure_open()?;
        let mut monitor = self.store.monitor(monitor_id).ok_or(StoreError::MonitorNotFound(monitor_id))?;
        monitor.status = status;
        monitor.last_checked_at = Some(checked_at);
        self.staged_updates.push((monitor_id, status, checked_at));
        Ok(monitor)
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.finished = true;

        let mut state = self.store.lock();
        if state.failing_commits.contains(&self.sequence) {
            return Err(StoreError::Unavailable(format!("commit of transaction {} rejected", self.sequence)));
        }

        for check in self.staged_checks.drain(..) {
            state.next_check_id += 1;
            let id = state.next_check_id;
            state.checks.push(Check::from_new(id, &check));
        }
        for (monitor_id, status, checked_at) in self.staged_updates.drain(..) {
            if let Some(monitor) = state.monitors.iter_mut().find(|m| m.id == monitor_id) {
                monitor.status = status;
                monitor.last_checked_at = Some(checked_at);
            }
        }
        state.commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.finished = true;
        self.staged_checks.clear();
        self.staged_updates.clear();
        Ok(())
    }
}
