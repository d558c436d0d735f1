use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool::managed::Object;
use libsql::{Row, params};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

use super::migrations::run_migrations;
use super::models::{
    Check, Monitor, MonitorStatus, MonitorUpdate, NewCheck, i64_to_timestamp, timestamp_to_i64,
};
use crate::pool::{LibsqlManager, LibsqlPool};

const MONITOR_COLUMNS: &str =
    "id, name, url, interval_seconds, status, last_checked_at, created_at";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database query failed: {0}")]
    Query(#[from] libsql::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Monitor {0} not found")]
    MonitorNotFound(Uuid),

    #[error("Malformed row: {0}")]
    InvalidRow(String),

    #[error("Transaction is already finished")]
    TransactionClosed,

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Record store consumed by the check pipeline
///
/// Reads go straight to the store; writes only happen through a
/// [`StoreTransaction`], so a batch of checks and status updates becomes
/// visible all at once or not at all.
#[async_trait]
pub trait Store: Send + Sync {
    /// Load every monitor, oldest first
    async fn list_monitors(&self) -> Result<Vec<Monitor>, StoreError>;

    /// Open a unit of work
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;
}

/// Writes staged inside one transaction.
///
/// Dropping a transaction without calling [`commit`](Self::commit) discards
/// its writes, but callers should roll back explicitly so the connection is
/// released in a clean state.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Insert check records, returning them with their assigned ids
    async fn create_checks(&mut self, checks: &[NewCheck]) -> Result<Vec<Check>, StoreError>;

    /// Set a monitor's status and last-checked time
    async fn update_monitor_status(
        &mut self,
        monitor_id: Uuid,
        status: MonitorStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<Monitor, StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    async fn rollback(&mut self) -> Result<(), StoreError>;
}

/// LibSQL-backed store
#[derive(Clone)]
pub struct LibsqlStore {
    pool: LibsqlPool,
}

impl LibsqlStore {
    /// Create a store from an existing pool
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    /// Open (or create) a local database file and bring its schema up to date
    pub async fn open(path: impl AsRef<Path>, max_connections: usize) -> Result<Self, StoreError> {
        let database = libsql::Builder::new_local(path.as_ref()).build().await?;
        let pool = LibsqlPool::builder(LibsqlManager::new(database))
            .max_size(max_connections.max(1))
            .build()
            .map_err(|e| StoreError::Pool(e.to_string()))?;

        let store = Self::new_from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        let conn = self.get_conn().await?;
        run_migrations(&conn).await?;
        Ok(())
    }

    async fn get_conn(&self) -> Result<Object<LibsqlManager>, StoreError> {
        self.pool.get().await.map_err(|e| StoreError::Pool(e.to_string()))
    }

    pub async fn insert_monitor(&self, monitor: &Monitor) -> Result<(), StoreError> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO monitors (id, name, url, interval_seconds, status, last_checked_at, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                monitor.id.to_string(),
                monitor.name.clone(),
                monitor.url.clone(),
                i64::from(monitor.interval_seconds),
                monitor.status.as_str(),
                monitor.last_checked_at.map(timestamp_to_i64),
                timestamp_to_i64(monitor.created_at)
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn get_monitor(&self, id: Uuid) -> Result<Option<Monitor>, StoreError> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {MONITOR_COLUMNS} FROM monitors WHERE id = ?"),
                params![id.to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(monitor_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Apply the set fields of `update`, returning the edited monitor
    pub async fn update_monitor(&self, id: Uuid, update: &MonitorUpdate) -> Result<Monitor, StoreError> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!(
                    "UPDATE monitors SET name = COALESCE(?, name), url = COALESCE(?, url), interval_seconds = COALESCE(?, interval_seconds) WHERE id = ? RETURNING {MONITOR_COLUMNS}"
                ),
                params![
                    update.name.clone(),
                    update.url.clone(),
                    update.interval_seconds.map(i64::from),
                    id.to_string()
                ],
            )
            .await?;

        match rows.next().await? {
            Some(row) => monitor_from_row(&row),
            None => Err(StoreError::MonitorNotFound(id)),
        }
    }

    /// Delete a monitor; its checks go with it via ON DELETE CASCADE
    pub async fn delete_monitor(&self, id: Uuid) -> Result<bool, StoreError> {
        let conn = self.get_conn().await?;
        let affected = conn.execute("DELETE FROM monitors WHERE id = ?", params![id.to_string()]).await?;
        Ok(affected > 0)
    }

    /// Most recent checks for a monitor, newest first
    pub async fn recent_checks(&self, monitor_id: Uuid, limit: usize) -> Result<Vec<Check>, StoreError> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT id, monitor_id, status_code, response_time_ms, success, message, created_at FROM checks WHERE monitor_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
                params![monitor_id.to_string(), limit as i64],
            )
            .await?;

        let mut checks = Vec::new();
        while let Some(row) = rows.next().await? {
            checks.push(check_from_row(&row)?);
        }
        Ok(checks)
    }
}

#[async_trait]
impl Store for LibsqlStore {
    async fn list_monitors(&self) -> Result<Vec<Monitor>, StoreError> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(&format!("SELECT {MONITOR_COLUMNS} FROM monitors ORDER BY created_at, id"), ())
            .await?;

        let mut monitors = Vec::new();
        while let Some(row) = rows.next().await? {
            monitors.push(monitor_from_row(&row)?);
        }
        Ok(monitors)
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let conn = self.get_conn().await?;
        let tx = conn.transaction().await?;
        Ok(Box::new(LibsqlTransaction { tx: Some(tx), _conn: conn }))
    }
}

/// A libsql transaction pinned to the pooled connection it runs on
struct LibsqlTransaction {
    // Declared first so it is dropped before the connection goes back to the pool.
    tx: Option<libsql::Transaction>,
    _conn: Object<LibsqlManager>,
}

impl LibsqlTransaction {
    fn active(&self) -> Result<&libsql::Transaction, StoreError> {
        self.tx.as_ref().ok_or(StoreError::TransactionClosed)
    }
}

#[async_trait]
impl StoreTransaction for LibsqlTransaction {
    async fn create_checks(&mut self, checks: &[NewCheck]) -> Result<Vec<Check>, StoreError> {
        let tx = self.active()?;
        let mut created = Vec::with_capacity(checks.len());

        for check in checks {
            tx.execute(
                "INSERT INTO checks (monitor_id, status_code, response_time_ms, success, message, created_at) VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    check.monitor_id.to_string(),
                    check.status_code.map(i64::from),
                    check.response_time_ms as i64,
                    if check.success { 1 } else { 0 },
                    check.message.clone(),
                    timestamp_to_i64(check.created_at)
                ],
            )
            .await?;
            created.push(Check::from_new(tx.last_insert_rowid(), check));
        }

        Ok(created)
    }

    async fn update_monitor_status(
        &mut self,
        monitor_id: Uuid,
        status: MonitorStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<Monitor, StoreError> {
        let tx = self.active()?;
        let mut rows = tx
            .query(
                &format!(
                    "UPDATE monitors SET status = ?, last_checked_at = ? WHERE id = ? RETURNING {MONITOR_COLUMNS}"
                ),
                params![status.as_str(), timestamp_to_i64(checked_at), monitor_id.to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => monitor_from_row(&row),
            None => Err(StoreError::MonitorNotFound(monitor_id)),
        }
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::TransactionClosed)?;
        tx.rollback().await?;
        Ok(())
    }
}

fn monitor_from_row(row: &Row) -> Result<Monitor, StoreError> {
    let id: String = row.get(0)?;
    let status: String = row.get(4)?;
    let interval: i64 = row.get(3)?;

    Ok(Monitor {
        id: Uuid::parse_str(&id).map_err(|e| StoreError::InvalidRow(format!("monitor id '{id}': {e}")))?,
        name: row.get(1)?,
        url: row.get(2)?,
        interval_seconds: u32::try_from(interval)
            .map_err(|_| StoreError::InvalidRow(format!("interval {interval} out of range")))?,
        status: status.parse().map_err(StoreError::InvalidRow)?,
        last_checked_at: row.get::<Option<i64>>(5)?.map(stored_timestamp).transpose()?,
        created_at: stored_timestamp(row.get(6)?)?,
    })
}

fn check_from_row(row: &Row) -> Result<Check, StoreError> {
    let monitor_id: String = row.get(1)?;

    Ok(Check {
        id: row.get(0)?,
        monitor_id: Uuid::parse_str(&monitor_id)
            .map_err(|e| StoreError::InvalidRow(format!("monitor id '{monitor_id}': {e}")))?,
        status_code: row.get::<Option<i64>>(2)?.and_then(|v| u16::try_from(v).ok()),
        response_time_ms: row.get::<i64>(3)?.max(0) as u64,
        success: row.get::<i64>(4)? != 0,
        message: row.get(5)?,
        created_at: stored_timestamp(row.get(6)?)?,
    })
}

fn stored_timestamp(millis: i64) -> Result<DateTime<Utc>, StoreError> {
    i64_to_timestamp(millis).ok_or_else(|| StoreError::InvalidRow(format!("timestamp {millis} out of range")))
}
