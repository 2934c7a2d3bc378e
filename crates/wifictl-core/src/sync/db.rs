// ── Control database boundary ──
//
// The external database is a black-box key/row store. Rows are flat
// key/value records; no schema beyond that is assumed here.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use tokio::sync::watch;

/// A flat external record.
pub type Row = BTreeMap<String, serde_json::Value>;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Table {
    RadioState,
    InterfaceState,
    Station,
    StationMld,
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{operation} on {table}/{key} failed: {message}")]
    Operation {
        operation: &'static str,
        table: Table,
        key: String,
        message: String,
    },

    #[error("control database unavailable")]
    Unavailable,
}

/// Synchronous row store the sync scheduler publishes into.
pub trait ControlDb: Send {
    fn upsert(&mut self, table: Table, key: &str, row: &Row) -> Result<(), DbError>;

    fn delete(&mut self, table: Table, key: &str) -> Result<(), DbError>;

    fn select(&mut self, table: Table, key: &str) -> Result<Option<Row>, DbError>;
}

// ── In-memory store ─────────────────────────────────────────────────

/// A write performed against a [`MemoryDb`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DbOp {
    Upsert { table: Table, key: String, row: Row },
    Delete { table: Table, key: String },
}

impl DbOp {
    pub fn table(&self) -> Table {
        match self {
            Self::Upsert { table, .. } | Self::Delete { table, .. } => *table,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Upsert { key, .. } | Self::Delete { key, .. } => key,
        }
    }

    pub fn is_upsert(&self) -> bool {
        matches!(self, Self::Upsert { .. })
    }
}

struct MemoryInner {
    rows: DashMap<(Table, String), Row>,
    ops: watch::Sender<Vec<DbOp>>,
    fail_writes: AtomicU32,
}

/// Cloneable in-process database. Every clone sees the same rows and
/// the same operation log, so a test or the CLI can keep one clone
/// while the engine owns another.
#[derive(Clone)]
pub struct MemoryDb {
    inner: Arc<MemoryInner>,
}

impl MemoryDb {
    pub fn new() -> Self {
        let (ops, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(MemoryInner {
                rows: DashMap::new(),
                ops,
                fail_writes: AtomicU32::new(0),
            }),
        }
    }

    /// Seed a row without logging it as an operation.
    pub fn preload(&self, table: Table, key: impl Into<String>, row: Row) {
        self.inner.rows.insert((table, key.into()), row);
    }

    /// Make the next `n` writes fail.
    pub fn fail_next_writes(&self, n: u32) {
        self.inner.fail_writes.store(n, Ordering::SeqCst);
    }

    pub fn get(&self, table: Table, key: &str) -> Option<Row> {
        self.inner
            .rows
            .get(&(table, key.to_owned()))
            .map(|r| r.value().clone())
    }

    /// All rows of a table, sorted by key.
    pub fn rows(&self, table: Table) -> Vec<(String, Row)> {
        let mut rows: Vec<(String, Row)> = self
            .inner
            .rows
            .iter()
            .filter(|e| e.key().0 == table)
            .map(|e| (e.key().1.clone(), e.value().clone()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }

    pub fn ops(&self) -> Vec<DbOp> {
        self.inner.ops.borrow().clone()
    }

    pub fn upsert_count(&self) -> usize {
        self.inner.ops.borrow().iter().filter(|op| op.is_upsert()).count()
    }

    pub fn clear_ops(&self) {
        self.inner.ops.send_modify(Vec::clear);
    }

    /// Notified after every logged write.
    pub fn subscribe(&self) -> watch::Receiver<Vec<DbOp>> {
        self.inner.ops.subscribe()
    }

    fn take_failure(&self) -> bool {
        self.inner
            .fail_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn log(&self, op: DbOp) {
        self.inner.ops.send_modify(|ops| ops.push(op));
    }
}

impl Default for MemoryDb {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDb")
            .field("rows", &self.inner.rows.len())
            .field("ops", &self.inner.ops.borrow().len())
            .finish()
    }
}

impl ControlDb for MemoryDb {
    fn upsert(&mut self, table: Table, key: &str, row: &Row) -> Result<(), DbError> {
        if self.take_failure() {
            return Err(DbError::Operation {
                operation: "upsert",
                table,
                key: key.to_owned(),
                message: "injected failure".into(),
            });
        }
        self.inner.rows.insert((table, key.to_owned()), row.clone());
        self.log(DbOp::Upsert {
            table,
            key: key.to_owned(),
            row: row.clone(),
        });
        Ok(())
    }

    fn delete(&mut self, table: Table, key: &str) -> Result<(), DbError> {
        if self.take_failure() {
            return Err(DbError::Operation {
                operation: "delete",
                table,
                key: key.to_owned(),
                message: "injected failure".into(),
            });
        }
        self.inner.rows.remove(&(table, key.to_owned()));
        self.log(DbOp::Delete {
            table,
            key: key.to_owned(),
        });
        Ok(())
    }

    fn select(&mut self, table: Table, key: &str) -> Result<Option<Row>, DbError> {
        Ok(self.get(table, key))
    }
}
