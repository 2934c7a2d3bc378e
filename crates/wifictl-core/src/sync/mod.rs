// ── Sync scheduler ──
//
// Debounced reconciliation of live state into the control database.
// One state machine per entity, identical for every kind:
//
//   Idle ──change──▶ PendingRetry ──deadline passed──▶ PendingDeadline
//     ▲                   │ tick ok                         │ tick ok
//     └───────────────────┴─────────────────────────────────┘
//
// A change arms the deadline once and (re)arms the retry timer. A tick
// only reconciles while the live side is settled, unless the deadline
// has already passed. Failures keep the entity armed.

mod db;
mod rows;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

pub use db::{ControlDb, DbError, DbOp, MemoryDb, Row, Table};

use crate::config::{DeletedRowMode, SyncTiming};
use crate::intent::IntentStore;
use crate::live::LiveState;
use crate::model::MacAddress;
use rows::builder_for;

// ── Keys ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum SyncKey {
    Radio(String),
    Interface(String),
    Station(MacAddress),
    MldGroup(MacAddress),
}

impl SyncKey {
    pub fn table(&self) -> Table {
        builder_for(self).table()
    }

    pub fn db_key(&self) -> &str {
        match self {
            Self::Radio(name) | Self::Interface(name) => name,
            Self::Station(mac) | Self::MldGroup(mac) => mac.as_str(),
        }
    }

    /// The entity whose row must exist before this one may be written.
    fn parent(&self, live: &LiveState) -> Option<SyncKey> {
        match self {
            Self::Interface(name) => live.interface(name).map(|i| Self::Radio(i.radio.clone())),
            Self::Station(mac) => live.station(mac).map(|s| Self::Interface(s.iface.clone())),
            Self::Radio(_) | Self::MldGroup(_) => None,
        }
    }

    /// Entities gated on this one.
    fn children(&self, live: &LiveState) -> Vec<SyncKey> {
        match self {
            Self::Radio(name) => live
                .interfaces()
                .filter(|i| &i.radio == name)
                .map(|i| Self::Interface(i.name.clone()))
                .collect(),
            Self::Interface(name) => live
                .stations_on(name)
                .map(|s| Self::Station(s.mac.clone()))
                .collect(),
            Self::Station(_) | Self::MldGroup(_) => Vec::new(),
        }
    }

    /// Whether a configuration row backs this entity.
    fn config_exists(&self, intent: &IntentStore) -> bool {
        match self {
            Self::Radio(name) => intent.radio(name).is_some(),
            Self::Interface(name) => intent.interface_configured(name),
            Self::Station(_) | Self::MldGroup(_) => false,
        }
    }

    fn live_exists(&self, live: &LiveState) -> bool {
        match self {
            Self::Radio(name) => live.radio(name).is_some(),
            Self::Interface(name) => live.interface(name).is_some(),
            Self::Station(mac) => live.station(mac).is_some(),
            Self::MldGroup(mld) => !live.mld_links(mld).is_empty(),
        }
    }
}

impl fmt::Display for SyncKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.table(), self.db_key())
    }
}

/// Read access the row builders need.
#[derive(Clone, Copy)]
pub struct SyncContext<'a> {
    pub live: &'a LiveState,
    pub intent: &'a IntentStore,
    pub deleted_row_mode: DeletedRowMode,
}

// ── Per-entity state ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    PendingRetry { retry_at: Instant, deadline_at: Instant },
    /// Deadline already passed; every tick is forced through.
    PendingDeadline { retry_at: Instant },
}

impl SyncState {
    fn next_wakeup(self) -> Option<Instant> {
        match self {
            Self::Idle => None,
            Self::PendingRetry {
                retry_at,
                deadline_at,
            } => Some(retry_at.min(deadline_at)),
            Self::PendingDeadline { retry_at } => Some(retry_at),
        }
    }

    fn forced(self, now: Instant) -> bool {
        match self {
            Self::Idle => false,
            Self::PendingRetry { deadline_at, .. } => deadline_at <= now,
            Self::PendingDeadline { .. } => true,
        }
    }
}

/// Last row written (or adopted) for an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Baseline {
    /// Not read back from the database yet.
    Unknown,
    Absent,
    Synced(Row),
}

#[derive(Debug)]
struct SyncEntity {
    state: SyncState,
    desired: Baseline,
    config_exists: bool,
    live_exists: bool,
}

impl SyncEntity {
    fn new() -> Self {
        Self {
            state: SyncState::Idle,
            desired: Baseline::Unknown,
            config_exists: false,
            live_exists: false,
        }
    }
}

// ── Scheduler ───────────────────────────────────────────────────────

#[derive(Debug)]
pub struct SyncScheduler {
    entities: BTreeMap<SyncKey, SyncEntity>,
    timing: SyncTiming,
    enabled: bool,
}

impl SyncScheduler {
    pub fn new(timing: SyncTiming, enabled: bool) -> Self {
        Self {
            entities: BTreeMap::new(),
            timing,
            enabled,
        }
    }

    /// Note that `key`'s inputs changed. Its parent is scheduled too so
    /// the child is never left waiting on a parent nobody will write.
    pub fn schedule(&mut self, key: SyncKey, now: Instant, ctx: &SyncContext<'_>) {
        let mut next = Some(key);
        while let Some(key) = next.take() {
            next = key.parent(ctx.live);
            self.arm(key, now);
        }
    }

    fn arm(&mut self, key: SyncKey, now: Instant) {
        let retry = self.timing.retry_interval;
        let deadline = self.timing.deadline;
        let entity = self.entities.entry(key).or_insert_with(SyncEntity::new);
        entity.state = match entity.state {
            SyncState::Idle => SyncState::PendingRetry {
                retry_at: now + retry,
                deadline_at: now + deadline,
            },
            SyncState::PendingRetry { deadline_at, .. } => SyncState::PendingRetry {
                retry_at: now + retry,
                deadline_at,
            },
            SyncState::PendingDeadline { .. } => SyncState::PendingDeadline {
                retry_at: now + retry,
            },
        };
    }

    /// Earliest instant any entity needs attention.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entities.values().filter_map(|e| e.state.next_wakeup()).min()
    }

    pub fn is_idle(&self) -> bool {
        self.entities.values().all(|e| e.state == SyncState::Idle)
    }

    pub fn state(&self, key: &SyncKey) -> Option<SyncState> {
        self.entities.get(key).map(|e| e.state)
    }

    pub fn tracked(&self) -> usize {
        self.entities.len()
    }

    /// Row last written or adopted for `key`.
    pub fn desired_row(&self, key: &SyncKey) -> Option<&Row> {
        match &self.entities.get(key)?.desired {
            Baseline::Synced(row) => Some(row),
            Baseline::Unknown | Baseline::Absent => None,
        }
    }

    /// Row the current live state would produce for `key`.
    pub fn computed_row(&self, key: &SyncKey, ctx: &SyncContext<'_>) -> Option<Row> {
        builder_for(key).build(key, ctx)
    }

    /// Whether every tracked entity's last written row matches what
    /// it would be now.
    pub fn is_consistent(&self, ctx: &SyncContext<'_>) -> bool {
        self.entities
            .keys()
            .all(|key| self.desired_row(key).cloned() == self.computed_row(key, ctx))
    }

    /// Run every due timer.
    pub fn poll(&mut self, now: Instant, ctx: &SyncContext<'_>, db: &mut dyn ControlDb) {
        let due: Vec<SyncKey> = self
            .entities
            .iter()
            .filter(|(_, e)| e.state.next_wakeup().is_some_and(|t| t <= now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in due {
            self.tick(&key, now, ctx, db);
        }
    }

    fn tick(&mut self, key: &SyncKey, now: Instant, ctx: &SyncContext<'_>, db: &mut dyn ControlDb) {
        let retry_at = now + self.timing.retry_interval;
        let parent = key
            .parent(ctx.live)
            .map_or(ParentGate::Ready, |p| match self.entities.get(&p) {
                Some(e) if e.state != SyncState::Idle => ParentGate::Pending,
                Some(e) if matches!(e.desired, Baseline::Synced(_)) => ParentGate::Ready,
                _ => ParentGate::Rowless,
            });
        let Some(entity) = self.entities.get_mut(key) else {
            return;
        };
        let forced = entity.state.forced(now);
        let rearm = |state: SyncState| match state {
            SyncState::PendingRetry { deadline_at, .. } if !forced => SyncState::PendingRetry {
                retry_at,
                deadline_at,
            },
            _ => SyncState::PendingDeadline { retry_at },
        };

        if !ctx.live.is_settled() && !forced {
            trace!(%key, "live state busy, postponing");
            entity.state = rearm(entity.state);
            return;
        }

        entity.config_exists = key.config_exists(ctx.intent);
        entity.live_exists = key.live_exists(ctx.live);

        let mut created = false;
        if self.enabled {
            let mut computed = builder_for(key).build(key, ctx);
            match parent {
                ParentGate::Pending if computed.is_some() => {
                    debug!(%key, forced, "waiting for parent row");
                    entity.state = rearm(entity.state);
                    return;
                }
                ParentGate::Rowless if computed.is_some() => {
                    debug!(%key, "parent has no row, hiding");
                    computed = None;
                }
                _ => {}
            }
            match reconcile(key, entity, computed, db) {
                Ok(c) => created = c,
                Err(e) => {
                    warn!(%key, error = %e, forced, "sync failed, will retry");
                    entity.state = rearm(entity.state);
                    return;
                }
            }
        } else {
            trace!(%key, "sync disabled, skipping I/O");
        }

        entity.state = SyncState::Idle;
        if !entity.config_exists && !entity.live_exists {
            debug!(%key, "gone on both sides, forgetting");
            self.entities.remove(key);
        }
        if created {
            for child in key.children(ctx.live) {
                self.arm(child, now);
            }
        }
    }
}

/// How a child entity relates to its parent's sync progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParentGate {
    Ready,
    Pending,
    Rowless,
}

/// One reconciliation step: delete, no-op, or upsert. Returns whether
/// a row came into existence.
fn reconcile(
    key: &SyncKey,
    entity: &mut SyncEntity,
    computed: Option<Row>,
    db: &mut dyn ControlDb,
) -> Result<bool, DbError> {
    let table = key.table();
    let db_key = key.db_key();

    if entity.desired == Baseline::Unknown {
        entity.desired = match db.select(table, db_key)? {
            Some(row) => {
                debug!(%key, "adopted existing row");
                Baseline::Synced(row)
            }
            None => Baseline::Absent,
        };
    }

    let created = match computed {
        None => {
            if matches!(entity.desired, Baseline::Synced(_)) {
                debug!(%key, "deleting row");
                db.delete(table, db_key)?;
                entity.desired = Baseline::Absent;
            }
            false
        }
        Some(row) => match &entity.desired {
            Baseline::Synced(prev) if *prev == row => {
                trace!(%key, "row unchanged");
                false
            }
            desired => {
                let roamed = matches!(
                    (key, desired),
                    (SyncKey::Station(_), Baseline::Synced(prev))
                        if prev.get("interface") != row.get("interface")
                );
                let created = roamed || !matches!(desired, Baseline::Synced(_));
                if roamed {
                    debug!(%key, "station roamed, dropping old row first");
                    db.delete(table, db_key)?;
                    entity.desired = Baseline::Absent;
                }
                debug!(%key, "upserting row");
                db.upsert(table, db_key, &row)?;
                entity.desired = Baseline::Synced(row);
                created
            }
        },
    };
    Ok(created)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests;
