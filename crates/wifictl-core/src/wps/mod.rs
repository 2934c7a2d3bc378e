// ── WPS push-button provisioning ──
//
// Jobs are allocated per interface, admitted one at a time per
// interface, and driven by live-state activation reports. The TAIL
// mutator in `mutator` turns the job phase into AP configuration.

mod job;
mod mutator;

use std::fmt;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use job::INTERRUPT_GRACE;
pub use mutator::WpsMutator;

use self::job::{Step, StepCtx, WpsJob};
use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::live::{LiveState, WpsEventKind};
use crate::pipeline::Invalidator;

// ── Identifiers and enums ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Job phase. Declaration order is lifecycle order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobState {
    Preparing,
    Scheduling,
    Activating,
    Running,
    Cancelling,
    Interrupting,
    Deactivating,
    Dropping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WpsRole {
    Enroller,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WpsMethod {
    Pbc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WpsResult {
    Unspecified,
    Succeeded,
    TimedOutInternally,
    TimedOutExternally,
    Cancelled,
    Interrupted,
    Overlapped,
}

/// Owner notifications. `started` fires on the first entry into
/// `Running`; `finished` fires on entry into `Dropping` if and only if
/// `started` fired.
#[derive(Default)]
pub struct WpsCallbacks {
    pub started: Option<Box<dyn FnMut(JobId) + Send>>,
    pub finished: Option<Box<dyn FnMut(JobId, WpsResult) + Send>>,
}

impl fmt::Debug for WpsCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WpsCallbacks")
            .field("started", &self.started.is_some())
            .field("finished", &self.finished.is_some())
            .finish()
    }
}

/// Broadcast form of the callbacks, for owners outside the engine task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WpsJobEvent {
    Started {
        id: JobId,
        interface: String,
    },
    Finished {
        id: JobId,
        interface: String,
        result: WpsResult,
    },
}

/// Read-only view of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WpsJobInfo {
    pub id: JobId,
    pub interface: String,
    pub role: WpsRole,
    pub method: WpsMethod,
    pub state: JobState,
    pub result: Option<WpsResult>,
    pub num_reactivated: u32,
}

// ── Manager ─────────────────────────────────────────────────────────

pub struct WpsManager {
    jobs: IndexMap<JobId, WpsJob>,
    invalidator: Invalidator,
    default_timeout: Duration,
    events: Vec<WpsJobEvent>,
}

impl WpsManager {
    pub fn new(invalidator: Invalidator, config: &EngineConfig) -> Self {
        Self {
            jobs: IndexMap::new(),
            invalidator,
            default_timeout: config.wps_pbc_timeout,
            events: Vec::new(),
        }
    }

    pub fn alloc(&mut self, iface: &str, role: WpsRole, method: WpsMethod) -> JobId {
        let job = WpsJob::new(iface.to_owned(), role, method, self.default_timeout);
        let id = job.id;
        info!(job = %id, interface = iface, %role, %method, "job allocated");
        self.jobs.insert(id, job);
        id
    }

    fn job_mut(&mut self, id: JobId) -> Result<&mut WpsJob, CoreError> {
        self.jobs.get_mut(&id).ok_or(CoreError::JobNotFound { id })
    }

    fn preparing_mut(&mut self, id: JobId, operation: &'static str) -> Result<&mut WpsJob, CoreError> {
        let job = self.job_mut(id)?;
        if job.state != JobState::Preparing {
            return Err(CoreError::InvalidJobState {
                id,
                operation,
                state: job.state,
            });
        }
        Ok(job)
    }

    pub fn set_creds(&mut self, id: JobId, creds: Vec<String>) -> Result<(), CoreError> {
        self.preparing_mut(id, "set credentials")?.creds = creds;
        Ok(())
    }

    pub fn set_callbacks(&mut self, id: JobId, callbacks: WpsCallbacks) -> Result<(), CoreError> {
        self.preparing_mut(id, "set callbacks")?.callbacks = callbacks;
        Ok(())
    }

    pub fn set_timeout(&mut self, id: JobId, timeout: Duration) -> Result<(), CoreError> {
        self.preparing_mut(id, "set timeout")?.timeout = timeout;
        Ok(())
    }

    pub fn start(&mut self, id: JobId, now: Instant) -> Result<(), CoreError> {
        let job = self.job_mut(id)?;
        if !job.prepared {
            job.prepared = true;
            info!(job = %id, "started");
        }
        self.run(now);
        Ok(())
    }

    pub fn cancel(&mut self, id: JobId, now: Instant) -> Result<(), CoreError> {
        let job = self.job_mut(id)?;
        if !job.cancelled {
            job.cancelled = true;
            info!(job = %id, "cancelled");
        }
        self.run(now);
        Ok(())
    }

    /// Release the job. Callbacks are detached immediately; the job
    /// itself lingers until the interface is cleaned up.
    pub fn drop_job(&mut self, id: JobId, now: Instant) -> Result<(), CoreError> {
        let job = self.job_mut(id)?;
        job.callbacks = WpsCallbacks::default();
        if !job.dropped {
            job.dropped = true;
            info!(job = %id, "dropped");
        }
        self.run(now);
        Ok(())
    }

    pub fn result(&self, id: JobId) -> Result<Option<WpsResult>, CoreError> {
        self.jobs
            .get(&id)
            .map(|j| j.result)
            .ok_or(CoreError::JobNotFound { id })
    }

    pub fn state(&self, id: JobId) -> Result<JobState, CoreError> {
        self.jobs
            .get(&id)
            .map(|j| j.state)
            .ok_or(CoreError::JobNotFound { id })
    }

    pub fn info(&self, id: JobId) -> Result<WpsJobInfo, CoreError> {
        self.jobs
            .get(&id)
            .map(Self::describe)
            .ok_or(CoreError::JobNotFound { id })
    }

    /// All jobs in allocation order.
    pub fn list(&self) -> Vec<WpsJobInfo> {
        self.jobs.values().map(Self::describe).collect()
    }

    fn describe(job: &WpsJob) -> WpsJobInfo {
        WpsJobInfo {
            id: job.id,
            interface: job.iface.clone(),
            role: job.role,
            method: job.method,
            state: job.state,
            result: job.result,
            num_reactivated: job.num_reactivated,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub(crate) fn jobs(&self) -> impl Iterator<Item = &WpsJob> {
        self.jobs.values()
    }

    /// Drain the events queued since the last call.
    pub fn take_events(&mut self) -> Vec<WpsJobEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Live-state input ───────────────────────────────────────────

    /// Completion report from the interface's WPS engine.
    pub fn on_live_event(&mut self, iface: &str, kind: WpsEventKind, now: Instant) {
        let Some(job) = self
            .jobs
            .values_mut()
            .find(|j| j.iface == iface && j.occupies_interface())
        else {
            debug!(interface = iface, %kind, "wps event without an admitted job");
            return;
        };
        let result = match kind {
            WpsEventKind::Success => {
                if job.cancelled {
                    info!(job = %job.id, "succeeded before cancelled");
                }
                WpsResult::Succeeded
            }
            WpsEventKind::Overlap | WpsEventKind::Timeout if job.cancelled => return,
            WpsEventKind::Overlap => WpsResult::Overlapped,
            WpsEventKind::Timeout => WpsResult::TimedOutExternally,
        };
        job.set_completed(result);
        self.run(now);
    }

    /// Re-derive every job's activation from the live interfaces.
    pub fn on_live_changed(&mut self, live: &LiveState, now: Instant) {
        let mut changed = false;
        for job in self.jobs.values_mut() {
            let activated = live
                .interface(&job.iface)
                .filter(|i| i.enabled)
                .and_then(|i| i.ap.as_ref())
                .is_some_and(|ap| ap.mode.wps && ap.wps_pbc && ap.wps_creds == job.creds);
            changed |= job.set_activated(activated);
        }
        if changed {
            self.run(now);
        }
    }

    /// Fire due timers.
    pub fn poll(&mut self, now: Instant) {
        for job in self.jobs.values_mut() {
            if job.timeout_at.is_some_and(|at| now >= at) {
                job.timeout_at = None;
                warn!(job = %job.id, interface = %job.iface, "timed out");
                job.set_completed(WpsResult::TimedOutInternally);
            }
        }
        self.run(now);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.jobs.values().filter_map(WpsJob::next_deadline).min()
    }

    // ── Scheduler ──────────────────────────────────────────────────

    /// Admit at most one job per interface, in allocation order.
    fn admit(&mut self) -> bool {
        let mut admitted = false;
        for idx in 0..self.jobs.len() {
            let Some((_, job)) = self.jobs.get_index(idx) else {
                continue;
            };
            if !job.wants_admission() {
                continue;
            }
            let iface = job.iface.clone();
            let busy = self
                .jobs
                .values()
                .any(|other| other.iface == iface && other.occupies_interface());
            if busy {
                debug!(job = %job.id, interface = %iface, "blocked by sibling");
                continue;
            }
            if let Some((_, job)) = self.jobs.get_index_mut(idx) {
                debug!(job = %job.id, interface = %iface, "admitted");
                job.scheduled = true;
                admitted = true;
            }
        }
        admitted
    }

    /// Step every job until nothing moves.
    fn run(&mut self, now: Instant) {
        loop {
            let mut moved = self.admit();
            let mut freed = Vec::new();
            for job in self.jobs.values_mut() {
                let mut ctx = StepCtx {
                    invalidator: &self.invalidator,
                    events: &mut self.events,
                    now,
                };
                loop {
                    match job.step(&mut ctx) {
                        Step::Moved => moved = true,
                        Step::Stay => break,
                        Step::Free => {
                            freed.push(job.id);
                            break;
                        }
                    }
                }
            }
            for id in freed {
                debug!(job = %id, "freed");
                self.jobs.shift_remove(&id);
                moved = true;
            }
            if !moved {
                break;
            }
        }
    }
}

impl fmt::Debug for WpsManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WpsManager")
            .field("jobs", &self.jobs.len())
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests;
