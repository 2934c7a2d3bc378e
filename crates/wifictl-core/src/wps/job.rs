// ── One provisioning job ──
//
// A job is a set of latched triggers plus one state variable. `step`
// inspects the triggers and moves at most one state forward; the
// manager calls it until nothing moves.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use super::{JobId, JobState, WpsCallbacks, WpsJobEvent, WpsMethod, WpsResult, WpsRole};
use crate::pipeline::Invalidator;

/// How long an interrupted job waits for re-activation before it is
/// completed as interrupted.
pub const INTERRUPT_GRACE: Duration = Duration::from_secs(2);

/// Outcome of one `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Stay,
    Moved,
    Free,
}

/// Side channels a transition may touch.
pub(crate) struct StepCtx<'a> {
    pub invalidator: &'a Invalidator,
    pub events: &'a mut Vec<WpsJobEvent>,
    pub now: Instant,
}

pub(crate) struct WpsJob {
    pub id: JobId,
    pub iface: String,
    pub role: WpsRole,
    pub method: WpsMethod,
    pub creds: Vec<String>,
    pub timeout: Duration,
    pub callbacks: WpsCallbacks,

    pub state: JobState,
    pub prepared: bool,
    pub scheduled: bool,
    pub activated: bool,
    pub cancelled: bool,
    pub dropped: bool,
    pub result: Option<WpsResult>,

    pub reported_running: bool,
    pub num_reactivated: u32,
    pub elapsed: Duration,
    running_since: Option<Instant>,
    pub timeout_at: Option<Instant>,
    pub interrupt_at: Option<Instant>,
}

impl WpsJob {
    pub fn new(iface: String, role: WpsRole, method: WpsMethod, timeout: Duration) -> Self {
        Self {
            id: JobId::new(),
            iface,
            role,
            method,
            creds: Vec::new(),
            timeout,
            callbacks: WpsCallbacks::default(),
            state: JobState::Preparing,
            prepared: false,
            scheduled: false,
            activated: false,
            cancelled: false,
            dropped: false,
            result: None,
            reported_running: false,
            num_reactivated: 0,
            elapsed: Duration::ZERO,
            running_since: None,
            timeout_at: None,
            interrupt_at: None,
        }
    }

    /// Holds the interface: admitted and not yet on its way out.
    pub fn occupies_interface(&self) -> bool {
        (JobState::Activating..=JobState::Deactivating).contains(&self.state)
            || (self.state == JobState::Scheduling && self.scheduled)
    }

    /// Waiting in `Scheduling` for the admission pass.
    pub fn wants_admission(&self) -> bool {
        self.state == JobState::Scheduling && !self.scheduled && !self.cancelled && !self.dropped
    }

    /// Latch a completion. The first result sticks.
    pub fn set_completed(&mut self, result: WpsResult) -> bool {
        if let Some(original) = self.result {
            if original != result {
                info!(
                    job = %self.id,
                    %original,
                    new = %result,
                    "completed again with different result, keeping original"
                );
            }
            return false;
        }
        info!(job = %self.id, interface = %self.iface, %result, "completed");
        self.result = Some(result);
        true
    }

    pub fn set_activated(&mut self, activated: bool) -> bool {
        if self.activated == activated {
            return false;
        }
        debug!(job = %self.id, activated, "activation changed");
        self.activated = activated;
        true
    }

    pub fn step(&mut self, ctx: &mut StepCtx<'_>) -> Step {
        let next = match self.state {
            JobState::Preparing => {
                if self.dropped {
                    Some(JobState::Dropping)
                } else if self.prepared {
                    Some(JobState::Scheduling)
                } else {
                    None
                }
            }
            // An already activated sibling BSS does not skip ahead; the
            // job still waits for its own scheduling slot.
            JobState::Scheduling => {
                if self.cancelled || self.dropped {
                    Some(JobState::Cancelling)
                } else if self.scheduled {
                    Some(JobState::Activating)
                } else {
                    None
                }
            }
            JobState::Activating => {
                if self.cancelled || self.dropped {
                    Some(JobState::Cancelling)
                } else if self.activated {
                    Some(JobState::Running)
                } else if let Some(reported) = self.result {
                    info!(
                        job = %self.id,
                        %reported,
                        "completion before activation, result unspecified"
                    );
                    self.result = Some(WpsResult::Unspecified);
                    Some(JobState::Running)
                } else {
                    None
                }
            }
            JobState::Running => {
                if self.result.is_some() {
                    Some(JobState::Deactivating)
                } else if self.cancelled || self.dropped {
                    Some(JobState::Cancelling)
                } else if !self.activated {
                    Some(JobState::Interrupting)
                } else {
                    None
                }
            }
            JobState::Cancelling => {
                if self.result.is_some() {
                    Some(JobState::Deactivating)
                } else if !self.activated {
                    self.set_completed(WpsResult::Cancelled);
                    return Step::Moved;
                } else {
                    None
                }
            }
            JobState::Interrupting => {
                if self.result.is_some() {
                    Some(JobState::Deactivating)
                } else if self.dropped {
                    Some(JobState::Cancelling)
                } else if self.activated {
                    self.num_reactivated += 1;
                    info!(job = %self.id, count = self.num_reactivated, "re-activated");
                    Some(JobState::Running)
                } else if self.interrupt_at.is_some_and(|at| ctx.now >= at) {
                    self.set_completed(WpsResult::Interrupted);
                    return Step::Moved;
                } else {
                    None
                }
            }
            JobState::Deactivating => (!self.activated).then_some(JobState::Dropping),
            JobState::Dropping => {
                return if self.dropped { Step::Free } else { Step::Stay };
            }
        };

        match next {
            Some(state) => {
                self.set_state(state, ctx);
                Step::Moved
            }
            None => Step::Stay,
        }
    }

    fn set_state(&mut self, state: JobState, ctx: &mut StepCtx<'_>) {
        debug!(job = %self.id, from = %self.state, to = %state, "state");
        self.leave(ctx.now);
        self.state = state;
        self.enter(ctx);
        ctx.invalidator.invalidate();
    }

    fn leave(&mut self, now: Instant) {
        match self.state {
            JobState::Running => {
                self.timeout_at = None;
                if let Some(since) = self.running_since.take() {
                    self.elapsed += now.saturating_duration_since(since);
                }
            }
            JobState::Interrupting => self.interrupt_at = None,
            _ => {}
        }
    }

    fn enter(&mut self, ctx: &mut StepCtx<'_>) {
        match self.state {
            JobState::Running => {
                self.running_since = Some(ctx.now);
                self.timeout_at = Some(ctx.now + self.timeout.saturating_sub(self.elapsed));
                if !self.reported_running {
                    self.reported_running = true;
                    if let Some(cb) = self.callbacks.started.as_mut() {
                        cb(self.id);
                    }
                    ctx.events.push(WpsJobEvent::Started {
                        id: self.id,
                        interface: self.iface.clone(),
                    });
                }
            }
            JobState::Interrupting => {
                self.interrupt_at = Some(ctx.now + INTERRUPT_GRACE);
            }
            JobState::Dropping => {
                if self.reported_running {
                    self.reported_running = false;
                    let result = self.result.unwrap_or(WpsResult::Unspecified);
                    if let Some(cb) = self.callbacks.finished.as_mut() {
                        cb(self.id, result);
                    }
                    ctx.events.push(WpsJobEvent::Finished {
                        id: self.id,
                        interface: self.iface.clone(),
                        result,
                    });
                }
            }
            _ => {}
        }
    }

    /// Earliest instant `step` or the timeout needs to look again.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.timeout_at, self.interrupt_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}
