use std::sync::{Arc, Mutex};

use super::*;
use crate::intent::IntentStore;
use crate::model::{ConfigTree, InterfaceKind, LiveInterface, LiveRadio};
use crate::pipeline::{EngineView, Mutator};

type Log = Arc<Mutex<Vec<String>>>;

struct Fixture {
    live: LiveState,
    wps: WpsManager,
    inv: Invalidator,
    t0: Instant,
}

impl Fixture {
    fn new() -> Self {
        let inv = Invalidator::new();
        let mut live = LiveState::default();
        live.upsert_radio(LiveRadio::new("phy0"));
        let mut wlan0 = LiveInterface::new("wlan0", "phy0", InterfaceKind::Ap);
        wlan0.ap.as_mut().unwrap().mode.wps = true;
        live.upsert_interface(wlan0);
        Self {
            live,
            wps: WpsManager::new(inv.clone(), &EngineConfig::default()),
            inv,
            t0: Instant::now(),
        }
    }

    fn at(&self, secs: u64) -> Instant {
        self.t0 + Duration::from_secs(secs)
    }

    /// Pretend the computed config was applied to the driver.
    fn apply_config(&mut self, secs: u64) {
        let intent = IntentStore::new(self.inv.clone());
        let view = EngineView {
            intent: &intent,
            live: &self.live,
            wps: &self.wps,
        };
        let mut tree = ConfigTree::from_live(&self.live);
        WpsMutator.mutate(&view, &mut tree);
        let ap = tree.interface("wlan0").unwrap().1.ap.clone().unwrap();
        let mut iface = self.live.interface("wlan0").unwrap().clone();
        iface.ap = Some(ap);
        self.live.upsert_interface(iface);
        let now = self.at(secs);
        self.wps.on_live_changed(&self.live, now);
    }

    fn job(&mut self, log: &Log) -> JobId {
        let id = self.wps.alloc("wlan0", WpsRole::Enroller, WpsMethod::Pbc);
        self.wps.set_creds(id, vec!["s3cret".into()]).unwrap();
        let (started, finished) = (Arc::clone(log), Arc::clone(log));
        self.wps
            .set_callbacks(
                id,
                WpsCallbacks {
                    started: Some(Box::new(move |_| started.lock().unwrap().push("started".into()))),
                    finished: Some(Box::new(move |_, r| {
                        finished.lock().unwrap().push(format!("finished:{r}"));
                    })),
                },
            )
            .unwrap();
        id
    }
}

#[test]
fn push_button_success_flow() {
    let mut f = Fixture::new();
    let log = Log::default();
    let id = f.job(&log);

    f.wps.start(id, f.at(0)).unwrap();
    assert_eq!(f.wps.state(id).unwrap(), JobState::Activating);

    f.apply_config(1);
    assert_eq!(f.wps.state(id).unwrap(), JobState::Running);
    assert_eq!(*log.lock().unwrap(), vec!["started"]);

    f.wps.on_live_event("wlan0", WpsEventKind::Success, f.at(10));
    assert_eq!(f.wps.state(id).unwrap(), JobState::Deactivating);

    f.apply_config(11);
    assert_eq!(f.wps.state(id).unwrap(), JobState::Dropping);
    assert_eq!(f.wps.result(id).unwrap(), Some(WpsResult::Succeeded));
    assert_eq!(*log.lock().unwrap(), vec!["started", "finished:succeeded"]);
    assert_eq!(f.wps.take_events().len(), 2);

    f.wps.drop_job(id, f.at(12)).unwrap();
    assert!(matches!(f.wps.state(id), Err(CoreError::JobNotFound { .. })));
}

#[test]
fn second_job_waits_for_sibling() {
    let mut f = Fixture::new();
    let log = Log::default();
    let first = f.job(&log);
    let second = f.job(&log);
    f.wps.start(first, f.at(0)).unwrap();
    f.wps.start(second, f.at(0)).unwrap();
    assert_eq!(f.wps.state(first).unwrap(), JobState::Activating);
    assert_eq!(f.wps.state(second).unwrap(), JobState::Scheduling);

    f.wps.cancel(first, f.at(1)).unwrap();
    assert_eq!(f.wps.result(first).unwrap(), Some(WpsResult::Cancelled));
    assert_eq!(f.wps.state(first).unwrap(), JobState::Dropping);
    assert_eq!(f.wps.state(second).unwrap(), JobState::Activating);
}

#[test]
fn internal_timeout_completes_running_job() {
    let mut f = Fixture::new();
    let log = Log::default();
    let id = f.job(&log);
    f.wps.set_timeout(id, Duration::from_secs(30)).unwrap();
    f.wps.start(id, f.at(0)).unwrap();
    f.apply_config(0);
    assert_eq!(f.wps.next_deadline(), Some(f.at(30)));

    f.wps.poll(f.at(29));
    assert_eq!(f.wps.state(id).unwrap(), JobState::Running);
    f.wps.poll(f.at(30));
    assert_eq!(f.wps.result(id).unwrap(), Some(WpsResult::TimedOutInternally));
    assert_eq!(f.wps.state(id).unwrap(), JobState::Deactivating);
}

#[test]
fn overlap_after_cancel_is_ignored() {
    let mut f = Fixture::new();
    let log = Log::default();
    let id = f.job(&log);
    f.wps.start(id, f.at(0)).unwrap();
    f.apply_config(0);
    f.wps.cancel(id, f.at(1)).unwrap();
    assert_eq!(f.wps.state(id).unwrap(), JobState::Cancelling);

    f.wps.on_live_event("wlan0", WpsEventKind::Overlap, f.at(2));
    assert_eq!(f.wps.result(id).unwrap(), None);

    f.apply_config(3);
    assert_eq!(f.wps.result(id).unwrap(), Some(WpsResult::Cancelled));
    assert_eq!(*log.lock().unwrap(), vec!["started", "finished:cancelled"]);
}

#[test]
fn configuration_is_frozen_after_start() {
    let mut f = Fixture::new();
    let log = Log::default();
    let id = f.job(&log);
    f.wps.start(id, f.at(0)).unwrap();
    let err = f.wps.set_creds(id, Vec::new()).unwrap_err();
    assert!(matches!(
        err,
        CoreError::InvalidJobState {
            state: JobState::Activating,
            ..
        }
    ));
}

#[test]
fn transitions_invalidate_the_pipeline() {
    let mut f = Fixture::new();
    let log = Log::default();
    let id = f.job(&log);
    let before = f.inv.generation();
    f.wps.start(id, f.at(0)).unwrap();
    assert!(f.inv.generation() > before);
}

#[test]
fn mismatched_credentials_do_not_activate() {
    let mut f = Fixture::new();
    let log = Log::default();
    let id = f.job(&log);
    f.wps.start(id, f.at(0)).unwrap();

    let mut iface = f.live.interface("wlan0").unwrap().clone();
    let ap = iface.ap.as_mut().unwrap();
    ap.wps_pbc = true;
    ap.wps_creds = vec!["other".into()];
    f.live.upsert_interface(iface);
    f.wps.on_live_changed(&f.live, f.at(1));
    assert_eq!(f.wps.state(id).unwrap(), JobState::Activating);
    assert!(log.lock().unwrap().is_empty());
}
