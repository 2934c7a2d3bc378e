// ── Engine context ──
//
// Single owner of the intent store, live state, pipeline, sync
// scheduler, WPS jobs and policy modules. Every mutation goes through
// `&mut Engine` with the current instant passed in, so one call is one
// non-preemptible turn. Nothing here sleeps or spawns; `handle` drives
// an engine from a tokio task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::config::{DeletedRowMode, EngineConfig};
use crate::error::CoreError;
use crate::intent::{IntentDocument, IntentObserver, IntentStore};
use crate::live::{LiveEvent, LiveSnapshot, LiveState, Touched};
use crate::model::{ConfigTree, InterfaceKind};
use crate::pipeline::{EngineView, IntentOverlay, Invalidator, Pipeline, Position};
use crate::policy::radar_next_channel::check_interface_channel;
use crate::policy::{
    AclKick, LocalNeighbors, MbssPreference, RadarNextChannel, StationKicker,
};
use crate::sync::{ControlDb, SyncContext, SyncKey, SyncScheduler};
use crate::wps::{
    JobId, WpsCallbacks, WpsJobEvent, WpsJobInfo, WpsManager, WpsMethod, WpsMutator, WpsResult,
    WpsRole,
};

/// Upper bound on driver round trips per `loopback` call.
const MAX_LOOPBACK_ROUNDS: usize = 16;

// ── Intent change forwarding ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum IntentChange {
    Radio(String),
    Interface(String),
}

/// Queues intent notifications so the engine can turn them into sync
/// work once the caller's edit is complete.
struct SyncTrigger {
    tx: mpsc::UnboundedSender<IntentChange>,
}

impl IntentObserver for SyncTrigger {
    fn name(&self) -> &str {
        "sync"
    }

    fn radio_changed(&mut self, radio: &str) {
        let _ = self.tx.send(IntentChange::Radio(radio.to_owned()));
    }

    fn interface_changed(&mut self, interface: &str) {
        let _ = self.tx.send(IntentChange::Interface(interface.to_owned()));
    }
}

// ── Engine ──────────────────────────────────────────────────────────

pub struct Engine {
    config: EngineConfig,
    invalidator: Invalidator,
    intent: IntentStore,
    live: LiveState,
    pipeline: Pipeline,
    sync: SyncScheduler,
    wps: WpsManager,
    acl_kick: Option<AclKick>,
    db: Box<dyn ControlDb>,
    kicker: Box<dyn StationKicker>,
    changes: mpsc::UnboundedReceiver<IntentChange>,
}

impl Engine {
    /// Build an engine and attach every policy module its feature flags
    /// enable. Flags are not consulted again afterwards.
    pub fn new(
        config: EngineConfig,
        db: Box<dyn ControlDb>,
        kicker: Box<dyn StationKicker>,
    ) -> Self {
        let invalidator = Invalidator::new();
        let features = config.features;

        let (tx, changes) = mpsc::unbounded_channel();
        let mut intent = IntentStore::new(invalidator.clone());
        intent.register_observer(Box::new(SyncTrigger { tx }));

        let mut pipeline = Pipeline::new(invalidator.clone());
        pipeline.register(Position::Head, Box::new(IntentOverlay));
        if features.wps {
            pipeline.register(Position::Tail, Box::new(WpsMutator));
        }
        if features.radar_next_channel {
            pipeline.register(Position::Tail, Box::new(RadarNextChannel));
        }
        if features.mbss_hidden_preference {
            pipeline.register(Position::Tail, Box::new(MbssPreference));
        }
        if features.local_neighbors {
            pipeline.register(Position::Tail, Box::new(LocalNeighbors));
        }
        if !config.mutator_order.is_empty() {
            pipeline.set_order(config.mutator_order.clone());
        }

        let sync = SyncScheduler::new(config.sync, features.sync_enabled);
        let wps = WpsManager::new(invalidator.clone(), &config);
        let acl_kick = features
            .acl_kick
            .then(|| AclKick::new(config.acl_kick, features.acl_kick_dry_run));

        info!(
            mutators = ?pipeline.mutator_names(),
            sync = features.sync_enabled,
            acl_kick = features.acl_kick,
            deleted_row_mode = %config.deleted_row_mode,
            "engine ready"
        );

        Self {
            config,
            invalidator,
            intent,
            live: LiveState::default(),
            pipeline,
            sync,
            wps,
            acl_kick,
            db,
            kicker,
            changes,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn intent(&self) -> &IntentStore {
        &self.intent
    }

    pub fn live(&self) -> &LiveState {
        &self.live
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn sync(&self) -> &SyncScheduler {
        &self.sync
    }

    pub fn wps(&self) -> &WpsManager {
        &self.wps
    }

    pub fn acl_kick(&self) -> Option<&AclKick> {
        self.acl_kick.as_ref()
    }

    pub fn invalidator(&self) -> &Invalidator {
        &self.invalidator
    }

    pub fn sync_context(&self) -> SyncContext<'_> {
        SyncContext {
            live: &self.live,
            intent: &self.intent,
            deleted_row_mode: self.config.deleted_row_mode,
        }
    }

    /// No entity is waiting to be published.
    pub fn is_quiescent(&self) -> bool {
        self.sync.is_idle()
    }

    // ── Intent ───────────────────────────────────────────────────────

    /// Run `f` against the intent store, then schedule whatever it
    /// changed. Any number of edits inside `f` count as one turn.
    pub fn update_intent<R>(&mut self, now: Instant, f: impl FnOnce(&mut IntentStore) -> R) -> R {
        let out = f(&mut self.intent);
        self.drain_intent_changes(now);
        out
    }

    pub fn apply_document(&mut self, doc: IntentDocument, now: Instant) -> Result<bool, CoreError> {
        self.update_intent(now, |intent| intent.apply_document(doc))
    }

    /// The interface's configuration row was deleted. AP_VLAN intent
    /// is always dropped; other kinds follow `deleted_row_mode`.
    pub fn delete_interface_config(&mut self, name: &str, now: Instant) -> bool {
        let ap_vlan = self
            .live
            .interface(name)
            .map(|i| i.kind)
            .or_else(|| self.intent.interface(name).and_then(|i| i.kind))
            == Some(InterfaceKind::ApVlan);
        let mode = self.config.deleted_row_mode;
        debug!(interface = name, %mode, ap_vlan, "config row deleted");
        self.update_intent(now, |intent| match mode {
            DeletedRowMode::Disable if !ap_vlan => intent.detach_interface(name),
            DeletedRowMode::Disable | DeletedRowMode::Decouple => intent.remove_interface(name),
        })
    }

    fn drain_intent_changes(&mut self, now: Instant) {
        let mut touched = Touched::default();
        while let Ok(change) = self.changes.try_recv() {
            match change {
                IntentChange::Radio(name) => {
                    touched.radios.insert(name);
                }
                IntentChange::Interface(name) => {
                    if self.config.features.radar_next_channel {
                        check_interface_channel(&self.intent, &name);
                    }
                    touched.interfaces.insert(name);
                }
            }
        }
        if !touched.is_empty() {
            self.schedule(&touched, now);
        }
    }

    // ── Live state ───────────────────────────────────────────────────

    pub fn apply_live(&mut self, event: LiveEvent, now: Instant) {
        match &event {
            LiveEvent::Wps { iface, kind } => {
                if self.config.features.wps {
                    self.wps.on_live_event(iface, *kind, now);
                }
                return;
            }
            LiveEvent::StationRemoved { iface, mac } => {
                if let Some(acl) = &mut self.acl_kick {
                    acl.station_removed(iface, mac);
                }
            }
            _ => {}
        }

        let touched = self.live.apply(event);
        if touched.is_empty() {
            return;
        }
        trace!(?touched, "live state changed");
        self.invalidator.invalidate();
        self.schedule(&touched, now);
        if !touched.interfaces.is_empty() {
            self.wps.on_live_changed(&self.live, now);
        }
    }

    pub fn apply_snapshot(&mut self, snapshot: LiveSnapshot, now: Instant) {
        for event in snapshot.into_events() {
            self.apply_live(event, now);
        }
    }

    /// Arm sync for every touched entity and the stations riding on
    /// touched interfaces.
    fn schedule(&mut self, touched: &Touched, now: Instant) {
        let ctx = SyncContext {
            live: &self.live,
            intent: &self.intent,
            deleted_row_mode: self.config.deleted_row_mode,
        };
        let mut keys: Vec<SyncKey> = Vec::new();
        keys.extend(touched.radios.iter().cloned().map(SyncKey::Radio));
        keys.extend(touched.interfaces.iter().cloned().map(SyncKey::Interface));
        for iface in &touched.interfaces {
            keys.extend(
                self.live
                    .stations_on(iface)
                    .map(|s| SyncKey::Station(s.mac.clone())),
            );
        }
        keys.extend(touched.stations.iter().cloned().map(SyncKey::Station));
        keys.extend(touched.mld_groups.iter().cloned().map(SyncKey::MldGroup));
        for key in keys {
            self.sync.schedule(key, now, &ctx);
        }
    }

    // ── Computed configuration ───────────────────────────────────────

    /// Effective tree, recomputed at most once per invalidation burst.
    pub fn config_tree(&mut self) -> Arc<ConfigTree> {
        let view = EngineView {
            intent: &self.intent,
            live: &self.live,
            wps: &self.wps,
        };
        self.pipeline.config(&view)
    }

    /// Close the current turn: settle pending intent notifications,
    /// compute the tree and enforce ACLs on it.
    pub fn end_turn(&mut self, now: Instant) -> Arc<ConfigTree> {
        self.drain_intent_changes(now);
        let tree = self.config_tree();
        if let Some(acl) = &mut self.acl_kick {
            acl.evaluate(&tree, &self.live, self.kicker.as_mut(), now);
        }
        tree
    }

    /// Feed the computed tree back as if a driver applied it verbatim,
    /// until the live state stops changing. Returns the event count.
    pub fn loopback(&mut self, now: Instant) -> usize {
        let mut total = 0;
        for _ in 0..MAX_LOOPBACK_ROUNDS {
            let tree = self.end_turn(now);
            let events = self.live.applied(&tree);
            if events.is_empty() {
                return total;
            }
            total += events.len();
            for event in events {
                self.apply_live(event, now);
            }
        }
        debug!(events = total, "loopback did not converge");
        total
    }

    // ── Timers ───────────────────────────────────────────────────────

    /// Run every timer due at `now`.
    pub fn poll(&mut self, now: Instant) {
        self.drain_intent_changes(now);
        self.wps.poll(now);
        if let Some(acl) = &mut self.acl_kick {
            acl.poll(&self.live, now);
        }
        let ctx = SyncContext {
            live: &self.live,
            intent: &self.intent,
            deleted_row_mode: self.config.deleted_row_mode,
        };
        self.sync.poll(now, &ctx, self.db.as_mut());
    }

    /// Earliest instant `poll` has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.sync.next_deadline(),
            self.wps.next_deadline(),
            self.acl_kick.as_ref().and_then(AclKick::next_deadline),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    // ── WPS ──────────────────────────────────────────────────────────

    fn require_wps(&self) -> Result<(), CoreError> {
        if self.config.features.wps {
            Ok(())
        } else {
            Err(CoreError::FeatureDisabled { feature: "wps" })
        }
    }

    pub fn wps_alloc(
        &mut self,
        iface: &str,
        role: WpsRole,
        method: WpsMethod,
    ) -> Result<JobId, CoreError> {
        self.require_wps()?;
        if self.live.interface(iface).is_none() && self.intent.interface(iface).is_none() {
            return Err(CoreError::InterfaceNotFound {
                name: iface.to_owned(),
            });
        }
        Ok(self.wps.alloc(iface, role, method))
    }

    pub fn wps_set_creds(&mut self, id: JobId, creds: Vec<String>) -> Result<(), CoreError> {
        self.wps.set_creds(id, creds)
    }

    pub fn wps_set_callbacks(&mut self, id: JobId, callbacks: WpsCallbacks) -> Result<(), CoreError> {
        self.wps.set_callbacks(id, callbacks)
    }

    pub fn wps_set_timeout(&mut self, id: JobId, timeout: Duration) -> Result<(), CoreError> {
        self.wps.set_timeout(id, timeout)
    }

    pub fn wps_start(&mut self, id: JobId, now: Instant) -> Result<(), CoreError> {
        self.wps.start(id, now)?;
        self.wps.on_live_changed(&self.live, now);
        Ok(())
    }

    pub fn wps_cancel(&mut self, id: JobId, now: Instant) -> Result<(), CoreError> {
        self.wps.cancel(id, now)
    }

    pub fn wps_drop(&mut self, id: JobId, now: Instant) -> Result<(), CoreError> {
        self.wps.drop_job(id, now)
    }

    pub fn wps_result(&self, id: JobId) -> Result<Option<WpsResult>, CoreError> {
        self.wps.result(id)
    }

    pub fn wps_info(&self, id: JobId) -> Result<WpsJobInfo, CoreError> {
        self.wps.info(id)
    }

    pub fn wps_jobs(&self) -> Vec<WpsJobInfo> {
        self.wps.list()
    }

    pub fn take_wps_events(&mut self) -> Vec<WpsJobEvent> {
        self.wps.take_events()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("pipeline", &self.pipeline)
            .field("sync_tracked", &self.sync.tracked())
            .field("wps", &self.wps)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::FeatureFlags;
    use crate::intent::attr::{interface as ia, radio as ra};
    use crate::live::WpsEventKind;
    use crate::model::{
        AclPolicy, Channel, ChannelState, ChannelWidth, DfsState, LiveInterface, LiveRadio,
        LiveStation, MacAddress,
    };
    use crate::policy::RecordingKicker;
    use crate::sync::{MemoryDb, Table};
    use crate::wps::JobState;

    const A: &str = "aa:00:00:00:00:01";
    const B: &str = "bb:00:00:00:00:02";

    struct Harness {
        engine: Engine,
        db: MemoryDb,
        kicker: RecordingKicker,
        now: Instant,
    }

    impl Harness {
        fn new(config: EngineConfig) -> Self {
            let db = MemoryDb::new();
            let kicker = RecordingKicker::new();
            let engine = Engine::new(config, Box::new(db.clone()), Box::new(kicker.clone()));
            let mut h = Self {
                engine,
                db,
                kicker,
                now: Instant::now(),
            };
            h.engine.apply_snapshot(snapshot(), h.now);
            h.engine.update_intent(h.now, |i| {
                i.set_radio("phy1", ra::ENABLED, Some(true));
                i.set_interface("wlan0", ia::RADIO, Some("phy0".to_owned()));
                i.set_interface("wlan0", ia::ENABLED, Some(true));
            });
            h
        }

        /// Apply, tick and repeat until no timer is left.
        fn settle(&mut self) {
            for _ in 0..1000 {
                self.engine.loopback(self.now);
                let Some(at) = self.engine.next_deadline() else {
                    return;
                };
                self.now = self.now.max(at);
                self.engine.poll(self.now);
            }
            panic!("engine never settled");
        }
    }

    fn snapshot() -> LiveSnapshot {
        let mut phy0 = LiveRadio::new("phy0");
        phy0.channel = Some(Channel::new(2437, 2437, ChannelWidth::Mhz20));
        let mut phy1 = LiveRadio::new("phy1");
        phy1.channel = Some(Channel::new(5260, 5270, ChannelWidth::Mhz40));
        phy1.radar.enabled = true;
        phy1.channel_states = [
            (5180, DfsState::NonDfs),
            (5200, DfsState::NonDfs),
            (5220, DfsState::NonDfs),
            (5240, DfsState::NonDfs),
            (5260, DfsState::CacCompleted),
            (5280, DfsState::CacCompleted),
            (5300, DfsState::CacCompleted),
            (5320, DfsState::CacCompleted),
        ]
        .into_iter()
        .map(|(f, s)| ChannelState::new(f, s))
        .collect();

        let mut wlan0 = LiveInterface::new("wlan0", "phy0", InterfaceKind::Ap);
        wlan0.bssid = Some(MacAddress::new("02:00:00:00:00:10"));
        wlan0.ap.as_mut().unwrap().mode.wps = true;
        let mut wlan1 = LiveInterface::new("wlan1", "phy1", InterfaceKind::Ap);
        wlan1.bssid = Some(MacAddress::new("02:00:00:00:00:11"));

        LiveSnapshot {
            settled: true,
            radios: vec![phy0, phy1],
            interfaces: vec![wlan0, wlan1],
            stations: vec![LiveStation::new(A, "wlan0"), LiveStation::new(B, "wlan0")],
        }
    }

    #[test]
    fn toggle_within_one_turn_writes_nothing() {
        let mut h = Harness::new(EngineConfig::default());
        h.settle();
        h.db.clear_ops();

        h.engine.update_intent(h.now, |i| {
            i.set_radio("phy1", ra::ENABLED, Some(false));
            i.set_radio("phy1", ra::ENABLED, Some(true));
        });
        h.settle();
        assert_eq!(h.db.upsert_count(), 0);
        assert!(h.engine.config_tree().radio("phy1").unwrap().enabled);

        h.engine
            .update_intent(h.now, |i| i.set_radio("phy1", ra::ENABLED, Some(false)));
        h.settle();
        assert_eq!(h.db.upsert_count(), 1);
        let row = h.db.get(Table::RadioState, "phy1").unwrap();
        assert_eq!(row.get("enabled"), Some(&serde_json::Value::Bool(false)));
    }

    #[test]
    fn settles_into_consistent_rows() {
        let mut h = Harness::new(EngineConfig::default());
        h.settle();
        assert!(h.engine.is_quiescent());
        assert!(h.engine.sync().is_consistent(&h.engine.sync_context()));

        assert!(h.db.get(Table::RadioState, "phy0").is_some());
        assert!(h.db.get(Table::InterfaceState, "wlan0").is_some());
        // no config row behind wlan1
        assert!(h.db.get(Table::InterfaceState, "wlan1").is_none());
        assert!(h.db.get(Table::Station, A).is_some());

        h.db.clear_ops();
        h.engine.poll(h.now + Duration::from_secs(60));
        assert!(h.db.ops().is_empty());
    }

    #[test]
    fn deleted_row_disables_or_decouples() {
        let mut h = Harness::new(EngineConfig::default());
        h.settle();
        assert!(h.engine.delete_interface_config("wlan0", h.now));
        h.settle();
        assert!(!h.engine.config_tree().interface("wlan0").unwrap().1.enabled);
        assert!(h.db.get(Table::InterfaceState, "wlan0").is_none());

        let mut h = Harness::new(EngineConfig {
            deleted_row_mode: DeletedRowMode::Decouple,
            ..EngineConfig::default()
        });
        h.settle();
        assert!(h.engine.delete_interface_config("wlan0", h.now));
        h.settle();
        assert!(h.engine.intent().interface("wlan0").is_none());
        assert!(h.engine.config_tree().interface("wlan0").unwrap().1.enabled);
        assert!(h.db.get(Table::InterfaceState, "wlan1").is_some());
    }

    #[test]
    fn deny_list_kicks_exactly_once() {
        let mut h = Harness::new(EngineConfig::default());
        h.engine.update_intent(h.now, |i| {
            i.set_interface("wlan0", ia::ACL_POLICY, Some(AclPolicy::Deny));
            i.add_acl_entry("wlan0", MacAddress::new(A));
        });
        h.settle();
        h.engine.end_turn(h.now);

        let kicks = h.kicker.kicks();
        assert_eq!(kicks.len(), 1);
        assert_eq!(kicks[0].mac, MacAddress::new(A));
        assert_eq!(kicks[0].radio, "phy0");
    }

    #[test]
    fn multi_link_station_publishes_its_group() {
        let mut h = Harness::new(EngineConfig::default());
        h.settle();
        let mld = MacAddress::new("02:00:00:00:00:aa");
        let mut sta = LiveStation::new("cc:00:00:00:00:03", "wlan0");
        sta.mld_addr = Some(mld.clone());
        h.engine.apply_live(LiveEvent::StationUpdated(sta), h.now);
        assert!(h.engine.sync().state(&SyncKey::MldGroup(mld.clone())).is_some());
        h.settle();
        let row = h.db.get(Table::StationMld, mld.as_str()).unwrap();
        assert_eq!(row.get("links"), Some(&serde_json::json!(["cc:00:00:00:00:03"])));

        h.engine.apply_live(
            LiveEvent::StationRemoved {
                iface: "wlan0".into(),
                mac: MacAddress::new("cc:00:00:00:00:03"),
            },
            h.now,
        );
        h.settle();
        assert!(h.db.get(Table::StationMld, mld.as_str()).is_none());
        assert!(h.engine.sync().state(&SyncKey::MldGroup(mld)).is_none());
    }

    #[test]
    fn wps_job_runs_through_the_engine() {
        let mut h = Harness::new(EngineConfig::default());
        let id = h
            .engine
            .wps_alloc("wlan0", WpsRole::Enroller, WpsMethod::Pbc)
            .unwrap();
        h.engine.wps_set_creds(id, vec!["s3cret".into()]).unwrap();
        h.engine.wps_start(id, h.now).unwrap();
        h.engine.loopback(h.now);
        assert_eq!(h.engine.wps_info(id).unwrap().state, JobState::Running);
        let ap = h.engine.live().interface("wlan0").unwrap().ap.clone().unwrap();
        assert!(ap.wps_pbc);

        h.engine.apply_live(
            LiveEvent::Wps {
                iface: "wlan0".into(),
                kind: WpsEventKind::Success,
            },
            h.now,
        );
        h.engine.loopback(h.now);
        assert_eq!(h.engine.wps_info(id).unwrap().state, JobState::Dropping);
        assert_eq!(h.engine.wps_result(id).unwrap(), Some(WpsResult::Succeeded));
        let events = h.engine.take_wps_events();
        assert!(matches!(events.as_slice(), [
            WpsJobEvent::Started { .. },
            WpsJobEvent::Finished { result: WpsResult::Succeeded, .. }
        ]));

        h.engine.wps_drop(id, h.now).unwrap();
        assert!(h.engine.wps_jobs().is_empty());
    }

    #[test]
    fn radar_pick_and_neighbors_land_in_tree() {
        let mut h = Harness::new(EngineConfig::default());
        h.engine.update_intent(h.now, |i| {
            i.set_steering_group(
                "home",
                BTreeSet::from(["wlan0".to_owned(), "wlan1".to_owned()]),
            );
        });
        let tree = h.engine.end_turn(h.now);
        assert_eq!(
            tree.radio("phy1").unwrap().radar_next_channel,
            Some(Channel::new(5180, 5190, ChannelWidth::Mhz40))
        );
        let ap0 = tree.interface("wlan0").unwrap().1.ap.as_ref().unwrap();
        assert!(ap0.neighbors.contains_key(&MacAddress::new("02:00:00:00:00:11")));
    }

    #[test]
    fn disabled_features_stay_detached() {
        let mut h = Harness::new(EngineConfig {
            features: FeatureFlags {
                sync_enabled: false,
                radar_next_channel: false,
                acl_kick: false,
                acl_kick_dry_run: false,
                mbss_hidden_preference: false,
                local_neighbors: false,
                wps: false,
            },
            ..EngineConfig::default()
        });
        assert_eq!(h.engine.pipeline().mutator_names(), vec!["intent"]);
        assert!(h.engine.acl_kick().is_none());
        assert!(matches!(
            h.engine.wps_alloc("wlan0", WpsRole::Enroller, WpsMethod::Pbc),
            Err(CoreError::FeatureDisabled { feature: "wps" })
        ));

        h.settle();
        assert!(h.db.ops().is_empty());
        assert_eq!(h.engine.config_tree().radio("phy1").unwrap().radar_next_channel, None);
    }

    #[test]
    fn unknown_interface_cannot_host_a_job() {
        let mut h = Harness::new(EngineConfig::default());
        assert!(matches!(
            h.engine.wps_alloc("wlan9", WpsRole::Enroller, WpsMethod::Pbc),
            Err(CoreError::InterfaceNotFound { .. })
        ));
    }
}
