use std::time::Duration;

use super::*;
use crate::config::SyncTiming;
use crate::live::LiveEvent;
use crate::model::{InterfaceKind, LiveInterface, LiveRadio, LiveStation};
use crate::pipeline::Invalidator;

const RETRY: Duration = Duration::from_millis(500);
const DEADLINE: Duration = Duration::from_secs(5);

struct Fixture {
    live: LiveState,
    intent: IntentStore,
    db: MemoryDb,
    sched: SyncScheduler,
    t0: Instant,
}

impl Fixture {
    fn new() -> Self {
        let mut live = LiveState::default();
        live.apply(LiveEvent::Settled { settled: true });
        Self {
            live,
            intent: IntentStore::new(Invalidator::new()),
            db: MemoryDb::new(),
            sched: SyncScheduler::new(
                SyncTiming {
                    retry_interval: RETRY,
                    deadline: DEADLINE,
                },
                true,
            ),
            t0: Instant::now(),
        }
    }

    fn at(&self, ms: u64) -> Instant {
        self.t0 + Duration::from_millis(ms)
    }

    fn schedule(&mut self, key: SyncKey, ms: u64) {
        let now = self.at(ms);
        let ctx = SyncContext {
            live: &self.live,
            intent: &self.intent,
            deleted_row_mode: DeletedRowMode::Disable,
        };
        self.sched.schedule(key, now, &ctx);
    }

    fn poll(&mut self, ms: u64) {
        let now = self.at(ms);
        let ctx = SyncContext {
            live: &self.live,
            intent: &self.intent,
            deleted_row_mode: DeletedRowMode::Disable,
        };
        let mut db = self.db.clone();
        self.sched.poll(now, &ctx, &mut db);
    }

    fn consistent(&self) -> bool {
        self.sched.is_consistent(&SyncContext {
            live: &self.live,
            intent: &self.intent,
            deleted_row_mode: DeletedRowMode::Disable,
        })
    }
}

fn radio() -> SyncKey {
    SyncKey::Radio("phy0".into())
}

#[test]
fn change_syncs_after_retry_then_goes_quiet() {
    let mut f = Fixture::new();
    f.live.apply(LiveEvent::RadioUpdated(LiveRadio::new("phy0")));
    f.schedule(radio(), 0);

    f.poll(100);
    assert_eq!(f.db.upsert_count(), 0);
    f.poll(500);
    assert_eq!(f.db.upsert_count(), 1);
    assert_eq!(f.sched.state(&radio()), Some(SyncState::Idle));
    assert!(f.consistent());

    f.schedule(radio(), 1000);
    f.poll(1500);
    f.poll(2000);
    assert_eq!(f.db.upsert_count(), 1);
    assert!(f.sched.next_deadline().is_none());
}

#[test]
fn retry_timer_rearms_but_deadline_does_not() {
    let mut f = Fixture::new();
    f.live.apply(LiveEvent::RadioUpdated(LiveRadio::new("phy0")));
    f.schedule(radio(), 0);
    f.schedule(radio(), 300);
    assert_eq!(
        f.sched.state(&radio()),
        Some(SyncState::PendingRetry {
            retry_at: f.at(800),
            deadline_at: f.at(5000),
        })
    );
}

#[test]
fn unsettled_churn_is_forced_through_at_deadline() {
    let mut f = Fixture::new();
    f.live.apply(LiveEvent::Settled { settled: false });
    f.live.apply(LiveEvent::RadioUpdated(LiveRadio::new("phy0")));

    let mut ms = 0;
    while ms < 5000 {
        let mut r = LiveRadio::new("phy0");
        r.tx_power_dbm = Some(u32::try_from(ms / 100).unwrap());
        f.live.apply(LiveEvent::RadioUpdated(r));
        f.schedule(radio(), ms);
        f.poll(ms);
        assert_eq!(f.db.upsert_count(), 0, "synced early at {ms}ms");
        ms += 100;
    }
    f.poll(5000);
    assert_eq!(f.db.upsert_count(), 1);
}

#[test]
fn failures_stay_armed_until_success() {
    let mut f = Fixture::new();
    f.live.apply(LiveEvent::RadioUpdated(LiveRadio::new("phy0")));
    f.db.fail_next_writes(2);
    f.schedule(radio(), 0);

    f.poll(500);
    assert!(matches!(f.sched.state(&radio()), Some(SyncState::PendingRetry { .. })));
    f.poll(1000);
    f.poll(1500);
    assert_eq!(f.db.upsert_count(), 1);
    assert_eq!(f.sched.state(&radio()), Some(SyncState::Idle));
}

#[test]
fn forced_failure_moves_to_pending_deadline() {
    let mut f = Fixture::new();
    f.live.apply(LiveEvent::Settled { settled: false });
    f.live.apply(LiveEvent::RadioUpdated(LiveRadio::new("phy0")));
    f.db.fail_next_writes(1);
    f.schedule(radio(), 0);

    f.poll(5000);
    assert_eq!(
        f.sched.state(&radio()),
        Some(SyncState::PendingDeadline {
            retry_at: f.at(5500)
        })
    );
    f.poll(5500);
    assert_eq!(f.db.upsert_count(), 1);
}

#[test]
fn existing_identical_row_is_adopted_without_io() {
    let mut f = Fixture::new();
    let radio_state = LiveRadio::new("phy0");
    f.live.apply(LiveEvent::RadioUpdated(radio_state.clone()));
    let row = rows::builder_for(&radio())
        .build(
            &radio(),
            &SyncContext {
                live: &f.live,
                intent: &f.intent,
                deleted_row_mode: DeletedRowMode::Disable,
            },
        )
        .unwrap();
    f.db.preload(Table::RadioState, "phy0", row);

    f.schedule(radio(), 0);
    f.poll(500);
    assert!(f.db.ops().is_empty());
    assert!(f.sched.desired_row(&radio()).is_some());
}

#[test]
fn stale_row_is_deleted_and_entity_forgotten() {
    let mut f = Fixture::new();
    f.db.preload(Table::RadioState, "phy9", Row::new());
    let key = SyncKey::Radio("phy9".into());
    f.schedule(key.clone(), 0);
    f.poll(500);

    assert_eq!(
        f.db.ops(),
        vec![DbOp::Delete {
            table: Table::RadioState,
            key: "phy9".into()
        }]
    );
    assert_eq!(f.sched.tracked(), 0);
}

#[test]
fn interface_waits_for_its_radio() {
    let mut f = Fixture::new();
    f.live.apply(LiveEvent::RadioUpdated(LiveRadio::new("phy0")));
    f.live.apply(LiveEvent::InterfaceUpdated(LiveInterface::new(
        "wlan0.1",
        "phy0",
        InterfaceKind::ApVlan,
    )));
    f.db.fail_next_writes(1);
    f.schedule(SyncKey::Interface("wlan0.1".into()), 0);

    // radio write fails, interface must not go first
    f.poll(500);
    assert!(f.db.ops().is_empty());
    f.poll(1000);
    let tables: Vec<Table> = f.db.ops().iter().map(DbOp::table).collect();
    assert_eq!(tables, vec![Table::RadioState, Table::InterfaceState]);
}

#[test]
fn station_waits_for_hidden_interface_row() {
    let mut f = Fixture::new();
    f.live.apply(LiveEvent::RadioUpdated(LiveRadio::new("phy0")));
    f.live.apply(LiveEvent::InterfaceUpdated(LiveInterface::new(
        "wlan0",
        "phy0",
        InterfaceKind::Ap,
    )));
    f.live.apply(LiveEvent::StationUpdated(LiveStation::new(
        "aa:00:00:00:00:01",
        "wlan0",
    )));
    let sta = SyncKey::Station(MacAddress::new("aa:00:00:00:00:01"));
    f.schedule(sta.clone(), 0);
    f.poll(500);
    f.poll(1000);
    // no config row for wlan0, so neither it nor its station is published
    assert!(f.db.rows(Table::Station).is_empty());

    f.intent
        .set_interface("wlan0", crate::intent::attr::interface::ENABLED, Some(true));
    f.schedule(SyncKey::Interface("wlan0".into()), 1000);
    f.poll(1500);
    f.poll(2000);
    assert_eq!(f.db.rows(Table::InterfaceState).len(), 1);
    assert_eq!(f.db.rows(Table::Station).len(), 1);
}

#[test]
fn roaming_station_replaces_its_row() {
    let mut f = Fixture::new();
    f.live.apply(LiveEvent::RadioUpdated(LiveRadio::new("phy0")));
    for name in ["wlan0.1", "wlan0.2"] {
        f.live.apply(LiveEvent::InterfaceUpdated(LiveInterface::new(
            name,
            "phy0",
            InterfaceKind::ApVlan,
        )));
    }
    let mac = MacAddress::new("aa:00:00:00:00:01");
    f.live
        .apply(LiveEvent::StationUpdated(LiveStation::new(mac.clone(), "wlan0.1")));
    f.schedule(SyncKey::Station(mac.clone()), 0);
    f.poll(500);
    f.poll(1000);
    assert_eq!(f.db.rows(Table::Station).len(), 1);
    f.db.clear_ops();

    let mut roamed = LiveStation::new(mac.clone(), "wlan0.2");
    roamed.connected_at += chrono::Duration::seconds(10);
    f.live.apply(LiveEvent::StationUpdated(roamed));
    f.live.apply(LiveEvent::StationRemoved {
        iface: "wlan0.1".into(),
        mac: mac.clone(),
    });
    f.schedule(SyncKey::Station(mac.clone()), 2000);
    f.poll(2500);
    f.poll(3000);

    let station_ops: Vec<bool> = f
        .db
        .ops()
        .iter()
        .filter(|op| op.table() == Table::Station)
        .map(DbOp::is_upsert)
        .collect();
    assert_eq!(station_ops, vec![false, true]);
    let row = f.db.get(Table::Station, mac.as_str()).unwrap();
    assert_eq!(row.get("interface"), Some(&serde_json::json!("wlan0.2")));
}

#[test]
fn disabled_sync_performs_no_io() {
    let mut f = Fixture::new();
    f.sched = SyncScheduler::new(SyncTiming::default(), false);
    f.live.apply(LiveEvent::RadioUpdated(LiveRadio::new("phy0")));
    f.schedule(radio(), 0);
    f.poll(500);
    assert!(f.db.ops().is_empty());
    assert!(f.sched.is_idle());
}

#[test]
fn mld_group_row_follows_its_links() {
    let mut f = Fixture::new();
    let mld = MacAddress::new("02:00:00:00:00:01");
    let group = SyncKey::MldGroup(mld.clone());
    let links = [("aa:00:00:00:00:01", "wlan0"), ("aa:00:00:00:00:02", "wlan1")];
    for (mac, iface) in links {
        let mut sta = LiveStation::new(mac, iface);
        sta.mld_addr = Some(mld.clone());
        f.live.apply(LiveEvent::StationUpdated(sta));
    }
    f.schedule(group.clone(), 0);
    f.poll(500);
    let row = f.db.get(Table::StationMld, mld.as_str()).unwrap();
    assert_eq!(
        row.get("links"),
        Some(&serde_json::json!(["aa:00:00:00:00:01", "aa:00:00:00:00:02"]))
    );
    assert_eq!(f.db.upsert_count(), 1);

    f.live.apply(LiveEvent::StationRemoved {
        iface: "wlan0".into(),
        mac: MacAddress::new("aa:00:00:00:00:01"),
    });
    f.schedule(group.clone(), 1000);
    f.poll(1500);
    let row = f.db.get(Table::StationMld, mld.as_str()).unwrap();
    assert_eq!(row.get("links"), Some(&serde_json::json!(["aa:00:00:00:00:02"])));
    assert_eq!(f.db.upsert_count(), 2);
    assert!(f.consistent());

    f.live.apply(LiveEvent::StationRemoved {
        iface: "wlan1".into(),
        mac: MacAddress::new("aa:00:00:00:00:02"),
    });
    f.schedule(group.clone(), 2000);
    f.poll(2500);
    assert!(f.db.get(Table::StationMld, mld.as_str()).is_none());
    assert_eq!(f.sched.state(&group), None);
    assert_eq!(f.sched.tracked(), 0);
}
