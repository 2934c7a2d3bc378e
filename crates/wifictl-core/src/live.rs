// ── Live state ──
//
// Indexed view of everything the drivers report, fed by `LiveEvent`s.
// Applying an event yields the set of entities it touched so the
// engine can schedule exactly those for synchronization.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::model::{ConfigTree, LiveInterface, LiveRadio, LiveStation, MacAddress};

// ── Events ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WpsEventKind {
    Success,
    Overlap,
    Timeout,
}

/// A change reported by the live-state observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LiveEvent {
    RadioUpdated(LiveRadio),
    RadioRemoved {
        name: String,
    },
    InterfaceUpdated(LiveInterface),
    InterfaceRemoved {
        name: String,
    },
    StationUpdated(LiveStation),
    StationRemoved {
        iface: String,
        mac: MacAddress,
    },
    /// Global idle/busy signal of the driver layer.
    Settled {
        settled: bool,
    },
    RadarDetected {
        radio: String,
        freq_mhz: u32,
        at: DateTime<Utc>,
    },
    Wps {
        iface: String,
        kind: WpsEventKind,
    },
}

/// Entities an event touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Touched {
    pub radios: BTreeSet<String>,
    pub interfaces: BTreeSet<String>,
    pub stations: BTreeSet<MacAddress>,
    pub mld_groups: BTreeSet<MacAddress>,
}

impl Touched {
    pub fn is_empty(&self) -> bool {
        self.radios.is_empty()
            && self.interfaces.is_empty()
            && self.stations.is_empty()
            && self.mld_groups.is_empty()
    }

    fn station(&mut self, sta: &LiveStation) {
        self.stations.insert(sta.mac.clone());
        if let Some(mld) = &sta.mld_addr {
            self.mld_groups.insert(mld.clone());
        }
    }
}

// ── Snapshot document ───────────────────────────────────────────────

fn default_settled() -> bool {
    true
}

/// Serializable dump of the live state, also accepted as input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSnapshot {
    #[serde(default = "default_settled")]
    pub settled: bool,
    #[serde(default)]
    pub radios: Vec<LiveRadio>,
    #[serde(default)]
    pub interfaces: Vec<LiveInterface>,
    #[serde(default)]
    pub stations: Vec<LiveStation>,
}

impl LiveSnapshot {
    /// Replay the snapshot as a sequence of events, parents first.
    pub fn into_events(self) -> Vec<LiveEvent> {
        let mut events = Vec::with_capacity(
            self.radios.len() + self.interfaces.len() + self.stations.len() + 1,
        );
        events.extend(self.radios.into_iter().map(LiveEvent::RadioUpdated));
        events.extend(self.interfaces.into_iter().map(LiveEvent::InterfaceUpdated));
        events.extend(self.stations.into_iter().map(LiveEvent::StationUpdated));
        events.push(LiveEvent::Settled {
            settled: self.settled,
        });
        events
    }
}

// ── Store ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct LiveState {
    radios: BTreeMap<String, LiveRadio>,
    interfaces: BTreeMap<String, LiveInterface>,
    stations: BTreeMap<(String, MacAddress), LiveStation>,
    settled: bool,
}

impl LiveState {
    /// Apply a state-carrying event. `Wps` events carry no state and
    /// touch nothing.
    pub fn apply(&mut self, event: LiveEvent) -> Touched {
        let mut touched = Touched::default();
        match event {
            LiveEvent::RadioUpdated(radio) => {
                let name = radio.name.clone();
                if self.upsert_radio(radio) {
                    touched.radios.insert(name);
                }
            }
            LiveEvent::RadioRemoved { name } => {
                if self.radios.remove(&name).is_some() {
                    touched.radios.insert(name);
                }
            }
            LiveEvent::InterfaceUpdated(iface) => {
                let name = iface.name.clone();
                if self.upsert_interface(iface) {
                    touched.interfaces.insert(name);
                }
            }
            LiveEvent::InterfaceRemoved { name } => {
                if self.interfaces.remove(&name).is_some() {
                    touched.interfaces.insert(name);
                }
            }
            LiveEvent::StationUpdated(sta) => {
                let key = (sta.iface.clone(), sta.mac.clone());
                if let Some(prev) = self.stations.get(&key) {
                    if *prev == sta {
                        return touched;
                    }
                    touched.station(prev);
                }
                touched.station(&sta);
                self.stations.insert(key, sta);
            }
            LiveEvent::StationRemoved { iface, mac } => {
                if let Some(prev) = self.stations.remove(&(iface, mac)) {
                    touched.station(&prev);
                }
            }
            LiveEvent::Settled { settled } => self.settled = settled,
            LiveEvent::RadarDetected {
                radio,
                freq_mhz,
                at,
            } => {
                if let Some(r) = self.radios.get_mut(&radio) {
                    r.radar.last_freq_mhz = Some(freq_mhz);
                    r.radar.num_detected = r.radar.num_detected.saturating_add(1);
                    r.radar.last_detected_at = Some(at);
                    touched.radios.insert(radio);
                }
            }
            LiveEvent::Wps { .. } => {}
        }
        touched
    }

    pub fn upsert_radio(&mut self, radio: LiveRadio) -> bool {
        if self.radios.get(&radio.name) == Some(&radio) {
            return false;
        }
        self.radios.insert(radio.name.clone(), radio);
        true
    }

    pub fn upsert_interface(&mut self, iface: LiveInterface) -> bool {
        if self.interfaces.get(&iface.name) == Some(&iface) {
            return false;
        }
        self.interfaces.insert(iface.name.clone(), iface);
        true
    }

    // ── Lookups ──────────────────────────────────────────────────────

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub fn radio(&self, name: &str) -> Option<&LiveRadio> {
        self.radios.get(name)
    }

    pub fn interface(&self, name: &str) -> Option<&LiveInterface> {
        self.interfaces.get(name)
    }

    pub fn radios(&self) -> impl Iterator<Item = &LiveRadio> {
        self.radios.values()
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &LiveInterface> {
        self.interfaces.values()
    }

    pub fn stations(&self) -> impl Iterator<Item = &LiveStation> {
        self.stations.values()
    }

    pub fn stations_on<'a>(&'a self, iface: &'a str) -> impl Iterator<Item = &'a LiveStation> {
        self.stations.values().filter(move |s| s.iface == iface)
    }

    /// The most recent association of `mac` across all interfaces.
    pub fn station(&self, mac: &MacAddress) -> Option<&LiveStation> {
        self.stations
            .values()
            .filter(|s| &s.mac == mac)
            .max_by_key(|s| s.connected_at)
    }

    pub fn mld_links(&self, mld: &MacAddress) -> Vec<&LiveStation> {
        self.stations
            .values()
            .filter(|s| s.mld_addr.as_ref() == Some(mld))
            .collect()
    }

    /// Events a driver would report after applying `tree` verbatim.
    /// Entities the tree knows but the driver does not are skipped.
    pub fn applied(&self, tree: &ConfigTree) -> Vec<LiveEvent> {
        let mut events = Vec::new();
        for radio in tree.radios.values() {
            let Some(live) = self.radios.get(&radio.name) else {
                continue;
            };
            let mut next = live.clone();
            next.enabled = radio.enabled;
            next.channel = radio.channel;
            next.tx_chainmask = radio.tx_chainmask;
            next.tx_power_dbm = radio.tx_power_dbm;
            if next != *live {
                events.push(LiveEvent::RadioUpdated(next));
            }

            for iface in radio.interfaces.values() {
                let Some(live) = self.interfaces.get(&iface.name) else {
                    continue;
                };
                let mut next = live.clone();
                next.enabled = iface.enabled;
                if let Some(ap) = &iface.ap {
                    if live.ap.clone().unwrap_or_default() != *ap {
                        next.ap = Some(ap.clone());
                    }
                }
                if let Some(sta) = &iface.sta {
                    if live.sta_params.clone().unwrap_or_default() != *sta {
                        next.sta_params = Some(sta.clone());
                    }
                }
                if next != *live {
                    events.push(LiveEvent::InterfaceUpdated(next));
                }
            }
        }
        events
    }

    pub fn snapshot(&self) -> LiveSnapshot {
        LiveSnapshot {
            settled: self.settled,
            radios: self.radios.values().cloned().collect(),
            interfaces: self.interfaces.values().cloned().collect(),
            stations: self.stations.values().cloned().collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::InterfaceKind;

    #[test]
    fn unchanged_upsert_touches_nothing() {
        let mut live = LiveState::default();
        let touched = live.apply(LiveEvent::RadioUpdated(LiveRadio::new("phy0")));
        assert!(touched.radios.contains("phy0"));
        let touched = live.apply(LiveEvent::RadioUpdated(LiveRadio::new("phy0")));
        assert!(touched.is_empty());
    }

    #[test]
    fn station_touches_its_mld_group() {
        let mut live = LiveState::default();
        let mut sta = LiveStation::new("aa:aa:aa:aa:aa:01", "wlan0");
        sta.mld_addr = Some(MacAddress::new("02:00:00:00:00:01"));
        let touched = live.apply(LiveEvent::StationUpdated(sta));
        assert_eq!(touched.stations.len(), 1);
        assert!(touched.mld_groups.contains(&MacAddress::new("02:00:00:00:00:01")));

        let touched = live.apply(LiveEvent::StationRemoved {
            iface: "wlan0".into(),
            mac: MacAddress::new("aa:aa:aa:aa:aa:01"),
        });
        assert_eq!(touched.mld_groups.len(), 1);
        assert!(live.station(&MacAddress::new("aa:aa:aa:aa:aa:01")).is_none());
    }

    #[test]
    fn radar_detection_updates_counters() {
        let mut live = LiveState::default();
        live.apply(LiveEvent::RadioUpdated(LiveRadio::new("phy1")));
        live.apply(LiveEvent::RadarDetected {
            radio: "phy1".into(),
            freq_mhz: 5260,
            at: DateTime::<Utc>::default(),
        });
        let radar = &live.radio("phy1").unwrap().radar;
        assert_eq!(radar.num_detected, 1);
        assert_eq!(radar.last_freq_mhz, Some(5260));
    }

    #[test]
    fn snapshot_replays_parents_first() {
        let snapshot = LiveSnapshot {
            settled: true,
            radios: vec![LiveRadio::new("phy0")],
            interfaces: vec![LiveInterface::new("wlan0", "phy0", InterfaceKind::Ap)],
            stations: vec![LiveStation::new("aa:aa:aa:aa:aa:01", "wlan0")],
        };
        let events = snapshot.into_events();
        assert!(matches!(events.first(), Some(LiveEvent::RadioUpdated(_))));
        assert!(matches!(
            events.last(),
            Some(LiveEvent::Settled { settled: true })
        ));
    }

    #[test]
    fn applied_tree_reports_only_differences() {
        let mut live = LiveState::default();
        live.apply(LiveEvent::RadioUpdated(LiveRadio::new("phy0")));
        live.apply(LiveEvent::InterfaceUpdated(LiveInterface::new(
            "wlan0",
            "phy0",
            InterfaceKind::Ap,
        )));
        let mut tree = ConfigTree::from_live(&live);
        assert!(live.applied(&tree).is_empty());

        tree.interface_mut("wlan0").unwrap().enabled = false;
        let events = live.applied(&tree);
        assert_eq!(events.len(), 1);
        live.apply(events.into_iter().next().unwrap());
        assert!(!live.interface("wlan0").unwrap().enabled);
    }
}
