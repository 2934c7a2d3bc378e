// ── ACL enforcement by kick ──
//
// Changing an AP's access list does not disconnect stations already
// associated. This module compares every associated station against
// the effective ACL and asks the driver to deauthenticate offenders,
// once per association.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::AclKickConfig;
use crate::live::LiveState;
use crate::model::{AclPolicy, ConfigTree, InterfaceKind, MacAddress};

/// Driver hook that disconnects a station.
pub trait StationKicker: Send {
    /// Returns whether the request was accepted.
    fn deauth(&mut self, radio: &str, iface: &str, mac: &MacAddress, reason: u16) -> bool;
}

/// One deauthentication request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KickRecord {
    pub radio: String,
    pub interface: String,
    pub mac: MacAddress,
    pub reason: u16,
}

/// Kicker that only remembers what it was asked to do. Clones share
/// the same record.
#[derive(Debug, Clone)]
pub struct RecordingKicker {
    kicks: Arc<watch::Sender<Vec<KickRecord>>>,
}

impl RecordingKicker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self {
            kicks: Arc::new(tx),
        }
    }

    pub fn kicks(&self) -> Vec<KickRecord> {
        self.kicks.borrow().clone()
    }
}

impl Default for RecordingKicker {
    fn default() -> Self {
        Self::new()
    }
}

impl StationKicker for RecordingKicker {
    fn deauth(&mut self, radio: &str, iface: &str, mac: &MacAddress, reason: u16) -> bool {
        self.kicks.send_modify(|k| {
            k.push(KickRecord {
                radio: radio.to_owned(),
                interface: iface.to_owned(),
                mac: mac.clone(),
                reason,
            });
        });
        true
    }
}

#[derive(Debug)]
struct Kick {
    connected_at: DateTime<Utc>,
    expires_at: Option<Instant>,
}

#[derive(Debug)]
pub struct AclKick {
    config: AclKickConfig,
    dry_run: bool,
    kicked: BTreeMap<(String, MacAddress), Kick>,
}

impl AclKick {
    pub fn new(config: AclKickConfig, dry_run: bool) -> Self {
        Self {
            config,
            dry_run,
            kicked: BTreeMap::new(),
        }
    }

    fn violates(policy: AclPolicy, listed: bool) -> bool {
        match policy {
            AclPolicy::None => false,
            AclPolicy::Allow => !listed,
            AclPolicy::Deny => listed,
        }
    }

    /// Kick every station the effective ACLs reject and that was not
    /// already kicked during its current association.
    pub fn evaluate(
        &mut self,
        tree: &ConfigTree,
        live: &LiveState,
        kicker: &mut dyn StationKicker,
        now: Instant,
    ) {
        self.kicked.retain(|(iface, mac), kick| {
            live.stations_on(iface)
                .any(|s| &s.mac == mac && s.connected_at == kick.connected_at)
        });

        for sta in live.stations() {
            let Some((radio, iface)) = tree.interface(&sta.iface) else {
                continue;
            };
            if iface.kind != InterfaceKind::Ap {
                continue;
            }
            let Some(ap) = iface.ap.as_ref() else {
                continue;
            };
            if !Self::violates(ap.acl_policy, ap.acl.contains(&sta.mac)) {
                continue;
            }
            let key = (sta.iface.clone(), sta.mac.clone());
            if self
                .kicked
                .get(&key)
                .is_some_and(|k| k.connected_at == sta.connected_at)
            {
                continue;
            }

            let reason = self.config.reason_code;
            if self.dry_run {
                info!(
                    radio = %radio.name,
                    interface = %sta.iface,
                    station = %sta.mac,
                    policy = %ap.acl_policy,
                    "dry run, would deauthenticate"
                );
            } else {
                info!(
                    radio = %radio.name,
                    interface = %sta.iface,
                    station = %sta.mac,
                    policy = %ap.acl_policy,
                    "deauthenticating"
                );
                if !kicker.deauth(&radio.name, &sta.iface, &sta.mac, reason) {
                    warn!(interface = %sta.iface, station = %sta.mac, "deauth request rejected");
                }
            }
            self.kicked.insert(
                key,
                Kick {
                    connected_at: sta.connected_at,
                    expires_at: Some(now + self.config.deauth_expiry),
                },
            );
        }
    }

    /// Forget a station that went away.
    pub fn station_removed(&mut self, iface: &str, mac: &MacAddress) {
        if self.kicked.remove(&(iface.to_owned(), mac.clone())).is_some() {
            debug!(interface = iface, station = %mac, "kicked station gone");
        }
    }

    /// Warn about kicked stations that outstayed the expiry.
    pub fn poll(&mut self, live: &LiveState, now: Instant) {
        for ((iface, mac), kick) in &mut self.kicked {
            if !kick.expires_at.is_some_and(|at| now >= at) {
                continue;
            }
            kick.expires_at = None;
            let lingering = live
                .stations_on(iface)
                .any(|s| &s.mac == mac && s.connected_at == kick.connected_at);
            if lingering {
                warn!(interface = %iface, station = %mac, "station still connected after deauth");
            }
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.kicked.values().filter_map(|k| k.expires_at).min()
    }

    pub fn tracked(&self) -> usize {
        self.kicked.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::live::LiveEvent;
    use crate::model::{LiveInterface, LiveRadio, LiveStation};

    const A: &str = "aa:00:00:00:00:01";
    const B: &str = "bb:00:00:00:00:02";

    fn setup(policy: AclPolicy) -> (LiveState, ConfigTree) {
        let mut live = LiveState::default();
        live.upsert_radio(LiveRadio::new("phy0"));
        live.upsert_interface(LiveInterface::new("wlan0", "phy0", InterfaceKind::Ap));
        live.apply(LiveEvent::StationUpdated(LiveStation::new(A, "wlan0")));
        live.apply(LiveEvent::StationUpdated(LiveStation::new(B, "wlan0")));
        let mut tree = ConfigTree::from_live(&live);
        let ap = tree.interface_mut("wlan0").unwrap().ap.as_mut().unwrap();
        ap.acl_policy = policy;
        ap.acl.insert(MacAddress::new(A));
        (live, tree)
    }

    fn kicked_macs(kicker: &RecordingKicker) -> Vec<String> {
        kicker
            .kicks()
            .into_iter()
            .map(|k| k.mac.as_str().to_owned())
            .collect()
    }

    #[test]
    fn deny_list_kicks_listed_station_once() {
        let (live, tree) = setup(AclPolicy::Deny);
        let mut kicker = RecordingKicker::new();
        let mut acl = AclKick::new(AclKickConfig::default(), false);
        let now = Instant::now();
        acl.evaluate(&tree, &live, &mut kicker, now);
        acl.evaluate(&tree, &live, &mut kicker, now);
        assert_eq!(kicked_macs(&kicker), vec![A]);
    }

    #[test]
    fn allow_list_kicks_unlisted_station() {
        let (live, tree) = setup(AclPolicy::Allow);
        let mut kicker = RecordingKicker::new();
        let mut acl = AclKick::new(AclKickConfig::default(), false);
        acl.evaluate(&tree, &live, &mut kicker, Instant::now());
        assert_eq!(kicked_macs(&kicker), vec![B]);
    }

    #[test]
    fn reconnect_is_kicked_again() {
        let (mut live, tree) = setup(AclPolicy::Deny);
        let mut kicker = RecordingKicker::new();
        let mut acl = AclKick::new(AclKickConfig::default(), false);
        acl.evaluate(&tree, &live, &mut kicker, Instant::now());

        let mut again = LiveStation::new(A, "wlan0");
        again.connected_at += chrono::Duration::seconds(5);
        live.apply(LiveEvent::StationUpdated(again));
        acl.evaluate(&tree, &live, &mut kicker, Instant::now());
        assert_eq!(kicked_macs(&kicker), vec![A, A]);
    }

    #[test]
    fn dry_run_never_calls_driver() {
        let (live, tree) = setup(AclPolicy::Deny);
        let mut kicker = RecordingKicker::new();
        let mut acl = AclKick::new(AclKickConfig::default(), true);
        acl.evaluate(&tree, &live, &mut kicker, Instant::now());
        assert!(kicker.kicks().is_empty());
        assert_eq!(acl.tracked(), 1);
    }

    #[test]
    fn expiry_and_removal() {
        let (mut live, tree) = setup(AclPolicy::Deny);
        let mut kicker = RecordingKicker::new();
        let config = AclKickConfig {
            deauth_expiry: Duration::from_secs(3),
            ..AclKickConfig::default()
        };
        let mut acl = AclKick::new(config, false);
        let t0 = Instant::now();
        acl.evaluate(&tree, &live, &mut kicker, t0);
        assert_eq!(acl.next_deadline(), Some(t0 + Duration::from_secs(3)));

        acl.poll(&live, t0 + Duration::from_secs(3));
        assert!(acl.next_deadline().is_none());

        live.apply(LiveEvent::StationRemoved {
            iface: "wlan0".into(),
            mac: MacAddress::new(A),
        });
        acl.station_removed("wlan0", &MacAddress::new(A));
        assert_eq!(acl.tracked(), 0);
    }
}
