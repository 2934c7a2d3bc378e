// ── Intent store ──
//
// Desired configuration for radios and interfaces. Every attribute is
// optional: unset inherits the live value, set overrides it. Each
// logical write that changes something invalidates the pipeline once
// and notifies observers once.

pub mod attr;
mod document;
mod observer;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use attr::Attr;
pub use document::IntentDocument;
pub use observer::{IntentObserver, ObserverRegistry};

use crate::model::{
    AclPolicy, Channel, InterfaceKind, MacAddress, Neighbor, PmfMode, StaNetwork,
};
use crate::pipeline::Invalidator;

// ── Entities ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RadioIntent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_chainmask: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thermal_tx_chainmask: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_power_dbm: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beacon_interval_tu: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ht: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vht: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub he: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eht: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterfaceIntent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<InterfaceKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssid_hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isolated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl_policy: Option<AclPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wpa: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsn: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pmf: Option<PmfMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub akm_psk: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub akm_sae: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub akm_eap: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wps: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wps_pbc: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beacon_interval_tu: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mbss_tx_preferred: Option<bool>,

    // Keyed sub-collections, always replaced wholesale downstream.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub acl: BTreeSet<MacAddress>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub psks: BTreeMap<u32, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub neighbors: BTreeMap<MacAddress, Neighbor>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, StaNetwork>,

    /// Config row deleted while interfaces are kept disabled.
    #[serde(skip)]
    pub(crate) detached: bool,
}

impl InterfaceIntent {
    /// Unset everything except `enabled` and `radio`.
    fn clear(&mut self) {
        *self = Self {
            radio: self.radio.take(),
            enabled: self.enabled,
            detached: self.detached,
            ..Self::default()
        };
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }
}

// ── Change logging ──────────────────────────────────────────────────

fn log_change<T: Debug>(entity: &str, attr: &str, from: Option<&T>, to: Option<&T>) {
    match (from, to) {
        (None, Some(to)) => info!(entity, attr, "set to {to:?}"),
        (Some(from), Some(to)) => info!(entity, attr, "changed from {from:?} to {to:?}"),
        (Some(from), None) => info!(entity, attr, "unset from {from:?}"),
        (None, None) => {}
    }
}

fn set_slot<E, T: PartialEq + Debug>(
    entity_name: &str,
    entity: &mut E,
    attr: Attr<E, T>,
    value: Option<T>,
) -> bool {
    let slot = (attr.get_mut)(entity);
    if *slot == value {
        return false;
    }
    log_change(entity_name, attr.name, slot.as_ref(), value.as_ref());
    *slot = value;
    true
}

// ── Store ───────────────────────────────────────────────────────────

/// Desired configuration, owned by the engine.
#[derive(Debug)]
pub struct IntentStore {
    radios: BTreeMap<String, RadioIntent>,
    interfaces: BTreeMap<String, InterfaceIntent>,
    ap_vlan_enabled: Option<bool>,
    steering_groups: BTreeMap<String, BTreeSet<String>>,
    observers: ObserverRegistry,
    invalidator: Invalidator,
}

impl IntentStore {
    pub fn new(invalidator: Invalidator) -> Self {
        Self {
            radios: BTreeMap::new(),
            interfaces: BTreeMap::new(),
            ap_vlan_enabled: None,
            steering_groups: BTreeMap::new(),
            observers: ObserverRegistry::default(),
            invalidator,
        }
    }

    pub fn register_observer(&mut self, observer: Box<dyn IntentObserver>) {
        self.observers.register(observer);
    }

    fn radio_changed(&mut self, name: &str) {
        self.invalidator.invalidate();
        self.observers.notify_radio(name);
    }

    fn interface_changed(&mut self, name: &str) {
        self.invalidator.invalidate();
        self.observers.notify_interface(name);
    }

    // ── Read-only lookups ────────────────────────────────────────────
    // None of these allocate an entity.

    pub fn radio(&self, name: &str) -> Option<&RadioIntent> {
        self.radios.get(name)
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceIntent> {
        self.interfaces.get(name)
    }

    pub fn radios(&self) -> impl Iterator<Item = (&str, &RadioIntent)> {
        self.radios.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn interfaces(&self) -> impl Iterator<Item = (&str, &InterfaceIntent)> {
        self.interfaces.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get_radio<T: Clone>(&self, name: &str, attr: Attr<RadioIntent, T>) -> Option<T> {
        self.radios.get(name).and_then(|r| (attr.get)(r).clone())
    }

    pub fn get_interface<T: Clone>(
        &self,
        name: &str,
        attr: Attr<InterfaceIntent, T>,
    ) -> Option<T> {
        self.interfaces.get(name).and_then(|i| (attr.get)(i).clone())
    }

    /// Whether a configuration row currently backs this interface.
    pub fn interface_configured(&self, name: &str) -> bool {
        self.interfaces.get(name).is_some_and(|i| !i.detached)
    }

    pub fn ap_vlan_enabled(&self) -> Option<bool> {
        self.ap_vlan_enabled
    }

    // ── Attribute setters ────────────────────────────────────────────

    /// Set or unset one radio attribute. Returns whether it changed.
    pub fn set_radio<T: PartialEq + Debug>(
        &mut self,
        name: &str,
        attr: Attr<RadioIntent, T>,
        value: Option<T>,
    ) -> bool {
        let changed = match (self.radios.get_mut(name), value) {
            (Some(radio), value) => set_slot(name, radio, attr, value),
            (None, None) => false,
            (None, Some(value)) => {
                let radio = self.radios.entry(name.to_owned()).or_default();
                set_slot(name, radio, attr, Some(value))
            }
        };
        if changed {
            self.radio_changed(name);
        }
        changed
    }

    /// Set or unset one interface attribute. Returns whether it changed.
    pub fn set_interface<T: PartialEq + Debug>(
        &mut self,
        name: &str,
        attr: Attr<InterfaceIntent, T>,
        value: Option<T>,
    ) -> bool {
        if value.is_none() && !self.interfaces.contains_key(name) {
            return false;
        }
        self.edit_interface(name, |iface| set_slot(name, iface, attr, value))
    }

    pub fn set_ap_vlan_enabled(&mut self, value: Option<bool>) -> bool {
        if self.ap_vlan_enabled == value {
            return false;
        }
        log_change("ap_vlan", "enabled", self.ap_vlan_enabled.as_ref(), value.as_ref());
        self.ap_vlan_enabled = value;
        self.invalidator.invalidate();
        true
    }

    /// Lookup-or-create an interface, run `edit`, and notify once if
    /// it reports a change. Any write re-attaches a detached interface.
    fn edit_interface(
        &mut self,
        name: &str,
        edit: impl FnOnce(&mut InterfaceIntent) -> bool,
    ) -> bool {
        let iface = self.interfaces.entry(name.to_owned()).or_default();
        let reattached = std::mem::take(&mut iface.detached);
        if reattached {
            debug!(interface = name, "config row back, re-attaching");
        }
        let changed = edit(iface) || reattached;
        if changed {
            self.interface_changed(name);
        }
        changed
    }

    /// Like `edit_interface` but never allocates: a missing interface
    /// has nothing to remove.
    fn edit_existing_interface(
        &mut self,
        name: &str,
        edit: impl FnOnce(&mut InterfaceIntent) -> bool,
    ) -> bool {
        if !self.interfaces.contains_key(name) {
            return false;
        }
        self.edit_interface(name, edit)
    }

    // ── ACL entries ──────────────────────────────────────────────────

    pub fn add_acl_entry(&mut self, iface: &str, mac: MacAddress) -> bool {
        self.edit_interface(iface, |i| {
            let added = i.acl.insert(mac.clone());
            if added {
                info!(interface = iface, %mac, "acl entry added");
            }
            added
        })
    }

    pub fn del_acl_entry(&mut self, iface: &str, mac: &MacAddress) -> bool {
        self.edit_existing_interface(iface, |i| {
            let removed = i.acl.remove(mac);
            if removed {
                info!(interface = iface, %mac, "acl entry removed");
            }
            removed
        })
    }

    pub fn flush_acl_entries(&mut self, iface: &str) -> bool {
        self.edit_existing_interface(iface, |i| flush(iface, "acl", &mut i.acl))
    }

    /// Replace the whole ACL in one logical write.
    pub fn set_acl_entries(&mut self, iface: &str, acl: BTreeSet<MacAddress>) -> bool {
        self.edit_interface(iface, |i| replace(iface, "acl", &mut i.acl, acl))
    }

    // ── PSK entries ──────────────────────────────────────────────────

    pub fn add_psk(&mut self, iface: &str, key_id: u32, psk: impl Into<String>) -> bool {
        let psk = psk.into();
        self.edit_interface(iface, |i| {
            insert_keyed(iface, "psk", &mut i.psks, key_id, psk)
        })
    }

    pub fn del_psk(&mut self, iface: &str, key_id: u32) -> bool {
        self.edit_existing_interface(iface, |i| {
            remove_keyed(iface, "psk", &mut i.psks, &key_id)
        })
    }

    pub fn flush_psks(&mut self, iface: &str) -> bool {
        self.edit_existing_interface(iface, |i| flush(iface, "psk", &mut i.psks))
    }

    pub fn set_psks(&mut self, iface: &str, psks: BTreeMap<u32, String>) -> bool {
        self.edit_interface(iface, |i| replace(iface, "psk", &mut i.psks, psks))
    }

    // ── Neighbor report entries ──────────────────────────────────────

    pub fn add_neighbor(&mut self, iface: &str, neighbor: Neighbor) -> bool {
        self.edit_interface(iface, |i| {
            insert_keyed(
                iface,
                "neighbor",
                &mut i.neighbors,
                neighbor.bssid.clone(),
                neighbor,
            )
        })
    }

    pub fn del_neighbor(&mut self, iface: &str, bssid: &MacAddress) -> bool {
        self.edit_existing_interface(iface, |i| {
            remove_keyed(iface, "neighbor", &mut i.neighbors, bssid)
        })
    }

    pub fn flush_neighbors(&mut self, iface: &str) -> bool {
        self.edit_existing_interface(iface, |i| flush(iface, "neighbor", &mut i.neighbors))
    }

    pub fn set_neighbors(&mut self, iface: &str, neighbors: BTreeMap<MacAddress, Neighbor>) -> bool {
        self.edit_interface(iface, |i| {
            replace(iface, "neighbor", &mut i.neighbors, neighbors)
        })
    }

    // ── Station network profiles ─────────────────────────────────────

    pub fn add_network(&mut self, iface: &str, network: StaNetwork) -> bool {
        self.edit_interface(iface, |i| {
            insert_keyed(
                iface,
                "network",
                &mut i.networks,
                network.ssid.clone(),
                network,
            )
        })
    }

    pub fn del_network(&mut self, iface: &str, ssid: &str) -> bool {
        self.edit_existing_interface(iface, |i| {
            remove_keyed(iface, "network", &mut i.networks, ssid)
        })
    }

    pub fn flush_networks(&mut self, iface: &str) -> bool {
        self.edit_existing_interface(iface, |i| flush(iface, "network", &mut i.networks))
    }

    pub fn set_networks(&mut self, iface: &str, networks: BTreeMap<String, StaNetwork>) -> bool {
        self.edit_interface(iface, |i| {
            replace(iface, "network", &mut i.networks, networks)
        })
    }

    // ── Whole-entity operations ──────────────────────────────────────

    /// Unset every attribute except `enabled` and `radio`, flush every
    /// sub-collection.
    pub fn clear_interface(&mut self, name: &str) -> bool {
        let Some(iface) = self.interfaces.get_mut(name) else {
            return false;
        };
        let before = iface.clone();
        iface.clear();
        let changed = *iface != before;
        if changed {
            info!(interface = name, "cleared");
            self.interface_changed(name);
        }
        changed
    }

    /// Forget the interface's config row but keep it around, disabled.
    pub fn detach_interface(&mut self, name: &str) -> bool {
        let Some(iface) = self.interfaces.get_mut(name) else {
            return false;
        };
        let before = iface.clone();
        iface.clear();
        iface.enabled = Some(false);
        iface.detached = true;
        let changed = *iface != before;
        if changed {
            info!(interface = name, "config row gone, interface disabled");
            self.interface_changed(name);
        }
        changed
    }

    pub fn remove_interface(&mut self, name: &str) -> bool {
        if self.interfaces.remove(name).is_none() {
            return false;
        }
        info!(interface = name, "removed");
        self.interface_changed(name);
        true
    }

    pub fn remove_radio(&mut self, name: &str) -> bool {
        if self.radios.remove(name).is_none() {
            return false;
        }
        info!(radio = name, "removed");
        self.radio_changed(name);
        true
    }

    /// Install a whole radio record at once.
    pub fn replace_radio(&mut self, name: &str, mut intent: RadioIntent) -> bool {
        intent.channel = intent.channel.map(Channel::with_center);
        if self.radios.get(name) == Some(&intent) {
            return false;
        }
        info!(radio = name, "replaced");
        self.radios.insert(name.to_owned(), intent);
        self.radio_changed(name);
        true
    }

    /// Install a whole interface record at once.
    pub fn replace_interface(&mut self, name: &str, mut intent: InterfaceIntent) -> bool {
        intent.channel = intent.channel.map(Channel::with_center);
        intent.detached = false;
        if self.interfaces.get(name) == Some(&intent) {
            return false;
        }
        info!(interface = name, "replaced");
        self.interfaces.insert(name.to_owned(), intent);
        self.interface_changed(name);
        true
    }

    // ── Steering groups ──────────────────────────────────────────────

    pub fn set_steering_group(&mut self, id: &str, members: BTreeSet<String>) -> bool {
        if self.steering_groups.get(id) == Some(&members) {
            return false;
        }
        info!(group = id, members = members.len(), "steering group set");
        self.steering_groups.insert(id.to_owned(), members);
        self.invalidator.invalidate();
        true
    }

    pub fn remove_steering_group(&mut self, id: &str) -> bool {
        if self.steering_groups.remove(id).is_none() {
            return false;
        }
        info!(group = id, "steering group removed");
        self.invalidator.invalidate();
        true
    }

    pub fn steering_groups(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.steering_groups.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Every interface sharing a steering group with `iface`, itself
    /// included when it belongs to any group.
    pub fn steering_peers(&self, iface: &str) -> BTreeSet<String> {
        self.steering_groups
            .values()
            .filter(|members| members.contains(iface))
            .flatten()
            .cloned()
            .collect()
    }
}

// ── Sub-collection helpers ──────────────────────────────────────────

fn flush<C: Default + IsEmpty>(iface: &str, what: &str, coll: &mut C) -> bool {
    if coll.is_empty() {
        return false;
    }
    *coll = C::default();
    info!(interface = iface, "{what} entries flushed");
    true
}

fn replace<C: PartialEq>(iface: &str, what: &str, coll: &mut C, new: C) -> bool {
    if *coll == new {
        return false;
    }
    *coll = new;
    info!(interface = iface, "{what} entries replaced");
    true
}

fn insert_keyed<K: Ord + Debug, V: PartialEq>(
    iface: &str,
    what: &str,
    map: &mut BTreeMap<K, V>,
    key: K,
    value: V,
) -> bool {
    if map.get(&key) == Some(&value) {
        return false;
    }
    info!(interface = iface, key = ?key, "{what} entry set");
    map.insert(key, value);
    true
}

fn remove_keyed<K, Q, V>(iface: &str, what: &str, map: &mut BTreeMap<K, V>, key: &Q) -> bool
where
    K: Ord + std::borrow::Borrow<Q>,
    Q: Ord + Debug + ?Sized,
{
    if map.remove(key).is_none() {
        return false;
    }
    info!(interface = iface, key = ?key, "{what} entry removed");
    true
}

trait IsEmpty {
    fn is_empty(&self) -> bool;
}

impl<T> IsEmpty for BTreeSet<T> {
    fn is_empty(&self) -> bool {
        BTreeSet::is_empty(self)
    }
}

impl<K, V> IsEmpty for BTreeMap<K, V> {
    fn is_empty(&self) -> bool {
        BTreeMap::is_empty(self)
    }
}
