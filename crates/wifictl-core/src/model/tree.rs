// ── Configuration tree ──
//
// The shape both the live base and the pipeline output share: radios
// owning their interfaces. Mutators edit this tree in place.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::channel::Channel;
use super::live::{LiveInterface, LiveRadio};
use super::mac::MacAddress;
use crate::live::LiveState;

/// Beacon interval drivers fall back to when none is given.
pub const DEFAULT_BEACON_INTERVAL_TU: u32 = 100;

// ── Enumerations ────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InterfaceKind {
    #[default]
    Ap,
    ApVlan,
    Sta,
}

impl InterfaceKind {
    pub fn is_ap(self) -> bool {
        matches!(self, Self::Ap | Self::ApVlan)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AclPolicy {
    #[default]
    None,
    Allow,
    Deny,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PmfMode {
    #[default]
    Disabled,
    Optional,
    Required,
}

// ── AP parameters ───────────────────────────────────────────────────

/// PHY generations and provisioning enabled on a BSS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ApMode {
    pub ht: bool,
    pub vht: bool,
    pub he: bool,
    pub eht: bool,
    pub wps: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Security {
    pub wpa: bool,
    pub rsn: bool,
    pub pmf: PmfMode,
    pub akm_psk: bool,
    pub akm_sae: bool,
    pub akm_eap: bool,
}

/// 802.11k neighbor report entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbor {
    pub bssid: MacAddress,
    pub bssid_info: u32,
    pub op_class: u8,
    pub channel: u8,
    pub phy_type: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApParams {
    pub ssid: String,
    pub ssid_hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge: Option<String>,
    pub isolated: bool,
    pub beacon_interval_tu: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
    pub mode: ApMode,
    pub wps_pbc: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub wps_creds: Vec<String>,
    pub acl_policy: AclPolicy,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub acl: BTreeSet<MacAddress>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub psks: BTreeMap<u32, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub neighbors: BTreeMap<MacAddress, Neighbor>,
    pub security: Security,
}

// ── STA parameters ──────────────────────────────────────────────────

/// A network profile a station interface may join.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaNetwork {
    pub ssid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bssid: Option<MacAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psk: Option<String>,
    pub multi_ap: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaParams {
    pub networks: BTreeMap<String, StaNetwork>,
}

// ── Tree nodes ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    pub name: String,
    pub kind: InterfaceKind,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ap: Option<ApParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sta: Option<StaParams>,
}

impl InterfaceConfig {
    fn from_live(live: &LiveInterface) -> Self {
        let (ap, sta) = if live.kind.is_ap() {
            (Some(live.ap.clone().unwrap_or_default()), None)
        } else {
            (None, Some(live.sta_params.clone().unwrap_or_default()))
        };
        Self {
            name: live.name.clone(),
            kind: live.kind,
            enabled: live.enabled,
            ap,
            sta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioConfig {
    pub name: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
    pub tx_chainmask: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_power_dbm: Option<u32>,
    /// Where to move after a radar hit, chosen by the DFS sieve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radar_next_channel: Option<Channel>,
    /// Transmitting BSS of a multi-BSSID set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbss_tx_iface: Option<String>,
    #[serde(default)]
    pub interfaces: BTreeMap<String, InterfaceConfig>,
}

impl RadioConfig {
    fn from_live(live: &LiveRadio) -> Self {
        Self {
            name: live.name.clone(),
            enabled: live.enabled,
            channel: live.channel,
            tx_chainmask: live.tx_chainmask,
            tx_power_dbm: live.tx_power_dbm,
            radar_next_channel: None,
            mbss_tx_iface: None,
            interfaces: BTreeMap::new(),
        }
    }

    /// AP and AP_VLAN interfaces of this radio.
    pub fn ap_interfaces_mut(&mut self) -> impl Iterator<Item = (&mut ApParams, InterfaceKind)> {
        self.interfaces
            .values_mut()
            .filter_map(|i| i.ap.as_mut().map(|ap| (ap, i.kind)))
    }
}

/// Radios keyed by name, each owning its interfaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigTree {
    pub radios: BTreeMap<String, RadioConfig>,
}

impl ConfigTree {
    /// Base tree mirroring what the drivers currently report.
    /// Interfaces whose radio is not known are left out.
    pub fn from_live(live: &LiveState) -> Self {
        let mut radios: BTreeMap<String, RadioConfig> = live
            .radios()
            .map(|r| (r.name.clone(), RadioConfig::from_live(r)))
            .collect();
        for iface in live.interfaces() {
            if let Some(radio) = radios.get_mut(&iface.radio) {
                radio
                    .interfaces
                    .insert(iface.name.clone(), InterfaceConfig::from_live(iface));
            }
        }
        Self { radios }
    }

    pub fn radio(&self, name: &str) -> Option<&RadioConfig> {
        self.radios.get(name)
    }

    pub fn radio_mut(&mut self, name: &str) -> Option<&mut RadioConfig> {
        self.radios.get_mut(name)
    }

    /// Look up an interface along with the radio it sits under.
    pub fn interface(&self, name: &str) -> Option<(&RadioConfig, &InterfaceConfig)> {
        self.radios
            .values()
            .find_map(|r| r.interfaces.get(name).map(|i| (r, i)))
    }

    pub fn interface_mut(&mut self, name: &str) -> Option<&mut InterfaceConfig> {
        self.radios
            .values_mut()
            .find_map(|r| r.interfaces.get_mut(name))
    }

    pub fn interfaces(&self) -> impl Iterator<Item = (&RadioConfig, &InterfaceConfig)> {
        self.radios
            .values()
            .flat_map(|r| r.interfaces.values().map(move |i| (r, i)))
    }
}
