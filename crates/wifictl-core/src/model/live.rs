// ── Driver-reported state ──
//
// What the live-state observer tells us about radios, interfaces and
// associated stations. These are plain records; `crate::live` keeps
// them indexed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::channel::{Channel, ChannelState};
use super::mac::MacAddress;
use super::tree::{ApParams, InterfaceKind, StaParams};

/// Radar detection bookkeeping of one radio.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarInfo {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_freq_mhz: Option<u32>,
    pub num_detected: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_detected_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveRadio {
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
    #[serde(default)]
    pub tx_chainmask: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_power_dbm: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channel_states: Vec<ChannelState>,
    #[serde(default)]
    pub radar: RadarInfo,
    #[serde(default)]
    pub mbss_capable: bool,
}

impl LiveRadio {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            channel: None,
            tx_chainmask: 0,
            tx_power_dbm: None,
            channel_states: Vec::new(),
            radar: RadarInfo::default(),
            mbss_capable: false,
        }
    }
}

/// Upstream link of a station-mode interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaLink {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bssid: Option<MacAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveInterface {
    pub name: String,
    pub radio: String,
    #[serde(default)]
    pub kind: InterfaceKind,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bssid: Option<MacAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ap: Option<ApParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sta_params: Option<StaParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sta_link: Option<StaLink>,
}

impl LiveInterface {
    pub fn new(name: impl Into<String>, radio: impl Into<String>, kind: InterfaceKind) -> Self {
        Self {
            name: name.into(),
            radio: radio.into(),
            kind,
            enabled: true,
            bssid: None,
            ap: kind.is_ap().then(ApParams::default),
            sta_params: None,
            sta_link: None,
        }
    }
}

/// A client associated to one of our AP interfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStation {
    pub mac: MacAddress,
    pub iface: String,
    #[serde(default)]
    pub connected_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mld_addr: Option<MacAddress>,
}

impl LiveStation {
    pub fn new(mac: impl Into<MacAddress>, iface: impl Into<String>) -> Self {
        Self {
            mac: mac.into(),
            iface: iface.into(),
            connected_at: DateTime::<Utc>::default(),
            key_id: None,
            mld_addr: None,
        }
    }
}
