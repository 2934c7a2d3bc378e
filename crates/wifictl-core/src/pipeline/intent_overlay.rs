// ── Intent overlay ──
//
// HEAD mutator projecting the intent store onto the live base. It only
// edits radios and interfaces the base already has: nothing is created
// out of thin air.

use tracing::{debug, warn};

use super::{EngineView, Mutator};
use crate::intent::{InterfaceIntent, RadioIntent};
use crate::model::{
    ApParams, ConfigTree, InterfaceConfig, InterfaceKind, RadioConfig, StaParams,
    DEFAULT_BEACON_INTERVAL_TU,
};

pub struct IntentOverlay;

impl Mutator for IntentOverlay {
    fn name(&self) -> &str {
        "intent"
    }

    fn mutate(&self, view: &EngineView<'_>, tree: &mut ConfigTree) {
        let intent = view.intent;
        let ap_vlan_enabled = intent.ap_vlan_enabled();

        for radio in tree.radios.values_mut() {
            let radio_intent = intent.radio(&radio.name);
            if let Some(ri) = radio_intent {
                overlay_radio(ri, radio);
            }

            for iface in radio.interfaces.values_mut() {
                let eligible = match intent.interface(&iface.name) {
                    None => None,
                    Some(ii) => match ii.radio.as_deref() {
                        Some(claimed) if claimed == radio.name => Some(ii),
                        claimed => {
                            warn!(
                                interface = %iface.name,
                                claimed = claimed.unwrap_or("<none>"),
                                actual = %radio.name,
                                "radio mismatch, intent ignored"
                            );
                            continue;
                        }
                    },
                };

                if let Some(ii) = eligible {
                    overlay_interface(radio_intent, ii, iface);
                }

                if iface.kind == InterfaceKind::ApVlan {
                    let own = eligible.and_then(|ii| ii.enabled);
                    if let (None, Some(enabled)) = (own, ap_vlan_enabled) {
                        iface.enabled = enabled;
                    }
                }
            }
        }
    }
}

fn overlay_radio(ri: &RadioIntent, radio: &mut RadioConfig) {
    if let Some(enabled) = ri.enabled {
        radio.enabled = enabled;
    }
    if let Some(mask) = ri.thermal_tx_chainmask.or(ri.tx_chainmask) {
        radio.tx_chainmask = mask;
    }
    if let Some(dbm) = ri.tx_power_dbm {
        radio.tx_power_dbm = Some(dbm);
    }
    if let Some(channel) = ri.channel {
        radio.channel = Some(channel);
    }
}

fn overlay_interface(ri: Option<&RadioIntent>, ii: &InterfaceIntent, iface: &mut InterfaceConfig) {
    if let Some(enabled) = ii.enabled {
        iface.enabled = enabled;
    }
    if let Some(kind) = ii.kind {
        if kind != iface.kind {
            debug!(interface = %iface.name, from = %iface.kind, to = %kind, "kind overridden");
            iface.kind = kind;
            if kind.is_ap() {
                iface.sta = None;
                iface.ap.get_or_insert_with(ApParams::default);
            } else {
                iface.ap = None;
                iface.sta.get_or_insert_with(StaParams::default);
            }
        }
    }

    match iface.kind {
        InterfaceKind::Ap => {
            if let Some(ap) = iface.ap.as_mut() {
                if let Some(ri) = ri {
                    overlay_radio_onto_ap(ri, ap);
                }
                overlay_ap(ii, ap);
                if ap.beacon_interval_tu == 0 {
                    debug!(interface = %iface.name, "beacon interval undefined, using default");
                    ap.beacon_interval_tu = DEFAULT_BEACON_INTERVAL_TU;
                }
            }
        }
        InterfaceKind::ApVlan => {}
        InterfaceKind::Sta => {
            if let Some(sta) = iface.sta.as_mut() {
                sta.networks.clone_from(&ii.networks);
            }
        }
    }
}

fn overlay_radio_onto_ap(ri: &RadioIntent, ap: &mut ApParams) {
    if let Some(v) = ri.ht {
        ap.mode.ht = v;
    }
    if let Some(v) = ri.vht {
        ap.mode.vht = v;
    }
    if let Some(v) = ri.he {
        ap.mode.he = v;
    }
    if let Some(v) = ri.eht {
        ap.mode.eht = v;
    }
    if let Some(v) = ri.beacon_interval_tu {
        ap.beacon_interval_tu = v;
    }
    if let Some(v) = ri.channel {
        ap.channel = Some(v);
    }
}

fn overlay_ap(ii: &InterfaceIntent, ap: &mut ApParams) {
    if let Some(v) = ii.channel {
        ap.channel = Some(v);
    }
    if let Some(v) = &ii.ssid {
        ap.ssid.clone_from(v);
    }
    if let Some(v) = &ii.bridge {
        ap.bridge = Some(v.clone());
    }
    if let Some(v) = ii.ssid_hidden {
        ap.ssid_hidden = v;
    }
    if let Some(v) = ii.isolated {
        ap.isolated = v;
    }
    if let Some(v) = ii.wpa {
        ap.security.wpa = v;
    }
    if let Some(v) = ii.rsn {
        ap.security.rsn = v;
    }
    if let Some(v) = ii.pmf {
        ap.security.pmf = v;
    }
    if let Some(v) = ii.akm_psk {
        ap.security.akm_psk = v;
    }
    if let Some(v) = ii.akm_sae {
        ap.security.akm_sae = v;
    }
    if let Some(v) = ii.akm_eap {
        ap.security.akm_eap = v;
    }
    if let Some(v) = ii.beacon_interval_tu {
        ap.beacon_interval_tu = v;
    }
    if let Some(v) = ii.acl_policy {
        ap.acl_policy = v;
    }
    if let Some(v) = ii.wps {
        ap.mode.wps = v;
    }
    if let Some(v) = ii.wps_pbc {
        ap.wps_pbc = v;
    }

    ap.acl.clone_from(&ii.acl);
    ap.psks.clone_from(&ii.psks);
    ap.neighbors.clone_from(&ii.neighbors);
}
