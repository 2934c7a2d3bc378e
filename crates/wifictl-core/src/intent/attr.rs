// ── Typed attribute keys ──
//
// An `Attr<E, T>` names one optional field of an intent entity and
// knows how to reach it, so the store can offer a single generic
// set/get pair instead of one accessor per field.

use std::fmt;

use super::{InterfaceIntent, RadioIntent};
use crate::model::{AclPolicy, Channel, InterfaceKind, PmfMode};

pub struct Attr<E, T: 'static> {
    pub name: &'static str,
    pub(crate) get: fn(&E) -> &Option<T>,
    pub(crate) get_mut: fn(&mut E) -> &mut Option<T>,
}

impl<E, T> Clone for Attr<E, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, T> Copy for Attr<E, T> {}

impl<E, T> fmt::Debug for Attr<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Attr").field(&self.name).finish()
    }
}

macro_rules! attrs {
    ($entity:ty => $( $(#[$meta:meta])* $konst:ident : $field:ident : $ty:ty ),* $(,)?) => {
        $(
            $(#[$meta])*
            pub const $konst: Attr<$entity, $ty> = {
                #[allow(clippy::ref_option)]
                fn get(e: &$entity) -> &Option<$ty> {
                    &e.$field
                }
                #[allow(clippy::ref_option)]
                fn get_mut(e: &mut $entity) -> &mut Option<$ty> {
                    &mut e.$field
                }
                Attr {
                    name: stringify!($field),
                    get,
                    get_mut,
                }
            };
        )*
    };
}

/// Radio attribute keys.
pub mod radio {
    use super::{Attr, Channel, RadioIntent};

    attrs! { RadioIntent =>
        ENABLED: enabled: bool,
        TX_CHAINMASK: tx_chainmask: u32,
        /// Thermal throttling mask; wins over `TX_CHAINMASK`.
        THERMAL_TX_CHAINMASK: thermal_tx_chainmask: u32,
        TX_POWER_DBM: tx_power_dbm: u32,
        BEACON_INTERVAL_TU: beacon_interval_tu: u32,
        CHANNEL: channel: Channel,
        HT: ht: bool,
        VHT: vht: bool,
        HE: he: bool,
        EHT: eht: bool,
    }
}

/// Interface attribute keys.
pub mod interface {
    use super::{AclPolicy, Attr, Channel, InterfaceIntent, InterfaceKind, PmfMode};

    attrs! { InterfaceIntent =>
        /// Weak reference to the owning radio, by name.
        RADIO: radio: String,
        KIND: kind: InterfaceKind,
        ENABLED: enabled: bool,
        SSID: ssid: String,
        SSID_HIDDEN: ssid_hidden: bool,
        BRIDGE: bridge: String,
        ISOLATED: isolated: bool,
        ACL_POLICY: acl_policy: AclPolicy,
        WPA: wpa: bool,
        RSN: rsn: bool,
        PMF: pmf: PmfMode,
        AKM_PSK: akm_psk: bool,
        AKM_SAE: akm_sae: bool,
        AKM_EAP: akm_eap: bool,
        WPS: wps: bool,
        WPS_PBC: wps_pbc: bool,
        CHANNEL: channel: Channel,
        BEACON_INTERVAL_TU: beacon_interval_tu: u32,
        MBSS_TX_PREFERRED: mbss_tx_preferred: bool,
    }
}
