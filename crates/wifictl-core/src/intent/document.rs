// ── Intent documents ──
//
// A whole desired configuration in one serde value. Applying it goes
// through the store's replace operations so observers and the
// pipeline see ordinary per-entity changes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{InterfaceIntent, IntentStore, RadioIntent};
use crate::error::CoreError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntentDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ap_vlan_enabled: Option<bool>,
    pub radios: BTreeMap<String, RadioIntent>,
    pub interfaces: BTreeMap<String, InterfaceIntent>,
    pub steering_groups: BTreeMap<String, BTreeSet<String>>,
}

impl IntentDocument {
    /// Reject documents that could never be applied consistently.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, iface) in &self.interfaces {
            if let Some(radio) = &iface.radio {
                if radio.is_empty() {
                    return Err(CoreError::Document {
                        message: format!("interface {name} names an empty radio"),
                    });
                }
            }
            if iface.networks.keys().any(String::is_empty) {
                return Err(CoreError::Document {
                    message: format!("interface {name} has a network without ssid"),
                });
            }
        }
        for (id, members) in &self.steering_groups {
            if let Some(missing) = members.iter().find(|m| !self.interfaces.contains_key(*m)) {
                return Err(CoreError::Document {
                    message: format!("steering group {id} references unknown interface {missing}"),
                });
            }
        }
        Ok(())
    }
}

impl IntentStore {
    /// Make the store match `doc` exactly. Returns whether anything
    /// changed.
    pub fn apply_document(&mut self, doc: IntentDocument) -> Result<bool, CoreError> {
        doc.validate()?;
        let mut changed = self.set_ap_vlan_enabled(doc.ap_vlan_enabled);

        let stale_radios: Vec<String> = self
            .radios
            .keys()
            .filter(|k| !doc.radios.contains_key(*k))
            .cloned()
            .collect();
        for name in stale_radios {
            changed |= self.remove_radio(&name);
        }
        for (name, radio) in doc.radios {
            changed |= self.replace_radio(&name, radio);
        }

        let stale_ifaces: Vec<String> = self
            .interfaces
            .keys()
            .filter(|k| !doc.interfaces.contains_key(*k))
            .cloned()
            .collect();
        for name in stale_ifaces {
            changed |= self.remove_interface(&name);
        }
        for (name, iface) in doc.interfaces {
            changed |= self.replace_interface(&name, iface);
        }

        let stale_groups: Vec<String> = self
            .steering_groups
            .keys()
            .filter(|k| !doc.steering_groups.contains_key(*k))
            .cloned()
            .collect();
        for id in stale_groups {
            changed |= self.remove_steering_group(&id);
        }
        for (id, members) in doc.steering_groups {
            changed |= self.set_steering_group(&id, members);
        }
        Ok(changed)
    }

    /// Export the current contents. Detached interfaces are left out
    /// since they have no config row.
    pub fn document(&self) -> IntentDocument {
        IntentDocument {
            ap_vlan_enabled: self.ap_vlan_enabled,
            radios: self.radios.clone(),
            interfaces: self
                .interfaces
                .iter()
                .filter(|(_, i)| !i.detached)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            steering_groups: self.steering_groups.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Channel, ChannelWidth};
    use crate::pipeline::Invalidator;

    const DOC: &str = r#"{
        "radios": {
            "phy1": { "enabled": true, "channel": { "control_freq_mhz": 5260, "width": "40mhz" } }
        },
        "interfaces": {
            "wlan1": { "radio": "phy1", "ssid": "home", "psks": { "1": "secret" } },
            "wlan2": { "radio": "phy1", "ssid": "guest" }
        },
        "steering_groups": { "home": ["wlan1", "wlan2"] }
    }"#;

    #[test]
    fn apply_fills_channel_center_and_is_idempotent() {
        let inv = Invalidator::new();
        let mut store = IntentStore::new(inv.clone());
        let doc: IntentDocument = serde_json::from_str(DOC).unwrap();

        assert!(store.apply_document(doc.clone()).unwrap());
        let channel = store.radio("phy1").unwrap().channel.unwrap();
        assert_eq!(channel, Channel::new(5260, 5270, ChannelWidth::Mhz40));

        let generation = inv.generation();
        assert!(!store.apply_document(doc).unwrap());
        assert_eq!(inv.generation(), generation);
    }

    #[test]
    fn apply_removes_entities_no_longer_listed() {
        let mut store = IntentStore::new(Invalidator::new());
        store.apply_document(serde_json::from_str(DOC).unwrap()).unwrap();

        let mut doc: IntentDocument = serde_json::from_str(DOC).unwrap();
        doc.interfaces.remove("wlan2");
        doc.steering_groups.clear();
        assert!(store.apply_document(doc).unwrap());
        assert!(store.interface("wlan2").is_none());
        assert_eq!(store.steering_groups().count(), 0);
    }

    #[test]
    fn dangling_steering_member_is_rejected() {
        let mut doc: IntentDocument = serde_json::from_str(DOC).unwrap();
        doc.interfaces.remove("wlan2");
        let err = doc.validate().unwrap_err();
        assert!(err.to_string().contains("wlan2"));
    }
}
