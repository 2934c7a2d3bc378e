use tracing::trace;

use crate::model::{ConfigTree, InterfaceKind};
use crate::pipeline::{EngineView, Mutator};

/// TAIL mutator choosing the transmitting BSS on multi-BSSID radios.
///
/// An explicitly preferred interface wins. Otherwise a non-hidden SSID
/// is preferred so clients can discover the set from its beacons.
pub struct MbssPreference;

impl Mutator for MbssPreference {
    fn name(&self) -> &str {
        "mbss_hidden_preference"
    }

    fn mutate(&self, view: &EngineView<'_>, tree: &mut ConfigTree) {
        for radio in tree.radios.values_mut() {
            let capable = view.live.radio(&radio.name).is_some_and(|r| r.mbss_capable);
            if !capable {
                continue;
            }
            // (name, hidden, preferred), interfaces iterate by name
            let candidates: Vec<(&str, bool, bool)> = radio
                .interfaces
                .values()
                .filter(|i| i.kind == InterfaceKind::Ap && i.enabled)
                .filter_map(|i| {
                    let ap = i.ap.as_ref()?;
                    let preferred = view
                        .intent
                        .interface(&i.name)
                        .and_then(|ii| ii.mbss_tx_preferred)
                        .unwrap_or(false);
                    Some((i.name.as_str(), ap.ssid_hidden, preferred))
                })
                .collect();

            let pick = candidates
                .iter()
                .find(|(_, _, preferred)| *preferred)
                .or_else(|| candidates.iter().find(|(_, hidden, _)| !hidden))
                .or_else(|| candidates.first())
                .map(|(name, _, _)| (*name).to_owned());
            trace!(radio = %radio.name, tx = ?pick, "mbss transmitter");
            radio.mbss_tx_iface = pick;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::intent::IntentStore;
    use crate::intent::attr::interface as ia;
    use crate::live::LiveState;
    use crate::model::{LiveInterface, LiveRadio};
    use crate::pipeline::Invalidator;
    use crate::wps::WpsManager;

    fn live(capable: bool) -> LiveState {
        let mut live = LiveState::default();
        let mut radio = LiveRadio::new("phy0");
        radio.mbss_capable = capable;
        live.upsert_radio(radio);
        for (name, hidden) in [("wlan0", true), ("wlan1", false), ("wlan2", false)] {
            let mut iface = LiveInterface::new(name, "phy0", InterfaceKind::Ap);
            iface.ap.as_mut().unwrap().ssid_hidden = hidden;
            live.upsert_interface(iface);
        }
        live
    }

    fn tx(intent: &IntentStore, live: &LiveState) -> Option<String> {
        let wps = WpsManager::new(Invalidator::new(), &EngineConfig::default());
        let view = EngineView { intent, live, wps: &wps };
        let mut tree = ConfigTree::from_live(live);
        MbssPreference.mutate(&view, &mut tree);
        tree.radio("phy0").unwrap().mbss_tx_iface.clone()
    }

    #[test]
    fn first_visible_ssid_transmits() {
        let intent = IntentStore::new(Invalidator::new());
        assert_eq!(tx(&intent, &live(true)).as_deref(), Some("wlan1"));
        assert_eq!(tx(&intent, &live(false)), None);
    }

    #[test]
    fn explicit_preference_wins() {
        let mut intent = IntentStore::new(Invalidator::new());
        intent.set_interface("wlan2", ia::MBSS_TX_PREFERRED, Some(true));
        assert_eq!(tx(&intent, &live(true)).as_deref(), Some("wlan2"));
    }

    #[test]
    fn all_hidden_falls_back_to_first() {
        let intent = IntentStore::new(Invalidator::new());
        let mut live = live(true);
        for name in ["wlan1", "wlan2"] {
            let mut iface = live.interface(name).unwrap().clone();
            iface.ap.as_mut().unwrap().ssid_hidden = true;
            live.upsert_interface(iface);
        }
        assert_eq!(tx(&intent, &live).as_deref(), Some("wlan0"));
    }
}
