// ── Row builders ──
//
// One builder per entity kind turns live state into the external row.
// `None` means the row should not exist right now.

use serde_json::{Value, json};

use super::db::{Row, Table};
use super::{SyncContext, SyncKey};
use crate::config::DeletedRowMode;
use crate::model::{InterfaceKind, LiveInterface, LiveRadio, LiveStation, MacAddress};

pub(crate) trait RowBuilder {
    fn table(&self) -> Table;

    fn build(&self, key: &SyncKey, ctx: &SyncContext<'_>) -> Option<Row>;
}

pub(crate) fn builder_for(key: &SyncKey) -> &'static dyn RowBuilder {
    match key {
        SyncKey::Radio(_) => &RadioRows,
        SyncKey::Interface(_) => &InterfaceRows,
        SyncKey::Station(_) => &StationRows,
        SyncKey::MldGroup(_) => &MldRows,
    }
}

fn into_row(value: Value) -> Row {
    match value {
        Value::Object(map) => map.into_iter().filter(|(_, v)| !v.is_null()).collect(),
        _ => Row::new(),
    }
}

// ── Radios ──────────────────────────────────────────────────────────

struct RadioRows;

impl RadioRows {
    fn row(radio: &LiveRadio) -> Row {
        into_row(json!({
            "name": radio.name,
            "enabled": radio.enabled,
            "channel": radio.channel.map(|c| c.control_freq_mhz),
            "center_freq0": radio.channel.map(|c| c.center_freq0_mhz),
            "width": radio.channel.map(|c| c.width.to_string()),
            "tx_chainmask": radio.tx_chainmask,
            "tx_power_dbm": radio.tx_power_dbm,
            "mbss_capable": radio.mbss_capable,
            "radar_enabled": radio.radar.enabled,
            "radar_last_channel": radio.radar.last_freq_mhz,
            "radar_num_detected": radio.radar.num_detected,
            "radar_last_detected_at": radio.radar.last_detected_at.map(|t| t.to_rfc3339()),
        }))
    }
}

impl RowBuilder for RadioRows {
    fn table(&self) -> Table {
        Table::RadioState
    }

    fn build(&self, key: &SyncKey, ctx: &SyncContext<'_>) -> Option<Row> {
        let SyncKey::Radio(name) = key else {
            return None;
        };
        ctx.live.radio(name).map(Self::row)
    }
}

// ── Interfaces ──────────────────────────────────────────────────────

struct InterfaceRows;

impl InterfaceRows {
    /// Whether the interface's row should be published at all.
    fn visible(iface: &LiveInterface, ctx: &SyncContext<'_>) -> bool {
        match ctx.deleted_row_mode {
            DeletedRowMode::Decouple => true,
            DeletedRowMode::Disable => {
                iface.kind == InterfaceKind::ApVlan || ctx.intent.interface_configured(&iface.name)
            }
        }
    }

    fn row(iface: &LiveInterface) -> Row {
        let ap = iface.ap.as_ref();
        let link = iface.sta_link.as_ref();
        into_row(json!({
            "name": iface.name,
            "radio": iface.radio,
            "kind": iface.kind.to_string(),
            "enabled": iface.enabled,
            "bssid": iface.bssid.as_ref().map(MacAddress::as_str),
            "ssid": ap.map(|ap| ap.ssid.as_str()),
            "ssid_hidden": ap.map(|ap| ap.ssid_hidden),
            "channel": ap.and_then(|ap| ap.channel).map(|c| c.control_freq_mhz),
            "wps_pbc": ap.map(|ap| ap.wps_pbc),
            "acl_policy": ap.map(|ap| ap.acl_policy.to_string()),
            "link_connected": link.map(|l| l.connected),
            "link_bssid": link.and_then(|l| l.bssid.as_ref()).map(MacAddress::as_str),
            "link_ssid": link.and_then(|l| l.ssid.as_deref()),
        }))
    }
}

impl RowBuilder for InterfaceRows {
    fn table(&self) -> Table {
        Table::InterfaceState
    }

    fn build(&self, key: &SyncKey, ctx: &SyncContext<'_>) -> Option<Row> {
        let SyncKey::Interface(name) = key else {
            return None;
        };
        let iface = ctx.live.interface(name)?;
        Self::visible(iface, ctx).then(|| Self::row(iface))
    }
}

// ── Stations ────────────────────────────────────────────────────────

struct StationRows;

impl StationRows {
    /// Reported key id, else the only PSK configured on the interface.
    fn key_id(sta: &LiveStation, ctx: &SyncContext<'_>) -> Option<u32> {
        sta.key_id.or_else(|| {
            let psks = &ctx.live.interface(&sta.iface)?.ap.as_ref()?.psks;
            match psks.keys().collect::<Vec<_>>().as_slice() {
                [only] => Some(**only),
                _ => None,
            }
        })
    }
}

impl RowBuilder for StationRows {
    fn table(&self) -> Table {
        Table::Station
    }

    fn build(&self, key: &SyncKey, ctx: &SyncContext<'_>) -> Option<Row> {
        let SyncKey::Station(mac) = key else {
            return None;
        };
        let sta = ctx.live.station(mac)?;
        Some(into_row(json!({
            "mac": sta.mac.as_str(),
            "interface": sta.iface,
            "connected_at": sta.connected_at.to_rfc3339(),
            "key_id": Self::key_id(sta, ctx),
            "mld_addr": sta.mld_addr.as_ref().map(MacAddress::as_str),
        })))
    }
}

// ── MLD groups ──────────────────────────────────────────────────────

struct MldRows;

impl RowBuilder for MldRows {
    fn table(&self) -> Table {
        Table::StationMld
    }

    fn build(&self, key: &SyncKey, ctx: &SyncContext<'_>) -> Option<Row> {
        let SyncKey::MldGroup(mld) = key else {
            return None;
        };
        let mut links: Vec<&str> = ctx
            .live
            .mld_links(mld)
            .into_iter()
            .map(|s| s.mac.as_str())
            .collect();
        if links.is_empty() {
            return None;
        }
        links.sort_unstable();
        links.dedup();
        Some(into_row(json!({
            "mld_addr": mld.as_str(),
            "links": links,
        })))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::intent::IntentStore;
    use crate::intent::attr::interface as ia;
    use crate::live::LiveState;
    use crate::pipeline::Invalidator;

    fn ctx<'a>(
        live: &'a LiveState,
        intent: &'a IntentStore,
        mode: DeletedRowMode,
    ) -> SyncContext<'a> {
        SyncContext {
            live,
            intent,
            deleted_row_mode: mode,
        }
    }

    #[test]
    fn interface_visibility_follows_mode() {
        let mut live = LiveState::default();
        live.upsert_interface(LiveInterface::new("wlan0", "phy0", InterfaceKind::Ap));
        live.upsert_interface(LiveInterface::new("wlan0.1", "phy0", InterfaceKind::ApVlan));
        let mut intent = IntentStore::new(Invalidator::new());

        let key = SyncKey::Interface("wlan0".into());
        let vlan = SyncKey::Interface("wlan0.1".into());
        let disable = ctx(&live, &intent, DeletedRowMode::Disable);
        assert!(InterfaceRows.build(&key, &disable).is_none());
        assert!(InterfaceRows.build(&vlan, &disable).is_some());
        let decouple = ctx(&live, &intent, DeletedRowMode::Decouple);
        assert!(InterfaceRows.build(&key, &decouple).is_some());

        intent.set_interface("wlan0", ia::ENABLED, Some(true));
        let disable = ctx(&live, &intent, DeletedRowMode::Disable);
        assert!(InterfaceRows.build(&key, &disable).is_some());
    }

    #[test]
    fn station_key_id_falls_back_to_single_psk() {
        let mut live = LiveState::default();
        let mut iface = LiveInterface::new("wlan0", "phy0", InterfaceKind::Ap);
        iface.ap.as_mut().unwrap().psks.insert(3, "secret".into());
        live.upsert_interface(iface);
        live.apply(crate::live::LiveEvent::StationUpdated(LiveStation::new(
            "aa:00:00:00:00:01",
            "wlan0",
        )));
        let intent = IntentStore::new(Invalidator::new());
        let row = StationRows
            .build(
                &SyncKey::Station(MacAddress::new("aa:00:00:00:00:01")),
                &ctx(&live, &intent, DeletedRowMode::Disable),
            )
            .unwrap();
        assert_eq!(row.get("key_id"), Some(&json!(3)));
        assert_eq!(row.get("interface"), Some(&json!("wlan0")));
    }

    #[test]
    fn mld_row_lists_sorted_links() {
        let mut live = LiveState::default();
        let mld = MacAddress::new("02:00:00:00:00:01");
        for (mac, iface) in [("aa:00:00:00:00:02", "wlan1"), ("aa:00:00:00:00:01", "wlan0")] {
            let mut sta = LiveStation::new(mac, iface);
            sta.mld_addr = Some(mld.clone());
            live.apply(crate::live::LiveEvent::StationUpdated(sta));
        }
        let intent = IntentStore::new(Invalidator::new());
        let row = MldRows
            .build(
                &SyncKey::MldGroup(mld),
                &ctx(&live, &intent, DeletedRowMode::Disable),
            )
            .unwrap();
        assert_eq!(
            row.get("links"),
            Some(&json!(["aa:00:00:00:00:01", "aa:00:00:00:00:02"]))
        );
    }
}
