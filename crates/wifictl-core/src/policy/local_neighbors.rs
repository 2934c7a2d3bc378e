// ── Local neighbor reports ──
//
// Interfaces sharing a steering group advertise each other in their
// neighbor report lists so clients can be steered between them. Data
// comes from live state only; a group is skipped until every member's
// BSS is fully known.

use tracing::debug;

use crate::live::LiveState;
use crate::model::{ApMode, ConfigTree, Neighbor};
use crate::pipeline::{EngineView, Mutator};

/// Reachability, security, key scope and capability bits.
pub const DEFAULT_BSSID_INFO: u32 = 0x8f;

fn phy_type(mode: ApMode) -> u8 {
    if mode.eht {
        15
    } else if mode.he {
        14
    } else if mode.vht {
        9
    } else if mode.ht {
        7
    } else {
        0
    }
}

/// Neighbor entry describing `iface` as it currently runs.
fn local_neighbor(live: &LiveState, iface: &str) -> Option<Neighbor> {
    let live_iface = live.interface(iface)?;
    let bssid = live_iface.bssid.clone()?;
    let ap = live_iface.ap.as_ref()?;
    let channel = ap
        .channel
        .or_else(|| live.radio(&live_iface.radio).and_then(|r| r.channel))?;
    let op_class = channel.op_class()?;
    let chan = u8::try_from(channel.control_chan()?).ok()?;
    Some(Neighbor {
        bssid,
        bssid_info: DEFAULT_BSSID_INFO,
        op_class,
        channel: chan,
        phy_type: phy_type(ap.mode),
    })
}

/// TAIL mutator adding steering peers to neighbor lists. Entries the
/// intent already carries for a BSSID are left as they are.
pub struct LocalNeighbors;

impl Mutator for LocalNeighbors {
    fn name(&self) -> &str {
        "local_neighbors"
    }

    fn mutate(&self, view: &EngineView<'_>, tree: &mut ConfigTree) {
        for (group, members) in view.intent.steering_groups() {
            let neighbors: Option<Vec<(&str, Neighbor)>> = members
                .iter()
                .map(|m| local_neighbor(view.live, m).map(|n| (m.as_str(), n)))
                .collect();
            let Some(neighbors) = neighbors else {
                debug!(group, "steering group incomplete, neighbors not synthesized");
                continue;
            };

            for member in members {
                let Some(ap) = tree.interface_mut(member).and_then(|i| i.ap.as_mut()) else {
                    continue;
                };
                for (peer, neighbor) in &neighbors {
                    if *peer == member.as_str() {
                        continue;
                    }
                    ap.neighbors
                        .entry(neighbor.bssid.clone())
                        .or_insert_with(|| neighbor.clone());
                }
            }
        }
    }
}
