// ── Radar next channel ──
//
// Picks the channel a radio escapes to when radar hits its operating
// channel. Without a pick the driver chooses at random and may land on
// a channel that needs a fresh CAC. Candidates are sieved by DFS state
// and the first one of the best priority class wins, widest first.

use tracing::{trace, warn};

use crate::intent::IntentStore;
use crate::model::channel::{channel_from_group, unii_5g_groups};
use crate::model::{Band, Channel, ChannelState, ChannelWidth, ConfigTree, DfsState, LiveRadio};
use crate::pipeline::{EngineView, Mutator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Priority {
    Unusable,
    NonDfsOrCacCompleted,
    NonDfs,
    NonDfsAndOperating,
}

#[derive(Debug)]
struct SieveEntry {
    channel: Channel,
    priority: Option<Priority>,
}

/// States of the segments of `channel` that the radio reports.
fn segment_states(states: &[ChannelState], channel: &Channel) -> Vec<ChannelState> {
    channel
        .segments()
        .into_iter()
        .filter_map(|freq| states.iter().find(|s| s.freq_mhz == freq).copied())
        .collect()
}

/// A candidate overlapping the operating channel is only usable where
/// both sides are non-DFS.
fn overlap_priority(candidate: &[ChannelState], operating: &[ChannelState]) -> Priority {
    for a in candidate {
        for b in operating.iter().filter(|b| b.freq_mhz == a.freq_mhz) {
            if a.dfs_state != DfsState::NonDfs || b.dfs_state != DfsState::NonDfs {
                return Priority::Unusable;
            }
        }
    }
    Priority::NonDfs
}

fn rank(entry: &mut SieveEntry, segments: &[ChannelState], operating: &Channel) {
    let mut priority = entry.priority.unwrap_or(Priority::NonDfs);
    for seg in segments {
        if priority == Priority::Unusable {
            break;
        }
        match seg.dfs_state {
            DfsState::NonDfs if priority == Priority::NonDfs => {
                if operating.control_freq_mhz == seg.freq_mhz {
                    priority = Priority::NonDfsAndOperating;
                    entry.channel.control_freq_mhz = operating.control_freq_mhz;
                    break;
                }
            }
            DfsState::NonDfs | DfsState::CacCompleted => {
                priority = Priority::NonDfsOrCacCompleted;
            }
            DfsState::CacPossible | DfsState::CacInProgress | DfsState::Nol => {
                priority = Priority::Unusable;
            }
        }
    }
    entry.priority = Some(priority);
}

/// Same-width candidates from the group holding the lowest reported
/// channel up to the last group fully inside the reported range.
fn candidates(width: ChannelWidth, first: u32, last: u32) -> Vec<Channel> {
    let groups = unii_5g_groups(width);
    let Some(start) = groups.iter().position(|g| g.contains(&first)) else {
        return Vec::new();
    };
    groups
        .iter()
        .skip(start)
        .take_while(|g| g.iter().all(|&chan| chan <= last))
        .filter_map(|g| channel_from_group(g, width))
        .collect()
}

/// Best escape channel for `operating` given the radio's channel
/// states, trying `max_width` first and narrowing from there.
pub fn next_channel(
    operating: &Channel,
    states: &[ChannelState],
    max_width: ChannelWidth,
) -> Option<Channel> {
    if states.is_empty() || !operating.overlaps_dfs() {
        return None;
    }
    let chans: Vec<u32> = states
        .iter()
        .filter_map(|s| match Band::from_freq(s.freq_mhz) {
            Some((Band::FiveGhz, chan)) => Some(chan),
            _ => None,
        })
        .collect();
    if chans.len() != states.len() {
        return None;
    }
    let (first, last) = (*chans.iter().min()?, *chans.iter().max()?);
    let operating_segments = segment_states(states, operating);

    let mut width = Some(max_width);
    while let Some(w) = width {
        let mut sieve: Vec<SieveEntry> = candidates(w, first, last)
            .into_iter()
            .map(|channel| SieveEntry {
                channel,
                priority: None,
            })
            .collect();
        for entry in &mut sieve {
            let segments = segment_states(states, &entry.channel);
            if segments.is_empty() {
                continue;
            }
            entry.priority = Some(overlap_priority(&segments, &operating_segments));
            rank(entry, &segments, operating);
            trace!(channel = %entry.channel, priority = ?entry.priority, "sieve");
        }
        for wanted in [
            Priority::NonDfsAndOperating,
            Priority::NonDfs,
            Priority::NonDfsOrCacCompleted,
        ] {
            if let Some(hit) = sieve.iter().find(|e| e.priority == Some(wanted)) {
                return Some(hit.channel);
            }
        }
        width = w.narrower();
    }
    None
}

/// Configured width, else operating width, 80+80 counted as 20.
fn max_width(configured: Option<Channel>, operating: &Channel) -> ChannelWidth {
    match configured.map_or(operating.width, |c| c.width) {
        ChannelWidth::Mhz80P80 => ChannelWidth::Mhz20,
        w => w,
    }
}

/// Selection for one live radio, `None` when the module cannot help.
pub fn select(radio: &LiveRadio, configured: Option<Channel>) -> Option<Channel> {
    if !radio.radar.enabled {
        return None;
    }
    let operating = radio.channel?;
    let mut bands = radio
        .channel_states
        .iter()
        .filter_map(|s| Band::from_freq(s.freq_mhz).map(|(band, _)| band));
    let band = bands.next()?;
    if bands.any(|b| b != band) {
        warn!(radio = %radio.name, "channel states span several bands, not supported");
        return None;
    }
    if band != Band::FiveGhz {
        return None;
    }
    next_channel(
        &operating,
        &radio.channel_states,
        max_width(configured, &operating),
    )
}

/// Channel overrides only make sense per radio here.
pub(crate) fn check_interface_channel(intent: &IntentStore, iface: &str) {
    if intent.interface(iface).is_some_and(|i| i.channel.is_some()) {
        warn!(
            interface = iface,
            "radar next channel doesn't support per-interface channels, only per radio"
        );
    }
}

/// TAIL mutator storing the pick on every radio.
pub struct RadarNextChannel;

impl Mutator for RadarNextChannel {
    fn name(&self) -> &str {
        "radar_next_channel"
    }

    fn mutate(&self, view: &EngineView<'_>, tree: &mut ConfigTree) {
        for radio in tree.radios.values_mut() {
            let configured = view.intent.radio(&radio.name).and_then(|r| r.channel);
            radio.radar_next_channel = view
                .live
                .radio(&radio.name)
                .and_then(|live| select(live, configured));
        }
    }
}
