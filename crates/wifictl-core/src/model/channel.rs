// ── Channels, widths and DFS states ──
//
// Frequencies are carried in MHz everywhere. Channel numbers only
// appear when walking the 5 GHz UNII grouping tables.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ── Band ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    #[strum(serialize = "2.4ghz")]
    TwoGhz,
    #[strum(serialize = "5ghz")]
    FiveGhz,
    #[strum(serialize = "6ghz")]
    SixGhz,
}

impl Band {
    /// Band and channel number for a 20 MHz control frequency.
    pub fn from_freq(freq_mhz: u32) -> Option<(Self, u32)> {
        match freq_mhz {
            2484 => Some((Self::TwoGhz, 14)),
            2412..=2472 => Some((Self::TwoGhz, (freq_mhz - 2407) / 5)),
            5955..=7115 => Some((Self::SixGhz, (freq_mhz - 5950) / 5)),
            5150..=5895 => Some((Self::FiveGhz, (freq_mhz - 5000) / 5)),
            _ => None,
        }
    }

    pub fn chan_to_freq(self, chan: u32) -> u32 {
        match self {
            Self::TwoGhz if chan == 14 => 2484,
            Self::TwoGhz => 2407 + chan * 5,
            Self::FiveGhz => 5000 + chan * 5,
            Self::SixGhz => 5950 + chan * 5,
        }
    }
}

// ── ChannelWidth ────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum ChannelWidth {
    #[default]
    #[serde(rename = "20mhz")]
    #[strum(serialize = "20mhz")]
    Mhz20,
    #[serde(rename = "40mhz")]
    #[strum(serialize = "40mhz")]
    Mhz40,
    #[serde(rename = "80mhz")]
    #[strum(serialize = "80mhz")]
    Mhz80,
    #[serde(rename = "160mhz")]
    #[strum(serialize = "160mhz")]
    Mhz160,
    #[serde(rename = "80p80mhz")]
    #[strum(serialize = "80p80mhz")]
    Mhz80P80,
    #[serde(rename = "320mhz")]
    #[strum(serialize = "320mhz")]
    Mhz320,
}

impl ChannelWidth {
    pub fn mhz(self) -> u32 {
        match self {
            Self::Mhz20 => 20,
            Self::Mhz40 => 40,
            Self::Mhz80 => 80,
            Self::Mhz160 | Self::Mhz80P80 => 160,
            Self::Mhz320 => 320,
        }
    }

    /// Next narrower contiguous width, `None` below 20 MHz.
    pub fn narrower(self) -> Option<Self> {
        match self {
            Self::Mhz20 => None,
            Self::Mhz40 => Some(Self::Mhz20),
            Self::Mhz80 | Self::Mhz80P80 => Some(Self::Mhz40),
            Self::Mhz160 => Some(Self::Mhz80),
            Self::Mhz320 => Some(Self::Mhz160),
        }
    }

    /// Number of 20 MHz segments in one contiguous block of this width.
    fn segment_count(self) -> Option<usize> {
        match self {
            Self::Mhz20 => Some(1),
            Self::Mhz40 => Some(2),
            Self::Mhz80 => Some(4),
            Self::Mhz160 => Some(8),
            Self::Mhz320 => Some(16),
            Self::Mhz80P80 => None,
        }
    }
}

// ── Channel ─────────────────────────────────────────────────────────

/// An operating channel: control frequency, center of the first
/// segment and width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Channel {
    pub control_freq_mhz: u32,
    #[serde(default)]
    pub center_freq0_mhz: u32,
    #[serde(default)]
    pub width: ChannelWidth,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub puncture_bitmap: u16,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(v: &u16) -> bool {
    *v == 0
}

impl Channel {
    pub fn new(control_freq_mhz: u32, center_freq0_mhz: u32, width: ChannelWidth) -> Self {
        Self {
            control_freq_mhz,
            center_freq0_mhz,
            width,
            puncture_bitmap: 0,
        }
    }

    /// Build a channel from its control frequency alone, deriving the
    /// center from the 5 GHz grouping tables. Other bands only carry
    /// 20 MHz channels this way.
    pub fn from_control(control_freq_mhz: u32, width: ChannelWidth) -> Option<Self> {
        let (band, chan) = Band::from_freq(control_freq_mhz)?;
        if width == ChannelWidth::Mhz20 {
            return Some(Self::new(control_freq_mhz, control_freq_mhz, width));
        }
        if band != Band::FiveGhz {
            return None;
        }
        let group = unii_5g_groups(width).into_iter().find(|g| g.contains(&chan))?;
        Some(Self::new(control_freq_mhz, band.chan_to_freq(group_center(&group)), width))
    }

    /// Fill in a missing center frequency.
    pub fn with_center(self) -> Self {
        if self.center_freq0_mhz != 0 {
            return self;
        }
        Self::from_control(self.control_freq_mhz, self.width).unwrap_or(Self {
            center_freq0_mhz: self.control_freq_mhz,
            ..self
        })
    }

    pub fn band(&self) -> Option<Band> {
        Band::from_freq(self.control_freq_mhz).map(|(band, _)| band)
    }

    pub fn control_chan(&self) -> Option<u32> {
        Band::from_freq(self.control_freq_mhz).map(|(_, chan)| chan)
    }

    /// Control frequencies of every 20 MHz segment the channel spans.
    pub fn segments(&self) -> Vec<u32> {
        let width = match self.width {
            ChannelWidth::Mhz80P80 => ChannelWidth::Mhz80,
            w => w,
        };
        let Some(count) = width.segment_count() else {
            return Vec::new();
        };
        let center = if self.center_freq0_mhz == 0 {
            self.control_freq_mhz
        } else {
            self.center_freq0_mhz
        };
        let Some(first) = (center + 10).checked_sub(width.mhz() / 2) else {
            return Vec::new();
        };
        (0..count).map(|i| first + 20 * u32::try_from(i).unwrap_or(0)).collect()
    }

    /// Global operating class (IEEE 802.11 Annex E, table E-4).
    pub fn op_class(&self) -> Option<u8> {
        let (band, chan) = Band::from_freq(self.control_freq_mhz)?;
        let upper = self.center_freq0_mhz != 0 && self.control_freq_mhz > self.center_freq0_mhz;
        let class = match (band, self.width) {
            (Band::TwoGhz, ChannelWidth::Mhz20) if chan == 14 => 82,
            (Band::TwoGhz, ChannelWidth::Mhz20) => 81,
            (Band::TwoGhz, ChannelWidth::Mhz40) if upper => 84,
            (Band::TwoGhz, ChannelWidth::Mhz40) => 83,
            (Band::FiveGhz, ChannelWidth::Mhz20) => match chan {
                36..=48 => 115,
                52..=64 => 118,
                100..=144 => 121,
                _ => 125,
            },
            (Band::FiveGhz, ChannelWidth::Mhz40) => {
                let lower_class = match chan {
                    36..=48 => 116,
                    52..=64 => 119,
                    100..=144 => 122,
                    _ => 126,
                };
                if upper { lower_class + 1 } else { lower_class }
            }
            (Band::FiveGhz, ChannelWidth::Mhz80) => 128,
            (Band::FiveGhz, ChannelWidth::Mhz160) => 129,
            (Band::FiveGhz, ChannelWidth::Mhz80P80) => 130,
            (Band::SixGhz, ChannelWidth::Mhz20) => 131,
            (Band::SixGhz, ChannelWidth::Mhz40) => 132,
            (Band::SixGhz, ChannelWidth::Mhz80) => 133,
            (Band::SixGhz, ChannelWidth::Mhz160) => 134,
            (Band::SixGhz, ChannelWidth::Mhz80P80) => 135,
            (Band::SixGhz, ChannelWidth::Mhz320) => 137,
            _ => return None,
        };
        Some(class)
    }

    /// Whether any segment lands on a radar-protected 5 GHz channel.
    pub fn overlaps_dfs(&self) -> bool {
        self.segments().into_iter().any(|freq| {
            matches!(Band::from_freq(freq), Some((Band::FiveGhz, chan)) if (52..=144).contains(&chan))
        })
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}MHz/{} (center {}MHz)",
            self.control_freq_mhz, self.width, self.center_freq0_mhz
        )
    }
}

// ── 5 GHz grouping ──────────────────────────────────────────────────

const UNII_5G_BLOCKS: [&[u32]; 3] = [
    &[36, 40, 44, 48, 52, 56, 60, 64],
    &[100, 104, 108, 112, 116, 120, 124, 128, 132, 136, 140, 144],
    &[149, 153, 157, 161, 165, 169, 173, 177],
];

/// Channel-number groups forming every contiguous 5 GHz channel of
/// `width`, lowest first.
pub fn unii_5g_groups(width: ChannelWidth) -> Vec<Vec<u32>> {
    let Some(count) = width.segment_count() else {
        return Vec::new();
    };
    UNII_5G_BLOCKS
        .iter()
        .flat_map(|block| block.chunks_exact(count))
        .map(<[u32]>::to_vec)
        .collect()
}

fn group_center(group: &[u32]) -> u32 {
    let sum: u32 = group.iter().sum();
    let len = u32::try_from(group.len()).unwrap_or(1).max(1);
    sum / len
}

/// Channel built from a channel-number group.
pub(crate) fn channel_from_group(group: &[u32], width: ChannelWidth) -> Option<Channel> {
    let first = *group.first()?;
    let band = Band::FiveGhz;
    Some(Channel::new(
        band.chan_to_freq(first),
        band.chan_to_freq(group_center(group)),
        width,
    ))
}

// ── DFS ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DfsState {
    NonDfs,
    CacPossible,
    CacInProgress,
    CacCompleted,
    Nol,
}

/// Per-20 MHz channel availability as reported by the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelState {
    pub freq_mhz: u32,
    pub dfs_state: DfsState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nol_remaining_secs: Option<u32>,
}

impl ChannelState {
    pub fn new(freq_mhz: u32, dfs_state: DfsState) -> Self {
        Self {
            freq_mhz,
            dfs_state,
            nol_remaining_secs: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn freq_chan_conversions() {
        assert_eq!(Band::from_freq(2412), Some((Band::TwoGhz, 1)));
        assert_eq!(Band::from_freq(2484), Some((Band::TwoGhz, 14)));
        assert_eq!(Band::from_freq(5180), Some((Band::FiveGhz, 36)));
        assert_eq!(Band::from_freq(5955), Some((Band::SixGhz, 1)));
        assert_eq!(Band::FiveGhz.chan_to_freq(149), 5745);
    }

    #[test]
    fn groups_per_width() {
        assert_eq!(unii_5g_groups(ChannelWidth::Mhz20).len(), 28);
        assert_eq!(unii_5g_groups(ChannelWidth::Mhz40).len(), 14);
        assert_eq!(unii_5g_groups(ChannelWidth::Mhz80).len(), 7);
        assert_eq!(
            unii_5g_groups(ChannelWidth::Mhz160),
            vec![
                vec![36, 40, 44, 48, 52, 56, 60, 64],
                vec![100, 104, 108, 112, 116, 120, 124, 128],
                vec![149, 153, 157, 161, 165, 169, 173, 177],
            ]
        );
        assert!(unii_5g_groups(ChannelWidth::Mhz80P80).is_empty());
    }

    #[test]
    fn from_control_derives_center() {
        let c = Channel::from_control(5260, ChannelWidth::Mhz40).unwrap();
        assert_eq!(c.center_freq0_mhz, 5270);
        let c = Channel::from_control(5220, ChannelWidth::Mhz80).unwrap();
        assert_eq!(c.center_freq0_mhz, 5210);
        assert!(Channel::from_control(2437, ChannelWidth::Mhz40).is_none());
    }

    #[test]
    fn segments_span_width() {
        let c = Channel::new(5220, 5250, ChannelWidth::Mhz160);
        assert_eq!(
            c.segments(),
            vec![5180, 5200, 5220, 5240, 5260, 5280, 5300, 5320]
        );
        let c = Channel::new(5180, 5180, ChannelWidth::Mhz20);
        assert_eq!(c.segments(), vec![5180]);
    }

    #[test]
    fn dfs_overlap() {
        assert!(Channel::new(5260, 5270, ChannelWidth::Mhz40).overlaps_dfs());
        assert!(Channel::new(5180, 5250, ChannelWidth::Mhz160).overlaps_dfs());
        assert!(!Channel::new(5180, 5210, ChannelWidth::Mhz80).overlaps_dfs());
        assert!(!Channel::new(5745, 5775, ChannelWidth::Mhz80).overlaps_dfs());
    }

    #[test]
    fn operating_classes() {
        assert_eq!(Channel::new(2437, 2437, ChannelWidth::Mhz20).op_class(), Some(81));
        assert_eq!(Channel::new(5180, 5190, ChannelWidth::Mhz40).op_class(), Some(116));
        assert_eq!(Channel::new(5200, 5190, ChannelWidth::Mhz40).op_class(), Some(117));
        assert_eq!(Channel::new(5500, 5530, ChannelWidth::Mhz80).op_class(), Some(128));
        assert_eq!(Channel::new(5955, 5955, ChannelWidth::Mhz20).op_class(), Some(131));
        assert_eq!(Channel::new(2437, 2447, ChannelWidth::Mhz80).op_class(), None);
    }

    #[test]
    fn width_parses_from_str() {
        assert_eq!("80mhz".parse::<ChannelWidth>().unwrap(), ChannelWidth::Mhz80);
        assert_eq!(ChannelWidth::Mhz160.to_string(), "160mhz");
    }
}
