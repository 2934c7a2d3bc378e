// ── Domain model ──
//
// Plain data shared by every subsystem: addresses, channels, the
// driver-reported records and the configuration tree mutators edit.

pub mod channel;
pub mod live;
pub mod mac;
pub mod tree;

// ── Re-exports ──────────────────────────────────────────────────────

pub use channel::{Band, Channel, ChannelState, ChannelWidth, DfsState};
pub use live::{LiveInterface, LiveRadio, LiveStation, RadarInfo, StaLink};
pub use mac::MacAddress;
pub use tree::{
    AclPolicy, ApMode, ApParams, ConfigTree, InterfaceConfig, InterfaceKind, Neighbor, PmfMode,
    RadioConfig, Security, StaNetwork, StaParams, DEFAULT_BEACON_INTERVAL_TU,
};
