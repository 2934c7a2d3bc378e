// ── Policy modules ──
//
// Independent policies layered on the pipeline. Mutators here run at
// TAIL so they win over the intent overlay. ACL enforcement is not a
// mutator: it acts on the computed tree at the end of each turn.

pub mod acl_kick;
pub mod local_neighbors;
pub mod mbss;
pub mod radar_next_channel;

pub use acl_kick::{AclKick, KickRecord, RecordingKicker, StationKicker};
pub use local_neighbors::LocalNeighbors;
pub use mbss::MbssPreference;
pub use radar_next_channel::RadarNextChannel;
