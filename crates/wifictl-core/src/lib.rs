//! Reconciliation engine of a device-resident Wi-Fi controller.
//!
//! Three inputs meet here: the desired configuration written by an
//! operator, the live state reported by the radio drivers, and the
//! policy modules that adjust one from the other. Out come an effective
//! configuration tree for the drivers and state rows for an external
//! control database.
//!
//! - **[`IntentStore`]**: typed, optional per-attribute desired state
//!   for radios and interfaces, with keyed sub-collections (ACL, PSKs,
//!   neighbors, networks) and change observers.
//!
//! - **[`Pipeline`]**: rebuilds the [`ConfigTree`] from the live base by
//!   running registered [`Mutator`]s, HEAD before TAIL. Writes only bump
//!   an invalidation counter; reads recompute at most once per burst.
//!
//! - **[`SyncScheduler`]**: debounced publication of live state into a
//!   [`ControlDb`]. Each entity waits for the drivers to settle, but a
//!   deadline forces it through under continuous churn.
//!
//! - **[`WpsManager`]**: push-button provisioning jobs, at most one
//!   active per interface.
//!
//! - **[`policy`]**: DFS escape channel selection, ACL enforcement by
//!   deauthentication, multi-BSSID transmitter preference and local
//!   neighbor report synthesis.
//!
//! - **[`Engine`]** owns all of the above and is driven one turn at a
//!   time with an explicit clock; **[`EngineHandle`]** runs it on a tokio
//!   task behind an `mpsc` command channel and publishes each tree on a
//!   `watch` channel.

pub mod config;
pub mod engine;
pub mod error;
pub mod handle;
pub mod intent;
pub mod live;
pub mod model;
pub mod pipeline;
pub mod policy;
pub mod stream;
pub mod sync;
pub mod wps;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{AclKickConfig, DeletedRowMode, EngineConfig, FeatureFlags, SyncTiming};
pub use engine::Engine;
pub use error::CoreError;
pub use handle::EngineHandle;
pub use intent::{IntentDocument, IntentObserver, IntentStore};
pub use live::{LiveEvent, LiveSnapshot, LiveState, WpsEventKind};
pub use pipeline::{EngineView, Invalidator, Mutator, Pipeline, Position};
pub use stream::{ConfigStream, ConfigWatchStream};
pub use sync::{ControlDb, DbError, DbOp, MemoryDb, Row, SyncKey, SyncScheduler, SyncState, Table};
pub use wps::{JobId, JobState, WpsCallbacks, WpsJobEvent, WpsManager, WpsMethod, WpsResult, WpsRole};

pub use model::{
    AclPolicy, ApParams, Band, Channel, ChannelState, ChannelWidth, ConfigTree, DfsState,
    InterfaceConfig, InterfaceKind, LiveInterface, LiveRadio, LiveStation, MacAddress, RadioConfig,
};
