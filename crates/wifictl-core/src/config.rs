// ── Runtime engine configuration ──
//
// Tuning knobs and feature flags for one `Engine`. Built by the
// config crate (or tests) and handed in; core never reads files or
// the environment. Feature flags are consulted once, when the engine
// attaches its policy modules.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Retry interval of a pending sync entity.
pub const DEFAULT_SYNC_RETRY: Duration = Duration::from_millis(500);
/// Horizon after which a pending sync entity is forced through.
pub const DEFAULT_SYNC_DEADLINE: Duration = Duration::from_secs(5);
/// Push-button provisioning window.
pub const DEFAULT_WPS_PBC_TIMEOUT: Duration = Duration::from_secs(120);
/// How long a kicked station may linger before a warning is logged.
pub const DEFAULT_DEAUTH_EXPIRY: Duration = Duration::from_secs(3);
/// 802.11 reason code "unspecified".
pub const DEFAULT_DEAUTH_REASON: u16 = 1;

/// What deleting an interface's configuration row means.
///
/// The legacy behaviour keeps the interface around but disabled and
/// hides its state row. The decoupled behaviour forgets the intent
/// entirely and lets the state row follow live existence alone.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeletedRowMode {
    #[default]
    Disable,
    Decouple,
}

/// Sync scheduler timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTiming {
    pub retry_interval: Duration,
    pub deadline: Duration,
}

impl Default for SyncTiming {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_SYNC_RETRY,
            deadline: DEFAULT_SYNC_DEADLINE,
        }
    }
}

/// ACL enforcement tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AclKickConfig {
    pub deauth_expiry: Duration,
    pub reason_code: u16,
}

impl Default for AclKickConfig {
    fn default() -> Self {
        Self {
            deauth_expiry: DEFAULT_DEAUTH_EXPIRY,
            reason_code: DEFAULT_DEAUTH_REASON,
        }
    }
}

/// Static switches for optional modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct FeatureFlags {
    /// Publish live state to the control database.
    pub sync_enabled: bool,
    pub radar_next_channel: bool,
    pub acl_kick: bool,
    /// Log ACL kicks instead of asking the driver to deauthenticate.
    pub acl_kick_dry_run: bool,
    pub mbss_hidden_preference: bool,
    pub local_neighbors: bool,
    pub wps: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            sync_enabled: true,
            radar_next_channel: true,
            acl_kick: true,
            acl_kick_dry_run: false,
            mbss_hidden_preference: true,
            local_neighbors: true,
            wps: true,
        }
    }
}

/// Everything an `Engine` needs to know at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub sync: SyncTiming,
    pub wps_pbc_timeout: Duration,
    pub acl_kick: AclKickConfig,
    pub features: FeatureFlags,
    pub deleted_row_mode: DeletedRowMode,
    /// Mutator names that run first within their position, in this order.
    pub mutator_order: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sync: SyncTiming::default(),
            wps_pbc_timeout: DEFAULT_WPS_PBC_TIMEOUT,
            acl_kick: AclKickConfig::default(),
            features: FeatureFlags::default(),
            deleted_row_mode: DeletedRowMode::default(),
            mutator_order: Vec::new(),
        }
    }
}
