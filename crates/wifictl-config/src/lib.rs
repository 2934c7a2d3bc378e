//! Settings for the wifictl engine.
//!
//! TOML file plus `WIFICTL_*` environment overrides, layered with
//! figment over built-in defaults, and translated into
//! `wifictl_core::EngineConfig`. Feature flags are read here once and
//! never consulted again by the running engine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wifictl_core::config::{
    DEFAULT_DEAUTH_EXPIRY, DEFAULT_DEAUTH_REASON, DEFAULT_SYNC_DEADLINE, DEFAULT_SYNC_RETRY,
    DEFAULT_WPS_PBC_TIMEOUT,
};
use wifictl_core::{AclKickConfig, DeletedRowMode, EngineConfig, FeatureFlags, SyncTiming};

/// Prefix of environment overrides. Nested keys use a double
/// underscore: `WIFICTL_SYNC__RETRY_INTERVAL=1s`.
pub const ENV_PREFIX: &str = "WIFICTL_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize settings: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Duration strings ────────────────────────────────────────────────

/// `Duration` as a humantime string ("500ms", "2m 30s").
mod human_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(de::Error::custom)
    }
}

/// Mutator names as a list or a comma separated string.
mod name_list {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Spec {
        List(Vec<String>),
        Csv(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let names = match Spec::deserialize(deserializer)? {
            Spec::List(names) => names,
            Spec::Csv(raw) => raw.split(',').map(str::to_owned).collect(),
        };
        Ok(names
            .into_iter()
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty())
            .collect())
    }
}

// ── Settings sections ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Retry interval of a pending entity.
    #[serde(with = "human_duration")]
    pub retry_interval: Duration,
    /// Horizon after which a pending entity is written even while the
    /// drivers are busy.
    #[serde(with = "human_duration")]
    pub deadline: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_SYNC_RETRY,
            deadline: DEFAULT_SYNC_DEADLINE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WpsSettings {
    #[serde(with = "human_duration")]
    pub pbc_timeout: Duration,
}

impl Default for WpsSettings {
    fn default() -> Self {
        Self {
            pbc_timeout: DEFAULT_WPS_PBC_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AclKickSettings {
    #[serde(with = "human_duration")]
    pub deauth_expiry: Duration,
    pub reason_code: u16,
}

impl Default for AclKickSettings {
    fn default() -> Self {
        Self {
            deauth_expiry: DEFAULT_DEAUTH_EXPIRY,
            reason_code: DEFAULT_DEAUTH_REASON,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct InterfaceSettings {
    pub deleted_row_mode: DeletedRowMode,
}

/// Top-level settings document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub sync: SyncSettings,
    pub wps: WpsSettings,
    pub acl_kick: AclKickSettings,
    pub features: FeatureFlags,
    pub interfaces: InterfaceSettings,
    /// Mutators that run first within their position, in this order.
    #[serde(deserialize_with = "name_list::deserialize")]
    pub mutator_order: Vec<String>,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.retry_interval.is_zero() {
            return Err(ConfigError::Validation {
                field: "sync.retry_interval".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.sync.deadline < self.sync.retry_interval {
            return Err(ConfigError::Validation {
                field: "sync.deadline".into(),
                reason: format!(
                    "{} is shorter than the retry interval {}",
                    humantime::format_duration(self.sync.deadline),
                    humantime::format_duration(self.sync.retry_interval),
                ),
            });
        }
        if self.wps.pbc_timeout.is_zero() {
            return Err(ConfigError::Validation {
                field: "wps.pbc_timeout".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if let Some(dup) = self
            .mutator_order
            .iter()
            .enumerate()
            .find_map(|(i, n)| self.mutator_order[..i].contains(n).then_some(n))
        {
            return Err(ConfigError::Validation {
                field: "mutator_order".into(),
                reason: format!("'{dup}' listed twice"),
            });
        }
        Ok(())
    }

    /// Validate and translate into the engine's runtime config.
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        self.validate()?;
        Ok(EngineConfig {
            sync: SyncTiming {
                retry_interval: self.sync.retry_interval,
                deadline: self.sync.deadline,
            },
            wps_pbc_timeout: self.wps.pbc_timeout,
            acl_kick: AclKickConfig {
                deauth_expiry: self.acl_kick.deauth_expiry,
                reason_code: self.acl_kick.reason_code,
            },
            features: self.features,
            deleted_row_mode: self.interfaces.deleted_row_mode,
            mutator_order: self.mutator_order.clone(),
        })
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "wifictl", "wifictl").map_or_else(
        || PathBuf::from("/etc/wifictl/config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Loading ─────────────────────────────────────────────────────────

/// Provider stack: defaults, then the TOML file, then the environment.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Settings::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load settings. An explicit `path` must exist; the default location
/// may be absent.
pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let path = match path {
        Some(p) if !p.exists() => {
            return Err(ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("config file {} not found", p.display()),
            )));
        }
        Some(p) => p.to_path_buf(),
        None => config_path(),
    };
    let settings: Settings = figment(&path).extract()?;
    settings.validate()?;
    Ok(settings)
}
