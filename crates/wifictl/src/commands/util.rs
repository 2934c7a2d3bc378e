//! Shared helpers for command handlers.

use std::path::Path;

use serde::de::DeserializeOwned;

use wifictl_config::{ConfigError, Settings};
use wifictl_core::Channel;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Read a JSON (`*.json`) or YAML document.
pub fn read_input<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let parsed = if is_json {
        serde_json::from_str(&raw).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&raw).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| CliError::Parse {
        path: path.display().to_string(),
        message,
    })
}

/// Settings from `--config` or the default location, plus environment.
pub fn load_settings(global: &GlobalOpts) -> Result<Settings, CliError> {
    match wifictl_config::load(global.config.as_deref()) {
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::NoConfig {
                path: global
                    .config
                    .as_deref()
                    .map_or_else(wifictl_config::config_path, Path::to_path_buf)
                    .display()
                    .to_string(),
            })
        }
        other => Ok(other?),
    }
}

/// `5260/40mhz` style, `-` when unset.
pub fn channel_label(channel: Option<&Channel>) -> String {
    channel.map_or_else(
        || "-".to_owned(),
        |c| format!("{}/{}", c.control_freq_mhz, c.width),
    )
}
