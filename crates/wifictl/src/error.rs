//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use wifictl_config::ConfigError;
use wifictl_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const UNSETTLED: i32 = 8;
    pub const CONFIG: i32 = 78;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Input ────────────────────────────────────────────────────────

    #[error("Could not read {path}")]
    #[diagnostic(code(wifictl::read_failed))]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse {path}: {message}")]
    #[diagnostic(
        code(wifictl::parse_failed),
        help("Input files are JSON when named *.json and YAML otherwise.")
    )]
    Parse { path: String, message: String },

    #[error("Invalid intent document: {message}")]
    #[diagnostic(code(wifictl::document))]
    Document { message: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(wifictl::not_found),
        help("Check the names used in the live-state snapshot.")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    #[error("{message}")]
    #[diagnostic(code(wifictl::conflict))]
    Conflict { message: String },

    #[error("'{feature}' is disabled in the settings")]
    #[diagnostic(
        code(wifictl::feature_disabled),
        help("Enable it under [features] or with WIFICTL_FEATURES__{env}=true")
    )]
    FeatureDisabled { feature: String, env: String },

    // ── Engine ───────────────────────────────────────────────────────

    #[error("Engine did not settle within {turns} turns")]
    #[diagnostic(
        code(wifictl::unsettled),
        help("Raise --max-turns, or run with -vv to see which entities keep changing.")
    )]
    Unsettled { turns: u32 },

    #[error("{message}")]
    #[diagnostic(code(wifictl::engine))]
    Engine { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(wifictl::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration file not found")]
    #[diagnostic(
        code(wifictl::no_config),
        help("Expected at: {path}\nRun `wifictl config path` to see the default location.")
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(wifictl::config))]
    Config(Box<figment::Error>),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render output: {0}")]
    #[diagnostic(code(wifictl::render))]
    Render(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Unsettled { .. } => exit_code::UNSETTLED,
            Self::Validation { .. }
            | Self::Parse { .. }
            | Self::Document { .. }
            | Self::FeatureDisabled { .. } => exit_code::USAGE,
            Self::NoConfig { .. } | Self::Config(_) => exit_code::CONFIG,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::RadioNotFound { name } => CliError::NotFound {
                resource_type: "radio".into(),
                identifier: name,
            },

            CoreError::InterfaceNotFound { name } => CliError::NotFound {
                resource_type: "interface".into(),
                identifier: name,
            },

            CoreError::JobNotFound { id } => CliError::NotFound {
                resource_type: "WPS job".into(),
                identifier: id.to_string(),
            },

            err @ (CoreError::InvalidJobState { .. } | CoreError::RadioMismatch { .. }) => {
                CliError::Conflict {
                    message: err.to_string(),
                }
            }

            CoreError::FeatureDisabled { feature } => CliError::FeatureDisabled {
                env: feature.to_uppercase(),
                feature: feature.into(),
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Document { message } => CliError::Document { message },

            err @ (CoreError::Database(_) | CoreError::EngineStopped) => CliError::Engine {
                message: err.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Figment(err) => CliError::Config(err),
            ConfigError::Io(err) => CliError::Io(err),
            ConfigError::Serialization(err) => CliError::Render(err.to_string()),
        }
    }
}
