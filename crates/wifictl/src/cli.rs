//! Clap derive structures for the `wifictl` CLI.
//!
//! Only depends on clap and clap_complete so `build.rs` can include it
//! for man page generation.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// wifictl -- offline driver for the Wi-Fi reconciliation engine
#[derive(Debug, Parser)]
#[command(
    name = "wifictl",
    version,
    about = "Reconcile Wi-Fi intent against live radio state",
    long_about = "Runs the Wi-Fi controller reconciliation engine over an intent document\n\
        and a live-state snapshot, with a loopback driver that applies every\n\
        computed configuration verbatim and an in-memory control database.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, env = "WIFICTL_CONFIG_FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "WIFICTL_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty tables (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the engine until it settles and print the result
    #[command(alias = "rec")]
    Reconcile(ReconcileArgs),

    /// Pick the DFS escape channel for one radio
    #[command(alias = "nc")]
    NextChannel(NextChannelArgs),

    /// Inspect settings
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Reconcile ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// Intent document (JSON or YAML)
    #[arg(long, short = 'i')]
    pub intent: PathBuf,

    /// Live-state snapshot (JSON or YAML)
    #[arg(long, short = 's')]
    pub state: PathBuf,

    /// Live events replayed after the first driver round trip
    #[arg(long, short = 'e')]
    pub events: Option<PathBuf>,

    /// Start a push-button WPS job on this interface (repeatable)
    #[arg(long = "wps-pbc", value_name = "IFACE")]
    pub wps_pbc: Vec<String>,

    /// Upper bound on engine turns before giving up
    #[arg(long, default_value = "1000")]
    pub max_turns: u32,
}

// ── Next channel ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NextChannelArgs {
    /// Live-state snapshot (JSON or YAML)
    #[arg(long, short = 's')]
    pub state: PathBuf,

    /// Radio name
    #[arg(long, short = 'r')]
    pub radio: String,

    /// Widest acceptable width (20mhz, 40mhz, 80mhz, 160mhz, 320mhz)
    #[arg(long, short = 'w')]
    pub width: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective settings as TOML
    Show,

    /// Print the default settings file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
