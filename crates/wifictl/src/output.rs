//! Output formatting: table, JSON, YAML.
//!
//! Tables are built with `tabled` from per-command row types; the
//! structured formats serialize the underlying value with serde.

use std::io::{self, Write};

use tabled::{Table, Tabled, settings::Style};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Render a value in the chosen format. `table_fn` builds the table
/// view, which may combine several tables.
pub fn render<T>(
    format: OutputFormat,
    data: &T,
    table_fn: impl FnOnce(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => Ok(table_fn(data)),
        OutputFormat::Json => serde_json::to_string_pretty(data).map_err(render_err),
        OutputFormat::JsonCompact => serde_json::to_string(data).map_err(render_err),
        OutputFormat::Yaml => serde_yaml::to_string(data).map_err(render_err),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// A titled table, or a single line when there are no rows.
pub fn section<R: Tabled>(title: &str, rows: &[R]) -> String {
    if rows.is_empty() {
        return format!("{title}: none");
    }
    format!("{title}:\n{}", Table::new(rows).with(Style::rounded()))
}

fn render_err(e: impl std::fmt::Display) -> CliError {
    CliError::Render(e.to_string())
}
