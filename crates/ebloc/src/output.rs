//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one value per line.

use std::io::{self, IsTerminal, Write};

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Highlight a yes/no flag: green for `Da`, yellow otherwise.
pub fn paint_flag(value: &str, color: bool) -> String {
    if !color {
        return value.to_owned();
    }
    if value == "Da" {
        value.green().to_string()
    } else {
        value.yellow().to_string()
    }
}

/// Dim a placeholder value.
pub fn paint_unknown(value: &str, color: bool) -> String {
    if color && value == ebloc_core::UNKNOWN {
        value.dimmed().to_string()
    } else {
        value.to_owned()
    }
}

// ── Progress ─────────────────────────────────────────────────────────

/// Spinner on stderr while talking to the portal. Hidden when stderr is
/// not a terminal or output is quiet.
pub fn spinner(global: &GlobalOpts, message: &'static str) -> ProgressBar {
    if global.quiet || !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(std::time::Duration::from_millis(100));
    bar
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a custom `detail_fn` that returns a pre-formatted
/// string; plain uses `plain_fn`.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(plain_fn(data)),
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

// ── Format-specific renderers ────────────────────────────────────────

pub(crate) fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.map_err(|e| CliError::Render(e.to_string()))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Render(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(serde::Serialize)]
    struct Sample {
        name: &'static str,
        count: u32,
    }

    const SAMPLE: Sample = Sample {
        name: "flat",
        count: 2,
    };

    #[test]
    fn compact_json_is_single_line() {
        let out = render_single(&OutputFormat::JsonCompact, &SAMPLE, |_| String::new(), |_| {
            String::new()
        })
        .unwrap();
        assert_eq!(out, r#"{"name":"flat","count":2}"#);
    }

    #[test]
    fn yaml_lists_fields() {
        let out =
            render_single(&OutputFormat::Yaml, &SAMPLE, |_| String::new(), |_| String::new())
                .unwrap();
        assert!(out.contains("name: flat"));
        assert!(out.contains("count: 2"));
    }

    #[test]
    fn table_and_plain_use_callbacks() {
        let table = render_single(&OutputFormat::Table, &SAMPLE, |s| format!("T:{}", s.name), |_| {
            String::new()
        })
        .unwrap();
        assert_eq!(table, "T:flat");
        let plain = render_single(&OutputFormat::Plain, &SAMPLE, |_| String::new(), |s| {
            s.count.to_string()
        })
        .unwrap();
        assert_eq!(plain, "2");
    }

    #[test]
    fn colorless_paint_is_identity() {
        assert_eq!(paint_flag("Da", false), "Da");
        assert_eq!(paint_unknown(ebloc_core::UNKNOWN, false), ebloc_core::UNKNOWN);
    }
}
