//! Output formatting: human text, JSON, YAML.
//!
//! `table` renders a detail view (key/value lines plus `tabled` tables);
//! the structured formats serialize the raw API value untouched.

use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::Value;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::OutputFormat;
use crate::error::CliError;

// ── Color ────────────────────────────────────────────────────────────

/// Color only when stdout is a terminal and `NO_COLOR` is unset.
fn should_color() -> bool {
    io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render one item in the chosen format. `detail_fn` produces the
/// human-readable view used for `table`.
pub fn render_single<T: Serialize + ?Sized>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl FnOnce(&T) -> String,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => serde_json::to_string_pretty(data).map_err(serialize_err),
        OutputFormat::JsonCompact => serde_json::to_string(data).map_err(serialize_err),
        OutputFormat::Yaml => serde_yaml::to_string(data)
            .map(|s| s.trim_end().to_owned())
            .map_err(serialize_err),
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

fn serialize_err(e: impl std::error::Error + Send + Sync + 'static) -> CliError {
    CliError::Io(io::Error::other(e))
}

// ── Detail view building blocks ──────────────────────────────────────

/// Aligned `Label:  value` lines.
#[derive(Debug, Default)]
pub struct Detail {
    rows: Vec<(&'static str, String)>,
    sections: Vec<String>,
}

impl Detail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, label: &'static str, value: impl Into<String>) -> Self {
        self.rows.push((label, value.into()));
        self
    }

    /// Append a titled table after the key/value block. Empty tables are
    /// skipped.
    pub fn table<R: Tabled>(mut self, title: &str, rows: &[R]) -> Self {
        if !rows.is_empty() {
            let table = Table::new(rows).with(Style::rounded()).to_string();
            self.sections.push(format!("{}\n{table}", paint_label(title)));
        }
        self
    }

    pub fn render(&self) -> String {
        let width = self.rows.iter().map(|(l, _)| l.len()).max().unwrap_or(0) + 1;
        let mut out = String::new();
        for (label, value) in &self.rows {
            let key = format!("{label}:");
            let padded = format!("{key:<width$}");
            let _ = writeln!(out, "{} {value}", paint_label(&padded));
        }
        for section in &self.sections {
            let _ = writeln!(out, "\n{section}");
        }
        out.trim_end().to_owned()
    }
}

fn paint_label(label: &str) -> String {
    if should_color() {
        label.bold().to_string()
    } else {
        label.to_owned()
    }
}

const CELL_WIDTH: usize = 40;

/// One-line summary of an API object for a table cell: `key=value` for
/// each scalar member, long strings (PEM blobs) elided.
pub fn summarize(value: &Value) -> String {
    let Value::Object(map) = value else {
        return scalar(value);
    };
    map.iter()
        .filter(|(_, v)| !v.is_object() && !v.is_array())
        .map(|(k, v)| format!("{k}={}", scalar(v)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn scalar(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() > CELL_WIDTH {
        let head: String = text.chars().take(CELL_WIDTH - 1).collect();
        format!("{head}…")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use super::*;

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Name")]
        name: &'static str,
    }

    #[test]
    fn detail_aligns_labels() {
        let text = Detail::new().row("ID", "srv_1").row("Name", "gw").render();
        assert_eq!(text, "ID:   srv_1\nName: gw");
    }

    #[test]
    fn detail_skips_empty_tables() {
        let text = Detail::new().row("ID", "x").table::<Row>("Empty", &[]).render();
        assert!(!text.contains("Empty"));

        let text = Detail::new().table("Rows", &[Row { name: "one" }]).render();
        assert!(text.contains("Rows"));
        assert!(text.contains("one"));
    }

    #[test]
    fn structured_formats_serialize_the_value() {
        let value = json!({"a": 1});
        let compact = render_single(OutputFormat::JsonCompact, &value, |_| String::new()).unwrap();
        assert_eq!(compact, r#"{"a":1}"#);

        let yaml = render_single(OutputFormat::Yaml, &value, |_| String::new()).unwrap();
        assert_eq!(yaml, "a: 1");

        let table = render_single(OutputFormat::Table, &value, |_| "view".into()).unwrap();
        assert_eq!(table, "view");
    }

    #[test]
    fn summary_lists_scalar_members() {
        let entry = json!({"proto": "udp", "port": 1194, "routes": ["10.0.0.0/8"]});
        let text = summarize(&entry);
        assert!(text.contains("proto=udp"));
        assert!(text.contains("port=1194"));
        assert!(!text.contains("routes"));
        assert_eq!(summarize(&json!(7)), "7");
    }

    #[test]
    fn summary_elides_long_strings() {
        let pem = "-".repeat(100);
        let text = summarize(&json!({ "pem": pem }));
        assert_eq!(text.chars().count(), "pem=".len() + CELL_WIDTH);
        assert!(text.ends_with('…'));
    }
}
