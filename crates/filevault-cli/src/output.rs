//! Terminal output for the subcommands
//!
//! Human mode prints marked status lines and aligned `label: value` blocks.
//! JSON mode prints one document per command on stdout and drops the lines
//! meant for a person; warnings and errors go to stderr as JSON objects.

use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

/// Writes command results in one [`OutputFormat`]
#[derive(Debug, Clone, Copy)]
pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        self.format.is_json()
    }

    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("\u{2713} {message}"),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"success": true, "message": message}))
            }
        }
    }

    pub fn error(&self, message: &str) {
        match self.format {
            OutputFormat::Human => eprintln!("\u{2717} Error: {message}"),
            OutputFormat::Json => {
                eprintln!("{}", serde_json::json!({"success": false, "error": message}))
            }
        }
    }

    pub fn warn(&self, message: &str) {
        match self.format {
            OutputFormat::Human => eprintln!("\u{26a0} Warning: {message}"),
            OutputFormat::Json => {
                eprintln!("{}", serde_json::json!({"level": "warning", "message": message}))
            }
        }
    }

    /// An indented detail line, human mode only
    pub fn line(&self, message: &str) {
        if !self.is_json() {
            println!("  {message}");
        }
    }

    /// A block of `label: value` lines with the values lined up
    pub fn fields(&self, rows: &[(&str, String)]) {
        if !self.is_json() {
            for row in align_fields(rows) {
                println!("  {row}");
            }
        }
    }

    /// The command's JSON document, JSON mode only
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        if self.is_json() {
            let rendered =
                serde_json::to_string_pretty(value).context("Failed to serialize output")?;
            println!("{rendered}");
        }
        Ok(())
    }
}

pub fn align_fields(rows: &[(&str, String)]) -> Vec<String> {
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0) + 1;
    rows.iter()
        .map(|(label, value)| format!("{:<width$} {}", format!("{label}:"), value))
        .collect()
}

/// `"1 file"`, `"3 files"`
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}
