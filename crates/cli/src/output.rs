//! Non-TAP output of the harness: suite listings and error messages

use std::io::Write;

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// Output format of `--list`
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// One suite per line
    #[default]
    Plain,
    /// JSON array
    Json,
}

/// A registered suite and how many cases it declares
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SuiteEntry {
    pub path: String,
    /// `None` when the suite fails to build
    pub cases: Option<usize>,
}

/// Write a suite listing
pub fn write_suites<W: Write>(out: &mut W, entries: &[SuiteEntry], format: OutputFormat) -> std::io::Result<()> {
    match format {
        OutputFormat::Plain => {
            for entry in entries {
                match entry.cases {
                    Some(cases) => writeln!(out, "{}: {} cases", entry.path, cases)?,
                    None => writeln!(out, "{}: build failed", entry.path)?,
                }
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(entries).map_err(std::io::Error::other)?;
            writeln!(out, "{}", json)?;
        }
    }
    Ok(())
}

/// Print an error message to stderr
pub fn print_error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message);
}
