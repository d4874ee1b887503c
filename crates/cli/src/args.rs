//! Command-line arguments of a test binary

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use soltap_core::ColorMode;

use crate::output::OutputFormat;

/// Run registered test suites and report TAP on stdout
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct HarnessArgs {
    /// Suites to run, by registered path (all when omitted)
    pub suites: Vec<String>,

    /// Arguments exposed to suites as `argv`
    #[arg(last = true)]
    pub argv: Vec<String>,

    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Wrap width (defaults to the terminal width)
    #[arg(long, env = "SOLTAP_WIDTH")]
    pub width: Option<usize>,

    /// When to use colors
    #[arg(long, value_enum, env = "SOLTAP_COLOR")]
    pub color: Option<ColorChoice>,

    /// Directory failure locations are relative to
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Directory holding the suites
    #[arg(long)]
    pub project_dir: Option<PathBuf>,

    /// List registered suites instead of running them
    #[arg(long)]
    pub list: bool,

    /// Format of the suite listing
    #[arg(long, value_enum, default_value = "plain")]
    pub format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl From<ColorChoice> for ColorMode {
    fn from(choice: ColorChoice) -> Self {
        match choice {
            ColorChoice::Auto => ColorMode::Auto,
            ColorChoice::Always => ColorMode::Always,
            ColorChoice::Never => ColorMode::Never,
        }
    }
}
