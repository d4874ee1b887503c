//! Test binary entry point
//!
//! A test binary registers its suites by path and hands control to the
//! harness:
//!
//! ```ignore
//! fn main() -> ExitCode {
//!     Harness::new()
//!         .suite("tests/token.rs", token::suite)
//!         .suite("tests/sale.rs", sale::suite)
//!         .main()
//! }
//! ```

use std::io;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use soltap_core::{Bindings, ColorMode, Frame, Plan, RunnerConfig, Suite, Summary, TapError, TestRunner};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::args::HarnessArgs;
use crate::output::{self, SuiteEntry};

/// Exit status for usage and configuration errors
pub const USAGE_ERROR: u8 = 2;

/// Registry of suites plus the command-line driver
pub struct Harness {
    suites: Vec<(String, Suite)>,
    project_dir: PathBuf,
    context: Bindings,
}

impl Harness {
    /// Create an empty harness. The crate holding the calling file becomes
    /// the default project directory, so suites in `src/` and a driver in
    /// `tests/` share it.
    #[track_caller]
    pub fn new() -> Self {
        let project_dir = crate_dir(Path::new(Location::caller().file()));
        Self {
            suites: Vec::new(),
            project_dir,
            context: Bindings::new(),
        }
    }

    /// Register `suite` under `path`. Registering a path twice replaces the
    /// earlier suite in place.
    pub fn suite(mut self, path: impl Into<String>, suite: Suite) -> Self {
        let path = path.into();
        match self.suites.iter_mut().find(|(existing, _)| *existing == path) {
            Some(slot) => slot.1 = suite,
            None => self.suites.push((path, suite)),
        }
        self
    }

    /// Values every suite sees in the root frame
    pub fn context(mut self, bindings: Bindings) -> Self {
        self.context.extend(bindings);
        self
    }

    /// Registered suite paths in registration order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.suites.iter().map(|(path, _)| path.as_str())
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Parse the process arguments, run and map the outcome to an exit status
    pub fn main(self) -> ExitCode {
        let args = match HarnessArgs::try_parse() {
            Ok(args) => args,
            Err(e) => {
                let code = e.exit_code();
                let _ = e.print();
                return ExitCode::from(u8::try_from(code).unwrap_or(USAGE_ERROR));
            }
        };

        init_logging(args.verbose);

        match self.run(args) {
            Ok(Some(summary)) => ExitCode::from(summary.exit_code() as u8),
            Ok(None) => ExitCode::SUCCESS,
            Err(e) => {
                output::print_error(&format!("{:#}", e));
                ExitCode::from(USAGE_ERROR)
            }
        }
    }

    /// Run with already parsed arguments. Returns `None` for `--list`.
    pub fn run(&self, args: HarnessArgs) -> Result<Option<Summary>> {
        if args.list {
            let entries = self.entries();
            output::write_suites(&mut io::stdout().lock(), &entries, args.format)?;
            return Ok(None);
        }

        let config = self.config(&args)?;
        let suites = self.select(&args.suites)?;
        if config.color == ColorMode::Always {
            colored::control::set_override(true);
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start runtime")?;

        info!(suites = suites.len(), "Running suites");
        let runner = TestRunner::with_config(config)
            .context(self.context.clone())
            .argv(args.argv);
        let summary = runtime.block_on(runner.run(|t| {
            for (path, suite) in &suites {
                debug!(suite = *path, "Registering suite");
                suite(t)?;
            }
            Ok(())
        }))?;

        debug!(?summary, "Harness finished");
        Ok(Some(summary))
    }

    /// Effective configuration: harness defaults, then the file, then flags
    pub fn config(&self, args: &HarnessArgs) -> Result<RunnerConfig> {
        let defaults = RunnerConfig {
            project_dir: self.project_dir.clone(),
            ..RunnerConfig::default()
        };
        let mut config = match &args.config {
            Some(path) => defaults
                .load_over(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => defaults,
        };

        if let Some(width) = args.width {
            config.width = Some(width);
        }
        if let Some(color) = args.color {
            config.color = color.into();
        }
        if let Some(base_dir) = &args.base_dir {
            config.base_dir = base_dir.clone();
        }
        if let Some(project_dir) = &args.project_dir {
            config.project_dir = project_dir.clone();
        }
        Ok(config)
    }

    /// Suites named on the command line, in command-line order
    pub fn select(&self, names: &[String]) -> Result<Vec<(&str, Suite)>, TapError> {
        if names.is_empty() {
            return Ok(self.suites.iter().map(|(path, suite)| (path.as_str(), *suite)).collect());
        }

        names
            .iter()
            .map(|name| {
                let wanted = name.strip_prefix("./").unwrap_or(name);
                self.suites
                    .iter()
                    .find(|(path, _)| path == wanted)
                    .map(|(path, suite)| (path.as_str(), *suite))
                    .ok_or_else(|| TapError::UnknownSuite(name.clone()))
            })
            .collect()
    }

    /// Registered suites with their case counts
    pub fn entries(&self) -> Vec<SuiteEntry> {
        self.suites
            .iter()
            .map(|(path, suite)| SuiteEntry {
                path: path.clone(),
                cases: Plan::build(Frame::root_with(self.context.clone()), *suite).ok().map(|plan| plan.total()),
            })
            .collect()
    }
}

impl Default for Harness {
    #[track_caller]
    fn default() -> Self {
        Self::new()
    }
}

/// Source directories that sit directly under a crate root
const SOURCE_DIRS: [&str; 4] = ["src", "tests", "benches", "examples"];

/// Crate root of `file`, or its directory when there is nothing above the
/// source dir to name
fn crate_dir(file: &Path) -> PathBuf {
    let Some(dir) = file.parent() else {
        return PathBuf::from("tests");
    };
    match (dir.file_name().and_then(|name| name.to_str()), dir.parent()) {
        (Some(name), Some(root)) if SOURCE_DIRS.contains(&name) && !root.as_os_str().is_empty() => {
            root.to_path_buf()
        }
        _ => dir.to_path_buf(),
    }
}

/// Install the stderr subscriber; stdout carries only TAP
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}
