//! Run driver: builds the plan, owns the locator for the duration of the
//! walk and hands events to a reporter.

use std::io::Write;

use tracing::{debug, info};

use crate::action::{ActionKind, Descriptor};
use crate::builder::{Builder, Plan};
use crate::config::RunnerConfig;
use crate::error::{Failure, TapError, TapResult};
use crate::frame::{Bindings, Frame, ARGV_KEY};
use crate::locator::Locator;
use crate::reporter::{Reporter, Summary, TapReporter};
use crate::walker::Walker;

/// Main test runner
pub struct TestRunner {
    config: RunnerConfig,
    context: Bindings,
}

impl TestRunner {
    /// Create a runner with default configuration
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            config,
            context: Bindings::new(),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Values placed in the root frame before building
    pub fn context(mut self, bindings: Bindings) -> Self {
        self.context.extend(bindings);
        self
    }

    /// Free-form arguments exposed to suites under [`ARGV_KEY`]
    pub fn argv(mut self, argv: Vec<String>) -> Self {
        self.context.insert(ARGV_KEY, argv);
        self
    }

    /// Run with a TAP reporter on stdout
    pub async fn run<F>(&self, register: F) -> TapResult<Summary>
    where
        F: FnOnce(&mut Builder<'_>) -> Result<(), Failure>,
    {
        let mut reporter = TapReporter::stdout(&self.config);
        self.run_with(&mut reporter, register).await
    }

    /// Run with a TAP reporter writing to `out`
    pub async fn run_to<W, F>(&self, out: W, register: F) -> TapResult<(Summary, W)>
    where
        W: Write,
        F: FnOnce(&mut Builder<'_>) -> Result<(), Failure>,
    {
        let mut reporter = TapReporter::new(out, self.config.resolved_width())
            .with_color(self.config.color.enabled())
            .with_project_dir(&self.config.project_dir);
        let summary = self.run_with(&mut reporter, register).await?;
        Ok((summary, reporter.into_inner()))
    }

    /// Build and walk, sending events to `reporter`.
    ///
    /// A build failure is reported as a bail-out and yields a halted, empty
    /// summary. Only runner-level problems (a busy locator) come back as
    /// errors.
    pub async fn run_with<R, F>(&self, reporter: &mut R, register: F) -> TapResult<Summary>
    where
        R: Reporter,
        F: FnOnce(&mut Builder<'_>) -> Result<(), Failure>,
    {
        let locator = Locator::install(self.config.base_dir.clone())?;
        let root = Frame::root_with(self.context.clone());

        let plan = match Plan::build(root, register) {
            Ok(plan) => plan,
            Err(TapError::Build { path, mut failure }) => {
                locator.annotate(&mut failure);
                let section = Descriptor {
                    kind: ActionKind::Section,
                    title: path.last().cloned(),
                    number: None,
                    path,
                };
                reporter.bail_out(&section, &failure);
                return Ok(Summary {
                    total: 0,
                    pass: 0,
                    halted: true,
                });
            }
            Err(e) => return Err(e),
        };

        info!(total = plan.total(), "Starting run");
        let summary = Walker::new(&locator, reporter).run(&plan).await;
        drop(locator);

        debug!(pass = summary.pass, total = summary.total, halted = summary.halted, "Run finished");
        Ok(summary)
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}
