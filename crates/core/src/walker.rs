//! Sequential executor of a section tree
//!
//! The walker visits a section's direct actions in scheduling order
//! (define/before, nested sections, cases, after) and awaits each one before
//! starting the next. Case failures are recorded and the walk continues.
//! Hook failures are fatal: they are reported as a bail-out and a [`Halt`]
//! travels back up through every enclosing section to [`Walker::run`].
//! The walker never exits the process; the caller decides what a halted
//! summary means.

use std::panic::{self, AssertUnwindSafe};

use futures::future::{BoxFuture, LocalBoxFuture};
use futures::FutureExt;
use tracing::{debug, warn};

use crate::action::{Action, Case, Descriptor, Hook, Section};
use crate::builder::Plan;
use crate::error::Failure;
use crate::frame::Frame;
use crate::locator::Locator;
use crate::reporter::{Reporter, Summary};

/// A fatal hook failure, already reported
#[derive(Debug, Clone)]
pub struct Halt {
    pub action: Descriptor,
}

/// Drives one run of a plan
pub struct Walker<'a, R: Reporter> {
    locator: &'a Locator,
    reporter: &'a mut R,
    pass: usize,
}

impl<'a, R: Reporter> Walker<'a, R> {
    pub fn new(locator: &'a Locator, reporter: &'a mut R) -> Self {
        Self {
            locator,
            reporter,
            pass: 0,
        }
    }

    /// Emit the plan, walk the tree, emit the summary
    pub async fn run(mut self, plan: &Plan) -> Summary {
        self.reporter.plan(plan.total());

        let halted = match self.walk(plan.root()).await {
            Ok(()) => false,
            Err(halt) => {
                warn!(kind = %halt.action.kind, path = ?halt.action.path, "Run halted");
                true
            }
        };

        let summary = Summary {
            total: plan.total(),
            pass: self.pass,
            halted,
        };
        self.reporter.summary(&summary);
        summary
    }

    fn walk<'s>(&'s mut self, section: &'s Section) -> LocalBoxFuture<'s, Result<(), Halt>> {
        async move {
            debug!(path = ?section.path, "Entering section");
            for action in section.scheduled() {
                match action {
                    Action::Hook(hook) => self.run_hook(hook, &section.frame).await?,
                    Action::Section(nested) => self.walk(nested).await?,
                    Action::Case(case) => self.run_case(case, &section.frame).await,
                }
            }
            Ok(())
        }
        .boxed_local()
    }

    async fn run_hook(&mut self, hook: &Hook, frame: &Frame) -> Result<(), Halt> {
        debug!(kind = %hook.kind, path = ?hook.path, "Running hook");

        let outcome = self.invoke(|| (hook.handler)(frame.clone())).await;
        match outcome {
            Ok(bindings) => {
                if hook.kind.merges_result() {
                    frame.merge_own(bindings);
                }
                Ok(())
            }
            Err(mut failure) => {
                failure.push_site(hook.site.clone());
                self.locator.annotate(&mut failure);

                let action = Descriptor::from(hook);
                self.reporter.bail_out(&action, &failure);
                Err(Halt { action })
            }
        }
    }

    async fn run_case(&mut self, case: &Case, frame: &Frame) {
        debug!(number = case.number, title = %case.title, "Running case");

        let mut outcome = Ok(());
        for handler in &case.handlers {
            outcome = self.invoke(|| handler(frame.clone())).await;
            if outcome.is_err() {
                break;
            }
        }

        let descriptor = Descriptor::from(case);
        match outcome {
            Ok(()) => {
                self.pass += 1;
                self.reporter.case(&descriptor, None);
            }
            Err(mut failure) => {
                failure.push_site(case.site.clone());
                self.locator.annotate(&mut failure);
                debug!(number = case.number, message = failure.message(), "Case failed");
                self.reporter.case(&descriptor, Some(&failure));
            }
        }
    }

    /// Call a handler and await it, turning panics from either step into failures
    async fn invoke<T, F>(&self, call: F) -> Result<T, Failure>
    where
        F: FnOnce() -> BoxFuture<'static, Result<T, Failure>>,
    {
        self.locator.take_panic();
        let _capture = self.locator.capturing();

        let outcome = match panic::catch_unwind(AssertUnwindSafe(call)) {
            Ok(future) => AssertUnwindSafe(future).catch_unwind().await,
            Err(payload) => Err(payload),
        };
        outcome.unwrap_or_else(|payload| Err(self.locator.failure_from_panic(payload)))
    }
}
