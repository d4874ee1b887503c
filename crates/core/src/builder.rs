//! Declarative construction of the section tree
//!
//! ```ignore
//! let plan = Plan::build(Frame::root(), |t| {
//!     t.define(|_| async { Ok(Bindings::new().with("supply", 10u64)) });
//!     t.describe("Token", |t| {
//!         t.it("has a supply", |frame| async move {
//!             let supply = frame.require::<u64>("supply")?;
//!             assert::equal(*supply, 10)
//!         });
//!         Ok(())
//!     })
//! })?;
//! ```
//!
//! Building is a single synchronous pass. Handlers are only stored; nothing
//! runs until the walker takes the plan. Case numbers are handed out here, in
//! call order, so the total is known before the first case executes.

use std::future::Future;

use tracing::debug;

use crate::action::{case_fn, hook_fn, Action, ActionKind, Case, CaseFn, CaseResult, Hook, HookResult, Section};
use crate::error::{Failure, TapError, TapResult};
use crate::frame::Frame;
use crate::locator::CallSite;

/// Signature of a suite registration function
pub type Suite = fn(&mut Builder<'_>) -> Result<(), Failure>;

/// State shared by every builder of one build pass
#[derive(Debug, Default)]
struct BuildState {
    total: usize,
    failed_at: Option<Vec<String>>,
}

/// Builder scoped to one section. Nested sections get their own builder for
/// the duration of the `describe` closure.
pub struct Builder<'a> {
    section: Section,
    state: &'a mut BuildState,
}

impl<'a> Builder<'a> {
    /// Declare a nested section and populate it with `build`.
    ///
    /// An error from `build` aborts the whole build. The section is still
    /// attached so the tree stays consistent, but the plan is discarded.
    #[track_caller]
    pub fn describe<F>(&mut self, title: &str, build: F) -> Result<(), Failure>
    where
        F: FnOnce(&mut Builder<'_>) -> Result<(), Failure>,
    {
        let site = CallSite::caller();
        let mut nested = Builder {
            section: self.section.nested(title),
            state: &mut *self.state,
        };
        let result = build(&mut nested);
        let section = nested.section;

        if result.is_err() && self.state.failed_at.is_none() {
            self.state.failed_at = Some(section.path.clone());
        }
        self.section.actions.push(Action::Section(section));

        result.map_err(|mut failure| {
            failure.push_site(site);
            failure
        })
    }

    /// Register a hook whose returned bindings are merged into this section's frame
    #[track_caller]
    pub fn define<F, Fut>(&mut self, handler: F)
    where
        F: Fn(Frame) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        self.push_hook(ActionKind::Define, hook_fn(handler), CallSite::caller());
    }

    /// Register a hook run for its side effects; returned bindings are discarded
    #[track_caller]
    pub fn before<F, Fut>(&mut self, handler: F)
    where
        F: Fn(Frame) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        self.push_hook(ActionKind::Before, hook_fn(handler), CallSite::caller());
    }

    /// Register a hook run after this section's cases; returned bindings are merged
    #[track_caller]
    pub fn after<F, Fut>(&mut self, handler: F)
    where
        F: Fn(Frame) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        self.push_hook(ActionKind::After, hook_fn(handler), CallSite::caller());
    }

    /// Register a case with a single handler
    #[track_caller]
    pub fn it<F, Fut>(&mut self, title: &str, handler: F)
    where
        F: Fn(Frame) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CaseResult> + Send + 'static,
    {
        self.it_steps(title, vec![case_fn(handler)]);
    }

    /// Register a case whose handlers run one after another on the same frame
    #[track_caller]
    pub fn it_steps(&mut self, title: &str, handlers: Vec<CaseFn>) {
        self.state.total += 1;
        let number = self.state.total;
        debug!(number, title, "Registered case");

        self.section.actions.push(Action::Case(Case {
            title: title.to_string(),
            number,
            path: self.section.path.clone(),
            site: CallSite::caller(),
            handlers,
        }));
    }

    /// Frame of the section being built
    pub fn frame(&self) -> &Frame {
        &self.section.frame
    }

    pub fn path(&self) -> &[String] {
        &self.section.path
    }

    /// Cases registered so far across the whole build
    pub fn total(&self) -> usize {
        self.state.total
    }

    fn push_hook(&mut self, kind: ActionKind, handler: crate::action::HookFn, site: CallSite) {
        self.section.actions.push(Action::Hook(Hook {
            kind,
            path: self.section.path.clone(),
            site,
            handler,
        }));
    }
}

/// A fully elaborated section tree, ready to walk
pub struct Plan {
    root: Section,
    total: usize,
}

impl Plan {
    /// Run `register` against a root builder over `frame`
    pub fn build<F>(frame: Frame, register: F) -> TapResult<Self>
    where
        F: FnOnce(&mut Builder<'_>) -> Result<(), Failure>,
    {
        let mut state = BuildState::default();
        let mut builder = Builder {
            section: Section::root(frame),
            state: &mut state,
        };

        let result = register(&mut builder);
        let root = builder.section;

        match result {
            Ok(()) => {
                debug!(total = state.total, "Built plan");
                Ok(Self {
                    root,
                    total: state.total,
                })
            }
            Err(failure) => Err(TapError::Build {
                path: state.failed_at.unwrap_or_default(),
                failure,
            }),
        }
    }

    /// Build from several suites sharing one root and one numbering
    pub fn from_suites(frame: Frame, suites: &[Suite]) -> TapResult<Self> {
        Self::build(frame, |builder| {
            for suite in suites {
                suite(builder)?;
            }
            Ok(())
        })
    }

    pub fn root(&self) -> &Section {
        &self.root
    }

    /// Total number of registered cases
    pub fn total(&self) -> usize {
        self.total
    }
}
