//! Section tree types
//!
//! The builder produces a tree of [`Section`]s whose children are
//! [`Action`]s. Handlers are stored boxed and type-erased; they run only when
//! the walker reaches them.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::Failure;
use crate::frame::{Bindings, Frame};
use crate::locator::CallSite;

/// Outcome of a define, before or after hook
pub type HookResult = Result<Bindings, Failure>;

/// Outcome of one case handler
pub type CaseResult = Result<(), Failure>;

/// Boxed hook handler
pub type HookFn = Arc<dyn Fn(Frame) -> BoxFuture<'static, HookResult> + Send + Sync>;

/// Boxed case handler
pub type CaseFn = Arc<dyn Fn(Frame) -> BoxFuture<'static, CaseResult> + Send + Sync>;

/// Box an async closure as a hook handler
pub fn hook_fn<F, Fut>(handler: F) -> HookFn
where
    F: Fn(Frame) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult> + Send + 'static,
{
    Arc::new(move |frame| handler(frame).boxed())
}

/// Box an async closure as a case handler
pub fn case_fn<F, Fut>(handler: F) -> CaseFn
where
    F: Fn(Frame) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CaseResult> + Send + 'static,
{
    Arc::new(move |frame| handler(frame).boxed())
}

/// Closed set of action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Define,
    Before,
    Section,
    Case,
    After,
}

impl ActionKind {
    /// Scheduling group. Lower runs first; equal priorities keep
    /// registration order.
    pub const fn priority(self) -> u8 {
        match self {
            ActionKind::Define | ActionKind::Before => 0,
            ActionKind::Section => 1,
            ActionKind::Case => 2,
            ActionKind::After => 3,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ActionKind::Define => "define",
            ActionKind::Before => "before",
            ActionKind::Section => "section",
            ActionKind::Case => "case",
            ActionKind::After => "after",
        }
    }

    /// Hooks whose returned bindings are merged into the frame.
    /// `Before` results are discarded.
    pub const fn merges_result(self) -> bool {
        matches!(self, ActionKind::Define | ActionKind::After)
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, ActionKind::Case)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A define, before or after hook
#[derive(Clone)]
pub struct Hook {
    pub kind: ActionKind,
    pub path: Vec<String>,
    pub site: CallSite,
    pub handler: HookFn,
}

/// A single test case
#[derive(Clone)]
pub struct Case {
    pub title: String,
    pub number: usize,
    /// Path of the declaring section; the title is not appended
    pub path: Vec<String>,
    pub site: CallSite,
    pub handlers: Vec<CaseFn>,
}

/// A named group of actions sharing one frame
#[derive(Clone)]
pub struct Section {
    pub title: String,
    pub path: Vec<String>,
    pub frame: Frame,
    pub actions: Vec<Action>,
}

impl Section {
    pub(crate) fn root(frame: Frame) -> Self {
        Self {
            title: String::new(),
            path: Vec::new(),
            frame,
            actions: Vec::new(),
        }
    }

    /// Declare a nested section: extended path, child frame
    pub(crate) fn nested(&self, title: &str) -> Self {
        let mut path = self.path.clone();
        path.push(title.to_string());
        Self {
            title: title.to_string(),
            path,
            frame: self.frame.child(),
            actions: Vec::new(),
        }
    }

    /// Direct children in scheduling order
    pub fn scheduled(&self) -> Vec<&Action> {
        let mut actions: Vec<&Action> = self.actions.iter().collect();
        // sort_by_key is stable, so ties keep registration order
        actions.sort_by_key(|action| action.kind().priority());
        actions
    }

    /// Number of cases in this section and below
    pub fn case_count(&self) -> usize {
        self.actions
            .iter()
            .map(|action| match action {
                Action::Case(_) => 1,
                Action::Section(section) => section.case_count(),
                Action::Hook(_) => 0,
            })
            .sum()
    }
}

/// One registered tree element
#[derive(Clone)]
pub enum Action {
    Hook(Hook),
    Section(Section),
    Case(Case),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Hook(hook) => hook.kind,
            Action::Section(_) => ActionKind::Section,
            Action::Case(_) => ActionKind::Case,
        }
    }

    pub fn descriptor(&self) -> Descriptor {
        match self {
            Action::Hook(hook) => Descriptor::from(hook),
            Action::Section(section) => Descriptor {
                kind: ActionKind::Section,
                title: Some(section.title.clone()),
                number: None,
                path: section.path.clone(),
            },
            Action::Case(case) => Descriptor::from(case),
        }
    }
}

/// Reporting view of an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub kind: ActionKind,
    pub title: Option<String>,
    pub number: Option<usize>,
    pub path: Vec<String>,
}

impl Descriptor {
    /// Title when present, otherwise the kind name
    pub fn label(&self) -> &str {
        match &self.title {
            Some(title) if !title.is_empty() => title,
            _ => self.kind.as_str(),
        }
    }
}

impl From<&Hook> for Descriptor {
    fn from(hook: &Hook) -> Self {
        Self {
            kind: hook.kind,
            title: None,
            number: None,
            path: hook.path.clone(),
        }
    }
}

impl From<&Case> for Descriptor {
    fn from(case: &Case) -> Self {
        Self {
            kind: ActionKind::Case,
            title: Some(case.title.clone()),
            number: Some(case.number),
            path: case.path.clone(),
        }
    }
}
