//! soltap core
//!
//! Hierarchical async test runner that reports in TAP version 13:
//! - Suites declare nested sections, hooks and cases with a [`Builder`]
//! - Each section gets a context frame that inherits from its parent
//! - The walker runs hooks and cases in priority order, one at a time
//! - Failures are located to the handler or registration site and streamed
//!   as TAP diagnostics
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        TestRunner                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Locator::install()         panic hook, restored on drop    │
//! │  Plan::build(frame, suite)  -> Section tree, total cases    │
//! │    └── Section { title, path, frame, actions }              │
//! │          ├── define / before / after  (Hook)                │
//! │          ├── describe                 (Section)             │
//! │          └── it                       (Case, numbered)      │
//! │  Walker::run(plan)                                          │
//! │    ├── define, before -> section -> case -> after           │
//! │    └── hook failure   -> bail out, summary, halt            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Reporter                                                   │
//! │    ├── plan(total)                                          │
//! │    ├── case(descriptor, failure?)                           │
//! │    ├── bail_out(descriptor, failure)                        │
//! │    └── summary(totals)                                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod assert;
pub mod builder;
pub mod chain;
pub mod config;
pub mod error;
pub mod format;
pub mod frame;
pub mod locator;
pub mod reporter;
pub mod runner;
pub mod walker;

pub use action::{ActionKind, CaseFn, CaseResult, Descriptor, HookResult};
pub use builder::{Builder, Plan, Suite};
pub use config::{ColorMode, RunnerConfig};
pub use error::{Assertion, Failure, TapError, TapResult};
pub use frame::{Bindings, Frame, ARGV_KEY};
pub use locator::{CallSite, Locator};
pub use reporter::{Event, Reporter, Summary, TapReporter};
pub use runner::TestRunner;
pub use walker::Walker;
