//! Failure location capture
//!
//! Handler failures reach the walker two ways: as a returned [`Failure`],
//! whose call sites were captured with `#[track_caller]`, or as a panic. For
//! panics the locator installs a process-wide panic hook for the duration of
//! a run. While a handler is being invoked under [`Locator::capturing`], the
//! hook records the panic message and source location instead of printing
//! them, and the walker collects the record after `catch_unwind`. Any other
//! panic is forwarded to the hook that was installed before.
//!
//! The hook is a process-wide resource. Only one installed locator may exist
//! at a time and the previous hook is put back when the guard drops. A guard
//! dropped during unwinding cannot touch the hook; it retires its own hook
//! instead, which then forwards every panic.

use std::any::Any;
use std::fmt;
use std::panic::{self, Location, PanicHookInfo};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Failure, TapError, TapResult};

static ACTIVE: AtomicBool = AtomicBool::new(false);

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// A source position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl CallSite {
    /// The location of the caller, following `#[track_caller]` chains
    #[track_caller]
    pub fn caller() -> Self {
        Location::caller().into()
    }

    /// Render as `file:line:column` with `file` relative to `base`.
    ///
    /// Paths that are already relative are kept as they are; rustc records
    /// workspace sources relative to the workspace root.
    pub fn relative_to(&self, base: &Path) -> String {
        let path = Path::new(&self.file);
        let file = if path.is_absolute() {
            path.strip_prefix(base).unwrap_or(path)
        } else {
            path
        };
        format!("{}:{}:{}", file.display(), self.line, self.column)
    }
}

impl From<&Location<'_>> for CallSite {
    fn from(location: &Location<'_>) -> Self {
        Self {
            file: location.file().to_string(),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// What the panic hook saw for the most recent panic
#[derive(Debug, Clone)]
pub struct PanicCapture {
    pub message: String,
    pub site: Option<CallSite>,
}

/// State shared between a locator and its panic hook
#[derive(Default)]
struct HookState {
    last_panic: Mutex<Option<PanicCapture>>,
    /// Thread currently invoking a handler
    capturing: Mutex<Option<ThreadId>>,
    /// Set once the owning locator is gone
    retired: AtomicBool,
}

impl HookState {
    fn captures_current_thread(&self) -> bool {
        !self.retired.load(Ordering::Acquire) && *self.capturing.lock() == Some(thread::current().id())
    }
}

/// Scoped owner of the panic hook, and renderer of failure locations
pub struct Locator {
    base_dir: PathBuf,
    state: Arc<HookState>,
    previous: Option<Arc<PanicHook>>,
}

impl Locator {
    /// Install the capturing panic hook.
    ///
    /// Fails with [`TapError::LocatorBusy`] while another installed locator
    /// is alive.
    pub fn install(base_dir: impl Into<PathBuf>) -> TapResult<Self> {
        if ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TapError::LocatorBusy);
        }

        let state = Arc::new(HookState::default());
        let previous: Arc<PanicHook> = Arc::new(panic::take_hook());

        let hook_state = state.clone();
        let forward = previous.clone();
        panic::set_hook(Box::new(move |info| {
            if hook_state.captures_current_thread() {
                *hook_state.last_panic.lock() = Some(PanicCapture {
                    message: payload_message(info.payload()),
                    site: info.location().map(CallSite::from),
                });
            } else {
                forward.as_ref()(info);
            }
        }));
        debug!("Installed panic location hook");

        Ok(Self {
            base_dir: base_dir.into(),
            state,
            previous: Some(previous),
        })
    }

    /// A locator that renders locations but leaves the panic hook alone.
    /// Panics caught under it report their payload without a site.
    pub fn detached(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            state: Arc::new(HookState::default()),
            previous: None,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.previous.is_some()
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Record panics on the current thread until the guard drops
    pub fn capturing(&self) -> Capturing<'_> {
        let previous = self.state.capturing.lock().replace(thread::current().id());
        Capturing {
            state: &self.state,
            previous,
        }
    }

    /// Take the record of the last panic, if any
    pub fn take_panic(&self) -> Option<PanicCapture> {
        self.state.last_panic.lock().take()
    }

    /// Convert a payload caught with `catch_unwind` into a failure
    pub fn failure_from_panic(&self, payload: Box<dyn Any + Send>) -> Failure {
        match self.take_panic() {
            Some(capture) => Failure::from_panic(capture.message, capture.site),
            None => Failure::from_panic(payload_message(payload.as_ref()), None),
        }
    }

    /// Render the failure's call sites into its `location`
    pub fn annotate(&self, failure: &mut Failure) {
        let location = failure
            .sites()
            .iter()
            .map(|site| site.relative_to(&self.base_dir))
            .collect();
        failure.set_location(location);
    }
}

impl Drop for Locator {
    fn drop(&mut self) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        self.state.retired.store(true, Ordering::Release);

        // set_hook panics when called from a panicking thread
        if thread::panicking() {
            warn!("Dropping locator while unwinding; retired hook forwards to the previous one");
        } else {
            drop(panic::take_hook());
            match Arc::try_unwrap(previous) {
                Ok(hook) => panic::set_hook(hook),
                Err(shared) => panic::set_hook(Box::new(move |info| shared.as_ref()(info))),
            }
            debug!("Restored previous panic hook");
        }
        ACTIVE.store(false, Ordering::Release);
    }
}

/// Guard returned by [`Locator::capturing`]
pub struct Capturing<'a> {
    state: &'a HookState,
    previous: Option<ThreadId>,
}

impl Drop for Capturing<'_> {
    fn drop(&mut self) {
        *self.state.capturing.lock() = self.previous.take();
    }
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Serializes tests that install the process-wide hook
#[cfg(test)]
pub(crate) fn serial() -> parking_lot::MutexGuard<'static, ()> {
    static SERIAL: Mutex<()> = Mutex::new(());
    SERIAL.lock()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_to_strips_absolute_base() {
        let site = CallSite {
            file: "/work/project/tests/token.rs".into(),
            line: 12,
            column: 5,
        };
        assert_eq!(site.relative_to(Path::new("/work/project")), "tests/token.rs:12:5");
        assert_eq!(
            site.relative_to(Path::new("/elsewhere")),
            "/work/project/tests/token.rs:12:5"
        );
    }

    #[test]
    fn test_relative_paths_are_kept() {
        let site = CallSite {
            file: "crates/core/src/walker.rs".into(),
            line: 1,
            column: 1,
        };
        assert_eq!(site.relative_to(Path::new("/work")), "crates/core/src/walker.rs:1:1");
    }

    /// Install a hook that records panic messages, returning the record
    fn record_panics() -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        panic::set_hook(Box::new(move |info| sink.lock().push(payload_message(info.payload()))));
        seen
    }

    #[test]
    fn test_install_captures_panic_location() {
        let _serial = serial();
        let locator = Locator::install("/").unwrap();

        let payload = {
            let _capture = locator.capturing();
            panic::catch_unwind(|| panic!("boom {}", 7)).unwrap_err()
        };
        let mut failure = locator.failure_from_panic(payload);
        locator.annotate(&mut failure);

        assert_eq!(failure.message(), "boom 7");
        assert_eq!(failure.location().len(), 1);
        assert!(failure.location()[0].contains("locator.rs:"));
    }

    #[test]
    fn test_panics_outside_capture_reach_previous_hook() {
        let _serial = serial();
        let seen = record_panics();
        let locator = Locator::install("/").unwrap();

        let _ = panic::catch_unwind(|| panic!("reporter bug"));
        assert!(locator.take_panic().is_none());

        {
            let _capture = locator.capturing();
            let _ = panic::catch_unwind(|| panic!("handler failure"));
        }
        assert_eq!(locator.take_panic().unwrap().message, "handler failure");

        drop(locator);
        let _ = panic::catch_unwind(|| panic!("after run"));
        drop(panic::take_hook());

        assert_eq!(*seen.lock(), vec!["reporter bug".to_string(), "after run".to_string()]);
    }

    #[test]
    fn test_drop_while_unwinding_keeps_panics_visible() {
        let _serial = serial();
        let seen = record_panics();

        let result = panic::catch_unwind(|| {
            let _locator = Locator::install("/").unwrap();
            panic!("while installed");
        });
        assert!(result.is_err());

        let _ = panic::catch_unwind(|| panic!("after unwinding"));
        let next = Locator::install("/").unwrap();
        drop(next);
        drop(panic::take_hook());

        assert_eq!(
            *seen.lock(),
            vec!["while installed".to_string(), "after unwinding".to_string()]
        );
    }

    #[test]
    fn test_only_one_installed_locator() {
        let _serial = serial();
        let first = Locator::install("/").unwrap();
        assert!(matches!(Locator::install("/"), Err(TapError::LocatorBusy)));
        drop(first);

        let second = Locator::install("/").unwrap();
        assert!(second.is_installed());
    }

    #[test]
    fn test_detached_reports_payload_without_site() {
        let locator = Locator::detached("/");
        let failure = locator.failure_from_panic(Box::new("plain"));
        assert_eq!(failure.message(), "plain");
        assert!(failure.sites().is_empty());
        assert!(!locator.is_installed());
    }
}
