//! Seam for the blockchain test network
//!
//! The provider itself (node process, RPC client, accounts, contracts) lives
//! outside this crate. Suites hand an [`Evm`] implementation to the root
//! frame under [`EVM_KEY`] and use the hook helpers here to isolate state
//! between sections:
//!
//! ```ignore
//! t.describe("Token", |t| {
//!     t.before(chain::snapshot);
//!     t.after(chain::rollback);
//!     t.it("mints", chain::wrap(|frame| async move { /* ... */ Ok(()) }));
//!     Ok(())
//! })
//! ```

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

use crate::action::{CaseResult, HookResult};
use crate::error::Failure;
use crate::frame::{Bindings, Frame};

/// Frame key of the shared provider
pub const EVM_KEY: &str = "evm";

/// State control of a development chain
#[async_trait]
pub trait Evm: Send + Sync {
    /// Push a snapshot of the current chain state
    async fn snapshot(&self) -> Result<(), Failure>;

    /// Revert to the most recent snapshot and pop it
    async fn rollback(&self) -> Result<(), Failure>;

    /// Move the chain clock forward
    async fn increase_time(&self, seconds: u64) -> Result<(), Failure>;
}

pub type SharedEvm = Arc<dyn Evm>;

/// Add `evm` to `bindings` under [`EVM_KEY`]
pub fn bind(bindings: Bindings, evm: SharedEvm) -> Bindings {
    bindings.with(EVM_KEY, evm)
}

/// The provider visible from `frame`
#[track_caller]
pub fn evm(frame: &Frame) -> Result<SharedEvm, Failure> {
    let evm = frame.require::<SharedEvm>(EVM_KEY)?;
    Ok(SharedEvm::clone(&evm))
}

/// Hook: take a snapshot
pub async fn snapshot(frame: Frame) -> HookResult {
    debug!("Taking chain snapshot");
    evm(&frame)?.snapshot().await?;
    Ok(Bindings::new())
}

/// Hook: revert to the last snapshot
pub async fn rollback(frame: Frame) -> HookResult {
    debug!("Rolling back chain snapshot");
    evm(&frame)?.rollback().await?;
    Ok(Bindings::new())
}

/// Run a case between a snapshot and a rollback.
///
/// The rollback happens whether the case passes, fails or panics; a failing
/// rollback replaces the case's own outcome.
pub fn wrap<F, Fut>(case: F) -> impl Fn(Frame) -> BoxFuture<'static, CaseResult> + Send + Sync + 'static
where
    F: Fn(Frame) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CaseResult> + Send + 'static,
{
    let case = Arc::new(case);
    move |frame: Frame| {
        let case = case.clone();
        async move {
            let evm = evm(&frame)?;
            evm.snapshot().await?;
            let outcome = AssertUnwindSafe(case(frame)).catch_unwind().await;
            evm.rollback().await?;
            match outcome {
                Ok(result) => result,
                Err(payload) => panic::resume_unwind(payload),
            }
        }
        .boxed()
    }
}
