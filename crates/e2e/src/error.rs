//! Error types of the in-memory ledger

use thiserror::Error;

/// Ledger errors. Reverts carry the reason string a contract would emit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("VM Exception while processing transaction: revert {0}")]
    Revert(String),

    #[error("No contract deployed")]
    NotDeployed,

    #[error("No snapshot to revert to")]
    NoSnapshot,
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    pub fn revert(reason: &str) -> Self {
        LedgerError::Revert(reason.to_string())
    }
}
