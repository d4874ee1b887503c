//! soltap end-to-end suites
//!
//! Dogfoods the runner against an in-memory development chain:
//! - `ledger`: a snapshot-capable chain hosting one mintable token
//! - `suites`: hierarchical suites using chain snapshots, `throws` and
//!   multi-step cases
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 tests/e2e.rs (harness = false)              │
//! │    Harness::new().context(ledger::context(..)).suite(..)    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Ledger (impl Evm)                                          │
//! │    ├── snapshot() / rollback() / increase_time()            │
//! │    └── deploy(owner) -> Token                               │
//! │          ├── mint, transfer, release                        │
//! │          └── grant, claim                                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod ledger;
pub mod suites;

pub use error::{LedgerError, LedgerResult};
pub use ledger::{Accounts, Ledger, Token};
