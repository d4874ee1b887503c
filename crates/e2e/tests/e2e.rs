//! E2E harness entry point
//!
//! This file is the test binary that runs the ledger suites through the
//! command-line harness.
//! Run with: cargo test --package soltap-e2e --test e2e

use std::process::ExitCode;
use std::sync::Arc;

use soltap_cli::Harness;
use soltap_e2e::ledger::{self, Ledger};
use soltap_e2e::suites;

fn main() -> ExitCode {
    let ledger = Arc::new(Ledger::new());

    Harness::new()
        .context(ledger::context(ledger))
        .suite("tests/token.rs", suites::token_suite)
        .suite("tests/vesting.rs", suites::vesting_suite)
        .suite("tests/argv.rs", suites::argv_suite)
        .main()
}
