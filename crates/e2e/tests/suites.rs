//! Ledger suites run through `TestRunner` with the TAP stream captured

use std::sync::Arc;

use parking_lot::Mutex;
use soltap_core::{ColorMode, RunnerConfig, TestRunner};
use soltap_e2e::ledger::{self, Ledger};
use soltap_e2e::suites;

static SERIAL: Mutex<()> = Mutex::new(());

fn runner(ledger: Arc<Ledger>) -> TestRunner {
    TestRunner::with_config(RunnerConfig {
        width: Some(80),
        color: ColorMode::Never,
        ..RunnerConfig::default()
    })
    .context(ledger::context(ledger))
}

#[tokio::test]
async fn test_token_suite_passes_and_restores_chain() {
    let _serial = SERIAL.lock();
    let ledger = Arc::new(Ledger::new());

    let (summary, out) = runner(ledger.clone())
        .run_to(Vec::new(), suites::token_suite)
        .await
        .unwrap();
    let output = String::from_utf8(out).unwrap();

    assert!(summary.success(), "{}", output);
    assert_eq!(summary.total, 6);
    assert!(output.contains("# Token :: #mint()\nok 1 - Should increase balanceOf\n"));
    assert!(output.contains("# Token :: #release()\nok 5 - Should deprecate minting\n"));
    assert!(output.contains("# Token\nok 6 - Should start with empty supply after rollback\n"));
    assert!(output.ends_with("# tests: 6\n# pass: 6\n# fail: 0\n# rate: 100.00 %\n"));
    assert_eq!(ledger.pending_snapshots(), 0);
}

#[tokio::test]
async fn test_suites_share_numbering() {
    let _serial = SERIAL.lock();
    let ledger = Arc::new(Ledger::new());

    let (summary, out) = runner(ledger.clone())
        .run_to(Vec::new(), |t| {
            suites::token_suite(t)?;
            suites::vesting_suite(t)
        })
        .await
        .unwrap();
    let output = String::from_utf8(out).unwrap();

    assert!(summary.success(), "{}", output);
    assert_eq!(summary.total, 10);
    assert!(output.starts_with("TAP version 13\n1..10\n"));
    assert!(output.contains("# Vesting :: #claim()\nok 9 - Should reject a second grant and a missing claim\n"));
    assert_eq!(ledger.now(), 0);
    assert_eq!(ledger.pending_snapshots(), 0);
}

#[tokio::test]
async fn test_missing_ledger_bails_out() {
    let _serial = SERIAL.lock();

    let runner = TestRunner::with_config(RunnerConfig {
        width: Some(80),
        color: ColorMode::Never,
        ..RunnerConfig::default()
    });
    let (summary, out) = runner.run_to(Vec::new(), suites::token_suite).await.unwrap();
    let output = String::from_utf8(out).unwrap();

    assert!(summary.halted);
    assert_eq!(summary.exit_code(), 1);
    assert!(output.contains("Bail out! before at Token\ncontext value `evm` is undefined\n"));
    assert!(output.ends_with("# tests: 6\n# pass: 0\n# fail: 6\n# rate: 0.00 %\n"));
}
