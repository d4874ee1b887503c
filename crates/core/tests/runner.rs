//! End-to-end runs through `TestRunner` with a captured TAP stream

use parking_lot::Mutex;

use soltap_core::{assert, Bindings, ColorMode, Failure, RunnerConfig, Summary, TestRunner};

/// The runner installs a process-wide panic hook; runs must not overlap
static SERIAL: Mutex<()> = Mutex::new(());

fn runner() -> TestRunner {
    TestRunner::with_config(RunnerConfig {
        width: Some(80),
        color: ColorMode::Never,
        ..RunnerConfig::default()
    })
}

async fn capture<F>(runner: &TestRunner, register: F) -> (Summary, String)
where
    F: FnOnce(&mut soltap_core::Builder<'_>) -> Result<(), Failure>,
{
    let (summary, out) = runner.run_to(Vec::new(), register).await.unwrap();
    (summary, String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn test_token_suite_reports_two_passes_and_one_failure() {
    let _serial = SERIAL.lock();

    let (summary, output) = capture(&runner(), |t| {
        t.describe("Token", |t| {
            t.define(|_| async { Ok(Bindings::new().with("supply", 100u64)) });
            t.describe("#mint()", |t| {
                t.it("Should increase balanceOf", |frame| async move {
                    let supply = frame.require::<u64>("supply")?;
                    assert::equal(*supply, 100u64)
                });
                t.it("Should emit Transfer", |_| async { assert::ok(true) });
                Ok(())
            })?;
            t.it("Should cap the supply", |frame| async move {
                let supply = frame.require::<u64>("supply")?;
                assert::equal(*supply, 20u64)
            });
            Ok(())
        })
    })
    .await;

    assert_eq!(summary, Summary { total: 3, pass: 2, halted: false });
    assert_eq!(summary.exit_code(), 1);

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(
        &lines[..11],
        &[
            "TAP version 13",
            "1..3",
            "",
            "# Token :: #mint()",
            "ok 1 - Should increase balanceOf",
            "# Token :: #mint()",
            "ok 2 - Should emit Transfer",
            "# Token",
            "not ok 3 - Should cap the supply",
            "  ---",
            "  message:  expected 100 to equal 20",
        ]
    );
    assert_eq!(lines[11], "  operator: equal");
    assert_eq!(lines[12], "  actual:   100");
    assert_eq!(lines[13], "  expected: 20");
    assert_eq!(lines[14], "  location:");
    assert!(lines[15].starts_with("    - '") && lines[15].contains("runner.rs:"));
    assert!(lines[16].starts_with("    - '") && lines[16].contains("runner.rs:"));
    assert_eq!(lines[17], "  ...");
    assert!(output.ends_with("\n# tests: 3\n# pass: 2\n# fail: 1\n# rate: 66.67 %\n"));
}

#[tokio::test]
async fn test_before_failure_bails_out_without_running_cases() {
    let _serial = SERIAL.lock();

    let (summary, output) = capture(&runner(), |t| {
        t.describe("Sale", |t| {
            t.before(|_| async { Err(Failure::new("snapshot failed")) });
            t.it("Should accept payment", |_| async { Ok(()) });
            Ok(())
        })
    })
    .await;

    assert!(summary.halted);
    assert_eq!(summary.pass, 0);
    assert_eq!(summary.exit_code(), 1);
    assert!(output.contains("\nBail out! before at Sale\nsnapshot failed\n  at "));
    assert!(!output.contains("ok 1"));
    assert!(output.ends_with("# rate: 0.00 %\n"));
}

#[tokio::test]
async fn test_build_error_is_reported_without_plan() {
    let _serial = SERIAL.lock();

    let (summary, output) = capture(&runner(), |t| {
        t.describe("Vesting", |t| {
            t.describe("#release()", |_| Err(Failure::new("fixture missing")))
        })
    })
    .await;

    assert!(summary.halted);
    assert_eq!(summary.total, 0);
    assert!(!output.contains("TAP version 13"));
    assert!(output.starts_with("\nBail out! #release() at Vesting / #release()\nfixture missing\n"));
}

#[tokio::test]
async fn test_argv_reaches_root_frame() {
    let _serial = SERIAL.lock();

    let runner = runner().argv(vec!["--network".into(), "dev".into()]);
    let (summary, _) = capture(&runner, |t| {
        t.it("sees argv", |frame| async move {
            let argv = frame.require::<Vec<String>>(soltap_core::ARGV_KEY)?;
            assert::equal(argv.as_slice(), &["--network".to_string(), "dev".to_string()][..])
        });
        Ok(())
    })
    .await;

    assert!(summary.success());
}
