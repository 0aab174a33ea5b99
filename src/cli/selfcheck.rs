//! Bundled self-check suites.
//!
//! The *servant* suite has one test function per outcome path (failure, early exit, pass, failed condition,
//! signal, stray panic, marked early exit, repeated failure) and therefore fails by design. The *master* suite runs
//! the servant in fork mode during its setup and verifies every servant result, then checks fixture visibility.

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use isocheck_core::{Classification, ForkMode, TestResult};
use nix::sys::signal::{Signal, raise};

use crate::context::TestContext;
use crate::runner::Runner;
use crate::suite::{Suite, TestCase};
use crate::{fail, fail_unless, mark_point};

/// Source file every servant checkpoint points into.
pub const SERVANT_FILE: &str = file!();

/// Name of the servant's only test case.
pub const SERVANT_CASE: &str = "Servant Core";

/// Expected servant outcome: classification, message, whether a checkpoint was recorded.
struct Expected {
    classification: Classification,
    message: String,
    located: bool,
}

fn expected_servant_results() -> Vec<Expected> {
    use Classification::{Error, Failure, Pass};
    let rows = [
        (Failure, "Failure expected".to_string(), true),
        (Error, "Early exit with return value 1".to_string(), false),
        (Pass, "Test passed".to_string(), true),
        (Failure, "This test should fail".to_string(), true),
        (Error, format!("Received signal {}", Signal::SIGTERM as i32), false),
        (Error, "Early exit with return value 101".to_string(), false),
        (Error, "Early exit with return value 1".to_string(), true),
        (Failure, "First failure".to_string(), true),
    ];
    rows.into_iter()
        .map(|(classification, message, located)| Expected {
            classification,
            message,
            located,
        })
        .collect()
}

/// Build the servant suite. Only meaningful in fork mode: several of its tests end their process.
pub fn servant_suite() -> Suite {
    let case = TestCase::new(SERVANT_CASE)
        .with_test("test_fail", |ctx| fail!(ctx, "Failure expected"))
        .with_test("test_early_exit", |_| std::process::exit(1))
        .with_test("test_pass", |ctx| fail_unless!(ctx, 2 + 2 == 4, "This test should pass"))
        .with_test("test_fail_unless", |ctx| fail_unless!(ctx, 1 == 2, "This test should fail"))
        .with_test("test_signal", |_| {
            let _ = raise(Signal::SIGTERM);
        })
        .with_test("test_stray_panic", |_| panic!("stray panic outside the assertion layer"))
        .with_test("test_mark_point_then_exit", |ctx| {
            mark_point!(ctx);
            std::process::exit(1)
        })
        .with_test("test_first_failure_wins", |ctx| {
            let _ = panic::catch_unwind(AssertUnwindSafe(|| fail!(ctx, "First failure")));
            fail!(ctx, "Second failure")
        });
    Suite::new("Servant").with_test_case(case)
}

/// Snapshot of a finished servant run, captured by the master setup.
#[derive(Debug, Clone)]
pub struct ServantReport {
    pub ntests_run: usize,
    pub ntests_failed: usize,
    pub results: Vec<TestResult>,
    pub failures: Vec<TestResult>,
}

/// Run the servant suite in fork mode, whatever the caller's mode is.
pub fn run_servant() -> crate::HarnessResult<ServantReport> {
    let mut runner = Runner::new(servant_suite());
    runner.set_fork_mode(ForkMode::Fork);
    runner.run_all()?;
    Ok(ServantReport {
        ntests_run: runner.ntests_run(),
        ntests_failed: runner.ntests_failed(),
        results: runner.results().into_iter().cloned().collect(),
        failures: runner.failures().into_iter().cloned().collect(),
    })
}

type SharedReport = Rc<RefCell<Option<ServantReport>>>;

/// Wrap a check over the servant report as a test body.
fn with_report(report: SharedReport, check: fn(&TestContext, &ServantReport)) -> impl Fn(&TestContext) {
    move |ctx| {
        mark_point!(ctx);
        let guard = report.borrow();
        let Some(report) = guard.as_ref() else {
            fail!(ctx, "servant report missing; setup did not run")
        };
        check(ctx, report);
    }
}

fn check_nfailures(ctx: &TestContext, report: &ServantReport) {
    let want = expected_servant_results().iter().filter(|e| !e.classification.is_pass()).count();
    fail_unless!(
        ctx,
        report.ntests_failed == want,
        "Unexpected number of failures received: {}",
        report.ntests_failed
    );
}

fn check_ntests_run(ctx: &TestContext, report: &ServantReport) {
    let want = expected_servant_results().len();
    fail_unless!(ctx, report.ntests_run == want, "Unexpected number of tests run: {}", report.ntests_run);
}

fn check_counts_match_log(ctx: &TestContext, report: &ServantReport) {
    fail_unless!(ctx, report.results.len() == report.ntests_run, "result log and counter disagree");
    fail_unless!(ctx, report.failures.len() == report.ntests_failed, "failure list and counter disagree");
}

fn check_failure_msgs(ctx: &TestContext, report: &ServantReport) {
    let expected: Vec<_> = expected_servant_results()
        .into_iter()
        .filter(|e| !e.classification.is_pass())
        .collect();
    for (want, got) in expected.iter().zip(&report.failures) {
        fail_unless!(ctx, got.message() == want.message, "Expected {}, got {}", want.message, got.message());
    }
}

fn check_failure_types(ctx: &TestContext, report: &ServantReport) {
    for result in &report.failures {
        fail_unless!(
            ctx,
            result.classification() != Classification::Pass,
            "Passing result {} in failure list",
            result.test_name()
        );
    }
}

fn check_all_msgs(ctx: &TestContext, report: &ServantReport) {
    for (want, got) in expected_servant_results().iter().zip(&report.results) {
        fail_unless!(ctx, got.message() == want.message, "Expected {}, got {}", want.message, got.message());
    }
}

fn check_all_types(ctx: &TestContext, report: &ServantReport) {
    for (want, got) in expected_servant_results().iter().zip(&report.results) {
        fail_unless!(
            ctx,
            got.classification() == want.classification,
            "Failure type wrong for {}: expected {}, got {}",
            got.test_name(),
            want.classification,
            got.classification()
        );
    }
}

fn check_lines(ctx: &TestContext, report: &ServantReport) {
    for (want, got) in expected_servant_results().iter().zip(&report.results) {
        if want.located {
            fail_unless!(ctx, got.line() > 0, "Expected a line number for {}, got {}", got.test_name(), got.line());
        } else {
            fail_unless!(
                ctx,
                got.checkpoint().is_unknown(),
                "Expected unknown location for {}, got {}",
                got.test_name(),
                got.checkpoint()
            );
        }
    }
}

fn check_files(ctx: &TestContext, report: &ServantReport) {
    for result in report.results.iter().filter(|r| !r.checkpoint().is_unknown()) {
        fail_unless!(ctx, result.file() == SERVANT_FILE, "Bad file name: {}", result.file());
    }
}

fn check_case_names(ctx: &TestContext, report: &ServantReport) {
    for result in &report.results {
        fail_unless!(ctx, result.test_case() == SERVANT_CASE, "Bad test case name: {}", result.test_case());
    }
}

/// Build the master suite.
///
/// `mode` is the mode the master itself will run in; the fixture checks differ because forked test bodies cannot
/// change fixture state seen by later tests.
pub fn master_suite(mode: ForkMode) -> Suite {
    let report: SharedReport = Rc::new(RefCell::new(None));

    let mut core = TestCase::new("Core Tests");
    let slot = report.clone();
    core.set_setup(move || match run_servant() {
        Ok(servant) => *slot.borrow_mut() = Some(servant),
        Err(err) => panic!("servant run aborted: {}", err),
    });
    core.add_test("test_check_nfailures", with_report(report.clone(), check_nfailures))
        .add_test("test_check_ntests_run", with_report(report.clone(), check_ntests_run))
        .add_test("test_check_counts_match_log", with_report(report.clone(), check_counts_match_log))
        .add_test("test_check_failure_msgs", with_report(report.clone(), check_failure_msgs))
        .add_test("test_check_failure_types", with_report(report.clone(), check_failure_types))
        .add_test("test_check_failure_lines", with_report(report.clone(), check_lines))
        .add_test("test_check_failure_files", with_report(report.clone(), check_files))
        .add_test("test_check_failure_case_names", with_report(report.clone(), check_case_names))
        .add_test("test_check_all_msgs", with_report(report.clone(), check_all_msgs))
        .add_test("test_check_all_types", with_report(report.clone(), check_all_types));

    let fixture_val = Rc::new(Cell::new(0));
    let calls = Rc::new(Cell::new(0));
    let mut fixtures = TestCase::new("Fixture Setup Tests");
    let (on_setup, on_teardown) = (fixture_val.clone(), fixture_val.clone());
    fixtures.set_fixture(move || on_setup.set(1), move || on_teardown.set(3));
    // Registered three times so fixture preservation is exercised across consecutive tests.
    for _ in 0..3 {
        let (val, calls) = (fixture_val.clone(), calls.clone());
        fixtures.add_test("test_setup", move |ctx| {
            let want = if mode == ForkMode::NoFork && calls.get() > 0 { 2 } else { 1 };
            calls.set(calls.get() + 1);
            fail_unless!(
                ctx,
                val.get() == want,
                "Value not setup or changed across tests correctly: expected {}, got {}",
                want,
                val.get()
            );
            val.set(2);
        });
    }

    let after_teardown = fixture_val.clone();
    let post_teardown = TestCase::new("Fixture Teardown Tests").with_test("test_teardown", move |ctx| {
        fail_unless!(ctx, after_teardown.get() == 3, "Value not changed correctly in teardown");
    });

    Suite::new("Master")
        .with_test_case(core)
        .with_test_case(fixtures)
        .with_test_case(post_teardown)
}
