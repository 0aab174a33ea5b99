//! Integration tests for running suites with each test function in a forked child process.

use std::cell::Cell;
use std::rc::Rc;

use isocheck::{Classification, ForkMode, Runner, Suite, TestCase, TestContext, add_test, fail, fail_unless, mark_point};
use nix::sys::signal::{Signal, raise};

fn fork_runner(suite: Suite) -> Runner {
    let mut runner = Runner::new(suite);
    runner.set_fork_mode(ForkMode::Fork);
    runner
}

fn summary(runner: &Runner) -> Vec<(Classification, String)> {
    runner
        .results()
        .iter()
        .map(|r| (r.classification(), r.message().to_string()))
        .collect()
}

/// Pass, failure and signal in one case classify independently and in order.
#[test]
fn test_pass_failure_signal_scenario() {
    let case = TestCase::new("Scenario")
        .with_test("returns", |_| {})
        .with_test("fails", |ctx| ctx.fail_now("boom"))
        .with_test("faults", |_| {
            let _ = raise(Signal::SIGTERM);
        });

    let mut runner = fork_runner(Suite::new("S").with_test_case(case));
    runner.run_all().unwrap();

    assert_eq!(
        summary(&runner),
        [
            (Classification::Pass, "Test passed".to_string()),
            (Classification::Failure, "boom".to_string()),
            (Classification::Error, format!("Received signal {}", Signal::SIGTERM as i32)),
        ]
    );
    assert_eq!(runner.ntests_run(), 3);
    assert_eq!(runner.ntests_failed(), 2);
}

#[test]
fn test_early_exit_reports_exit_code() {
    let case = TestCase::new("Exits").with_test("exit_seven", |_| std::process::exit(7));

    let mut runner = fork_runner(Suite::new("S").with_test_case(case));
    runner.run_all().unwrap();

    let result = runner.results()[0];
    assert_eq!(result.classification(), Classification::Error);
    assert_eq!(result.message(), "Early exit with return value 7");
    assert!(result.checkpoint().is_unknown());
}

/// A fault after a checkpoint points at that checkpoint.
#[test]
fn test_signal_location_is_last_checkpoint() {
    let case = TestCase::new("Faults").with_test("marked_then_killed", |ctx| {
        mark_point!(ctx);
        let _ = raise(Signal::SIGKILL);
    });
    let marked_line = line!() - 3;

    let mut runner = fork_runner(Suite::new("S").with_test_case(case));
    runner.run_all().unwrap();

    let result = runner.results()[0];
    assert_eq!(result.classification(), Classification::Error);
    assert_eq!(result.message(), format!("Received signal {}", Signal::SIGKILL as i32));
    assert_eq!(result.file(), file!());
    assert_eq!(result.line(), marked_line as i32);
}

#[test]
fn test_failure_location_is_assertion_site() {
    let case = TestCase::new("Located").with_test("fails", |ctx| {
        let value = 3;
        fail_unless!(ctx, value == 4, "value was {}", value);
    });
    let expected_line = line!() - 2;

    let mut runner = fork_runner(Suite::new("S").with_test_case(case));
    runner.run_all().unwrap();

    let result = runner.results()[0];
    assert_eq!(result.classification(), Classification::Failure);
    assert_eq!(result.message(), "value was 3");
    assert_eq!(result.file(), file!());
    assert_eq!(result.line(), expected_line as i32);
}

/// Fixture state set in setup is seen by every test, but test mutations stay in their child.
#[test]
fn test_fixture_state_is_isolated_between_tests() {
    let value = Rc::new(Cell::new(0));
    let mut case = TestCase::new("Fixtures");
    let (on_setup, on_teardown) = (value.clone(), value.clone());
    case.set_fixture(move || on_setup.set(1), move || on_teardown.set(on_teardown.get() + 10));
    for name in ["first", "second", "third"] {
        let value = value.clone();
        case.add_test(name, move |ctx| {
            fail_unless!(ctx, value.get() == 1, "saw {}", value.get());
            value.set(2);
        });
    }

    let mut runner = fork_runner(Suite::new("S").with_test_case(case));
    runner.run_all().unwrap();

    assert_eq!(runner.ntests_failed(), 0, "{:?}", summary(&runner));
    // Teardown saw the value from setup, not from any test.
    assert_eq!(value.get(), 11);
}

/// A panic that is not a reported failure only ends its own child.
#[test]
fn test_stray_panic_is_an_error_not_a_crash() {
    let case = TestCase::new("Panics")
        .with_test("panics", |_| panic!("unexpected"))
        .with_test("after", |_| {});

    let mut runner = fork_runner(Suite::new("S").with_test_case(case));
    runner.run_all().unwrap();

    assert_eq!(
        summary(&runner),
        [
            (Classification::Error, "Early exit with return value 101".to_string()),
            (Classification::Pass, "Test passed".to_string()),
        ]
    );
}

#[test]
fn test_empty_failure_text_still_reports_a_message() {
    let case = TestCase::new("Empty").with_test("silent_failure", |ctx| fail!(ctx, ""));

    let mut runner = fork_runner(Suite::new("S").with_test_case(case));
    runner.run_all().unwrap();

    let result = runner.results()[0];
    assert_eq!(result.classification(), Classification::Failure);
    assert_eq!(result.message(), "Assertion failed");
    assert_eq!(result.file(), file!());
}

fn registered_by_path(ctx: &TestContext) {
    fail!(ctx, "registered with add_test!");
}

#[test]
fn test_add_test_macro_uses_function_name() {
    let mut case = TestCase::new("Macro");
    add_test!(case, registered_by_path);

    let mut runner = fork_runner(Suite::new("S").with_test_case(case));
    runner.run_all().unwrap();

    let result = runner.results()[0];
    assert_eq!(result.test_name(), "registered_by_path");
    assert_eq!(result.message(), "registered with add_test!");
}

/// Results after a crash or a failure start from a clean channel.
#[test]
fn test_failures_is_ordered_subsequence_of_results() {
    let case = TestCase::new("Mixed")
        .with_test("p1", |_| {})
        .with_test("f1", |ctx| fail!(ctx, "f1"))
        .with_test("e1", |_| std::process::exit(3))
        .with_test("p2", |ctx| mark_point!(ctx))
        .with_test("f2", |ctx| fail!(ctx, "f2"));

    let mut runner = fork_runner(Suite::new("S").with_test_case(case));
    runner.run_all().unwrap();

    let all: Vec<_> = runner.results().iter().map(|r| r.test_name().to_string()).collect();
    let failed: Vec<_> = runner.failures().iter().map(|r| r.test_name().to_string()).collect();
    assert_eq!(all, ["p1", "f1", "e1", "p2", "f2"]);
    assert_eq!(failed, ["f1", "e1", "f2"]);
    assert_eq!(runner.ntests_failed(), failed.len());
    // p2 passed after a crash and a failure; nothing leaked into it.
    assert_eq!(runner.results()[3].message(), "Test passed");
}
