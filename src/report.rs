//! Run lifecycle reporting.
//!
//! The runner notifies every registered [`TestReporter`] of run, suite, test-case and test-function events. The
//! runner itself never prints; sinks decide what to do with the events:
//! - [`ConsoleReporter`] writes the textual report at a chosen [`Verbosity`].
//! - [`TracingReporter`] emits structured `tracing` events.

use std::io::{self, Write};

use isocheck_core::{Classification, ForkMode, TestResult, TestStats};

/// Trait for receiving run lifecycle events.
///
/// Implement this trait to add an output format (JSON, TAP, ...). Every method has a no-op default.
pub trait TestReporter {
    /// Called once before the first suite runs.
    fn on_run_start(&mut self, _fork_mode: ForkMode) {}

    /// Called when a suite begins.
    fn on_suite_start(&mut self, _suite: &str) {}

    /// Called when a test case begins, before its setup.
    fn on_case_start(&mut self, _test_case: &str) {}

    /// Called with every completed result, in execution order.
    fn on_test_complete(&mut self, _result: &TestResult) {}

    /// Called once after the last suite, with the final statistics and the full result log.
    fn on_run_complete(&mut self, _stats: &TestStats, _results: &[TestResult]) {}
}

/// How much the console report prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, clap::ValueEnum)]
pub enum Verbosity {
    /// Nothing.
    Silent,
    /// Suite banners and the summary line.
    Minimal,
    /// Also every non-passing result.
    #[default]
    Normal,
    /// Also every passing result.
    Verbose,
}

/// Format the summary line: `"{pct}%: Checks: {n}, Failures: {f}, Errors: {e}"`.
pub fn format_summary(stats: &TestStats) -> String {
    format!(
        "{}%: Checks: {}, Failures: {}, Errors: {}",
        stats.percent_passed(),
        stats.checked,
        stats.failed,
        stats.errors
    )
}

/// Format one result line: `"{file}:{line}:{P|F|E}:{case}: {message}"`.
///
/// Error results point at the last known location, so their message is prefixed with `(after this point) `.
pub fn format_result(result: &TestResult) -> String {
    let prefix = if result.classification() == Classification::Error {
        "(after this point) "
    } else {
        ""
    };
    format!(
        "{}:{}:{}:{}: {}{}",
        result.file(),
        result.line(),
        result.classification().short_code(),
        result.test_case(),
        prefix,
        result.message()
    )
}

/// Textual report written to stdout or any other writer.
pub struct ConsoleReporter {
    verbosity: Verbosity,
    out: Box<dyn Write>,
}

impl ConsoleReporter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self::with_writer(verbosity, io::stdout())
    }

    pub fn with_writer(verbosity: Verbosity, out: impl Write + 'static) -> Self {
        Self {
            verbosity,
            out: Box::new(out),
        }
    }

    fn line(&mut self, at_least: Verbosity, text: &str) {
        if self.verbosity >= at_least {
            // Reporting is best-effort; a closed stdout must not abort the run.
            let _ = writeln!(self.out, "{}", text);
            let _ = self.out.flush();
        }
    }
}

impl TestReporter for ConsoleReporter {
    fn on_suite_start(&mut self, suite: &str) {
        self.line(Verbosity::Minimal, &format!("Running suite: {}", suite));
    }

    fn on_run_complete(&mut self, stats: &TestStats, results: &[TestResult]) {
        self.line(Verbosity::Minimal, &format_summary(stats));
        for result in results {
            let threshold = if result.is_pass() {
                Verbosity::Verbose
            } else {
                Verbosity::Normal
            };
            self.line(threshold, &format_result(result));
        }
    }
}

/// Forwards lifecycle events to `tracing` as structured `info` events.
#[derive(Debug, Default)]
pub struct TracingReporter;

impl TestReporter for TracingReporter {
    fn on_run_start(&mut self, fork_mode: ForkMode) {
        tracing::info!(?fork_mode, "run started");
    }

    fn on_suite_start(&mut self, suite: &str) {
        tracing::info!(suite, "suite started");
    }

    fn on_test_complete(&mut self, result: &TestResult) {
        tracing::info!(
            test_case = result.test_case(),
            test = result.test_name(),
            classification = %result.classification(),
            message = result.message(),
            file = result.file(),
            line = result.line(),
            "test finished"
        );
    }

    fn on_run_complete(&mut self, stats: &TestStats, _results: &[TestResult]) {
        tracing::info!(
            checked = stats.checked,
            failed = stats.failed,
            errors = stats.errors,
            percent_passed = stats.percent_passed(),
            "run finished"
        );
    }
}
