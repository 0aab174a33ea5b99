//! Suite runner: ordered execution, fixtures, statistics and the result log.
//!
//! Suites run in registration order, then their test cases, then each case's test functions. Per test case the
//! runner goes `Setup → Running(0..n) → Teardown`; the channel lives exactly as long as `Running`.

use std::panic::{self, AssertUnwindSafe};

use isocheck_core::{ForkMode, TestResult, TestStats};

use crate::channel::Channel;
use crate::config::RunnerConfig;
use crate::error::{FixturePhase, HarnessError, HarnessResult, panic_message};
use crate::executor::TestExecutor;
use crate::report::TestReporter;
use crate::suite::{Fixture, Suite, TestFunction};

/// Owns registered suites and everything produced by running them.
pub struct Runner {
    suites: Vec<Suite>,
    config: RunnerConfig,
    fork_override: Option<ForkMode>,
    stats: TestStats,
    results: Vec<TestResult>,
    reporters: Vec<Box<dyn TestReporter>>,
}

impl Runner {
    /// Create a runner for `suite` with the default configuration (fork mode unless overridden).
    pub fn new(suite: Suite) -> Self {
        Self::with_config(suite, RunnerConfig::default())
    }

    pub fn with_config(suite: Suite, config: RunnerConfig) -> Self {
        Self {
            suites: vec![suite],
            config,
            fork_override: None,
            stats: TestStats::default(),
            results: Vec::new(),
            reporters: Vec::new(),
        }
    }

    pub fn add_suite(&mut self, suite: Suite) -> &mut Self {
        self.suites.push(suite);
        self
    }

    /// Explicitly select the fork mode; takes precedence over the configuration.
    pub fn set_fork_mode(&mut self, mode: ForkMode) -> &mut Self {
        self.fork_override = Some(mode);
        self
    }

    /// The mode the next run uses: explicit override, else configuration, else fork mode.
    pub fn fork_mode(&self) -> ForkMode {
        self.fork_override.or(self.config.fork_mode).unwrap_or_default()
    }

    pub fn add_reporter(&mut self, reporter: impl TestReporter + 'static) -> &mut Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    /// Run every registered test function.
    ///
    /// ## Returns
    /// - `Ok(())` once every test function produced a result, whatever the results are.
    /// - `Err(HarnessError)` when the run cannot continue: a fixture panicked, a no-fork body crashed, or a
    ///   channel or child process could not be created. Results recorded so far remain available.
    pub fn run_all(&mut self) -> HarnessResult<()> {
        let mode = self.fork_mode();
        let executor = TestExecutor::new(mode);
        tracing::debug!(?mode, suites = self.suites.len(), "starting run");

        let Self {
            suites,
            stats,
            results,
            reporters,
            ..
        } = self;
        let mut log = ResultLog {
            stats,
            results,
            reporters,
        };

        log.each_reporter(|r| r.on_run_start(mode));
        for suite in suites.iter_mut() {
            let (suite_name, cases) = suite.split_mut();
            log.each_reporter(|r| r.on_suite_start(suite_name));

            for case in cases.iter_mut() {
                let (case_name, tests, setup, teardown) = case.parts_mut();
                log.each_reporter(|r| r.on_case_start(case_name));
                run_test_case(&executor, &mut log, case_name, tests, setup, teardown)?;
            }
        }

        let ResultLog {
            stats,
            results,
            reporters,
        } = log;
        for reporter in reporters.iter_mut() {
            reporter.on_run_complete(stats, results);
        }
        Ok(())
    }

    /// Number of test functions executed.
    pub fn ntests_run(&self) -> usize {
        self.stats.checked
    }

    /// Failures plus errors.
    pub fn ntests_failed(&self) -> usize {
        self.stats.ntests_failed()
    }

    pub fn stats(&self) -> &TestStats {
        &self.stats
    }

    /// Non-passing results, in execution order. A new vector per call; the results stay runner-owned.
    pub fn failures(&self) -> Vec<&TestResult> {
        self.results.iter().filter(|r| !r.is_pass()).collect()
    }

    /// Every result, in execution order. A new vector per call; the results stay runner-owned.
    pub fn results(&self) -> Vec<&TestResult> {
        self.results.iter().collect()
    }
}

/// Mutable run state borrowed out of the runner while suites are iterated.
struct ResultLog<'a> {
    stats: &'a mut TestStats,
    results: &'a mut Vec<TestResult>,
    reporters: &'a mut Vec<Box<dyn TestReporter>>,
}

impl ResultLog<'_> {
    /// Append a result and update the counters together, then notify reporters.
    fn record(&mut self, result: TestResult) {
        self.stats.record(result.classification());
        self.results.push(result);
        if let Some(recorded) = self.results.last() {
            for reporter in self.reporters.iter_mut() {
                reporter.on_test_complete(recorded);
            }
        }
    }

    fn each_reporter(&mut self, mut f: impl FnMut(&mut dyn TestReporter)) {
        for reporter in self.reporters.iter_mut() {
            f(reporter.as_mut());
        }
    }
}

fn run_test_case(
    executor: &TestExecutor,
    log: &mut ResultLog<'_>,
    case_name: &str,
    tests: &[TestFunction],
    setup: Option<&mut Fixture>,
    teardown: Option<&mut Fixture>,
) -> HarnessResult<()> {
    if let Some(setup) = setup {
        run_fixture(setup, case_name, FixturePhase::Setup)?;
    }

    let mut channel = Channel::create()?;
    for test in tests {
        let result = executor.run(&mut channel, case_name, test)?;
        log.record(result);
    }
    channel.destroy();

    if let Some(teardown) = teardown {
        run_fixture(teardown, case_name, FixturePhase::Teardown)?;
    }
    Ok(())
}

fn run_fixture(fixture: &mut Fixture, case_name: &str, phase: FixturePhase) -> HarnessResult<()> {
    tracing::trace!(test_case = case_name, %phase, "running fixture");
    panic::catch_unwind(AssertUnwindSafe(|| fixture())).map_err(|payload| HarnessError::Fixture {
        case: case_name.to_string(),
        phase,
        message: panic_message(payload.as_ref()),
    })
}
