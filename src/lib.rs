#![deny(unsafe_code)]
//! Process-isolated unit testing.
//!
//! isocheck runs test functions grouped into test cases and suites. Each test function runs in a forked child
//! process by default, so a crash, a signal or an early `exit` is recorded as an error instead of taking the runner
//! down. A no-fork mode runs bodies inline for debugging.
//!
//! ```no_run
//! use isocheck::{Runner, RunnerConfig, Suite, TestCase, fail_unless};
//!
//! let case = TestCase::new("Core").with_test("adds", |ctx| fail_unless!(ctx, 1 + 1 == 2));
//! let mut runner = Runner::with_config(Suite::new("Math").with_test_case(case), RunnerConfig::from_env());
//! runner.run_all().unwrap();
//! assert_eq!(runner.ntests_failed(), 0);
//! ```
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` with `?` / `map_err`. The crate enforces `#![deny(clippy::unwrap_used)]`.
//! - **Test bodies**: A reported failure unwinds out of the body and is caught by the isolator. Any other panic is a
//!   crash: an error result in fork mode, a fatal [`HarnessError`] in no-fork mode.
//! - **Fixtures**: A panicking setup or teardown aborts the run with [`HarnessError::Fixture`].
//!
//! ## Unsafe
//!
//! Only [`isolate`] uses `unsafe`, for `fork` and `_exit`.

#![deny(clippy::unwrap_used)]

pub mod channel;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
#[allow(unsafe_code)]
pub mod isolate;
pub mod report;
pub mod runner;
pub mod suite;

pub use channel::{Channel, Sender};
pub use config::RunnerConfig;
pub use context::TestContext;
pub use error::{FixturePhase, HarnessError, HarnessResult};
pub use executor::TestExecutor;
pub use isolate::{Completion, ForkIsolator, InlineIsolator, Isolator};
pub use report::{ConsoleReporter, TestReporter, TracingReporter, Verbosity};
pub use runner::Runner;
pub use suite::{Fixture, Suite, TestCase, TestFunction};

pub use isocheck_core::{
    Checkpoint, Classification, EMPTY_FAILURE_MESSAGE, ForkMode, Outcome, PASS_MESSAGE, TestResult, TestStats,
    Termination, UNKNOWN_FILE, UNKNOWN_LINE,
};
