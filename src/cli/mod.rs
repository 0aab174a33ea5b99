//! CLI module for isocheck
//!
//! Runs one of the bundled self-check suites and reports the outcome through the exit status.
//!
//! ## Usage
//!
//! - `isocheck` - Run the master suite (which runs the servant suite itself)
//! - `isocheck --suite servant` - Run the servant suite directly; it fails by design
//! - `isocheck --no-fork` - Run test bodies inline (overrides `ISOCHECK_FORK`)
//! - `isocheck --verbosity verbose` - Also list passing results
//!
//! ## Modules
//!
//! - `selfcheck` - The master and servant suites
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! `execute` returns `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod selfcheck;

use std::fmt;
use std::process;

use clap::{Parser, ValueEnum};

use crate::config::RunnerConfig;
use crate::error::HarnessError;
use crate::report::{ConsoleReporter, TracingReporter, Verbosity};
use crate::runner::Runner;
use isocheck_core::ForkMode;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    /// At least one test failed or errored.
    pub const FAILURE: ExitCode = ExitCode(1);
    /// The run was refused or aborted by a harness error.
    pub const FATAL: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Render a harness error with its diagnostic code and help (exit code 2).
    pub fn fatal(err: HarnessError) -> Self {
        Self::new(format!("{:?}", miette::Report::new(err)), ExitCode::FATAL)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Which bundled suite to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SuiteChoice {
    /// Verifies the harness by running the servant suite and checking its results
    #[default]
    Master,
    /// One test per outcome path; fails by design
    Servant,
}

/// Process-isolated unit test harness self-check
#[derive(Parser, Debug)]
#[command(name = "isocheck")]
#[command(version = VERSION)]
#[command(about = "Run the isocheck self-check suites", long_about = None)]
pub struct Cli {
    /// Suite to run
    #[arg(long, value_enum, default_value_t = SuiteChoice::Master)]
    pub suite: SuiteChoice,

    /// Run test bodies inline instead of in forked processes
    #[arg(long, conflicts_with = "fork")]
    pub no_fork: bool,

    /// Run test bodies in forked processes even if ISOCHECK_FORK=no
    #[arg(long)]
    pub fork: bool,

    /// How much of the report to print
    #[arg(short, long, value_enum, default_value_t = Verbosity::Normal)]
    pub verbosity: Verbosity,
}

impl Cli {
    /// Fold the mode flags into the environment-derived configuration.
    fn runner_config(&self, from_env: RunnerConfig) -> RunnerConfig {
        if self.no_fork {
            from_env.with_fork_mode(ForkMode::NoFork)
        } else if self.fork {
            from_env.with_fork_mode(ForkMode::Fork)
        } else {
            from_env
        }
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the selected suite and map its outcome to an exit code.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = cli.runner_config(RunnerConfig::from_env());
    let mode = config.fork_mode.unwrap_or_default();

    let suite = match cli.suite {
        SuiteChoice::Master => selfcheck::master_suite(mode),
        SuiteChoice::Servant if mode == ForkMode::NoFork => {
            return Err(CliError::new(
                "Error: the servant suite ends its own process and can only run in fork mode",
                ExitCode::FATAL,
            ));
        }
        SuiteChoice::Servant => selfcheck::servant_suite(),
    };

    let mut runner = Runner::with_config(suite, config);
    runner
        .add_reporter(ConsoleReporter::new(cli.verbosity))
        .add_reporter(TracingReporter);
    runner.run_all().map_err(CliError::fatal)?;

    if runner.ntests_failed() == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

// ============================================================================
// Tests
// ============================================================================
