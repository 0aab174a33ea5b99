//! Result classification: map a raw completion to a structured outcome.
//!
//! Fork mode observes an independent termination status for each test body; no-fork mode only knows whether a
//! failure message was transmitted. Both paths are pure functions so the rules can be tested without processes.

use crate::result::Classification;

/// Message attached to every passing result.
pub const PASS_MESSAGE: &str = "Test passed";

/// Message of a failure that was reported with empty text.
pub const EMPTY_FAILURE_MESSAGE: &str = "Assertion failed";

/// How an isolated execution context ended, as decoded from its wait status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The context exited with this code.
    Exited(i32),
    /// The context was killed by this signal number.
    Signaled(i32),
}

/// Classification plus the user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub classification: Classification,
    pub message: String,
}

impl Outcome {
    pub fn pass() -> Self {
        Self {
            classification: Classification::Pass,
            message: PASS_MESSAGE.to_string(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            classification: Classification::Failure,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            classification: Classification::Error,
            message: message.into(),
        }
    }
}

/// Format the synthesized message for a context killed by a signal.
pub fn signal_message(signal: i32) -> String {
    format!("Received signal {}", signal)
}

/// Format the synthesized message for a nonzero exit without a failure message.
pub fn exit_message(code: i32) -> String {
    format!("Early exit with return value {}", code)
}

/// Classify a fork-mode completion.
///
/// ## Parameters
/// - `termination`: decoded wait status of the child.
/// - `failure`: the failure message received from the channel, if any.
///
/// ## Returns
/// - (`Outcome`): per the fork-mode table below.
///
/// ## Notes
/// | termination | failure message | outcome |
/// |---|---|---|
/// | signal `S` | ignored | Error, `Received signal S` |
/// | exit 0 | ignored | Pass, `Test passed` |
/// | exit ≠ 0 | present | Failure, transmitted text (or `Assertion failed` if empty) |
/// | exit ≠ 0 | absent | Error, `Early exit with return value C` |
pub fn classify_forked(termination: Termination, failure: Option<String>) -> Outcome {
    match termination {
        Termination::Signaled(signal) => Outcome::error(signal_message(signal)),
        Termination::Exited(0) => Outcome::pass(),
        Termination::Exited(code) => match failure {
            Some(message) => reported_failure(message),
            None => Outcome::error(exit_message(code)),
        },
    }
}

/// Classify a no-fork (inline) completion. `Error` is not representable here.
pub fn classify_inline(failure: Option<String>) -> Outcome {
    match failure {
        Some(message) => reported_failure(message),
        None => Outcome::pass(),
    }
}

fn reported_failure(message: String) -> Outcome {
    if message.is_empty() {
        Outcome::failure(EMPTY_FAILURE_MESSAGE)
    } else {
        Outcome::failure(message)
    }
}
