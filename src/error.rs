//! Fatal harness errors.
//!
//! Test failures and errors are *results*, not Rust errors. A `HarnessError` means the run itself cannot continue:
//! the channel or an isolated process could not be created, a fixture crashed, or a no-fork body panicked.

use std::io;

use miette::Diagnostic;
use nix::errno::Errno;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("failed to allocate message channel")]
    #[diagnostic(code(isocheck::channel::alloc), help("check that the temp directory is writable"))]
    ChannelAlloc(#[source] io::Error),

    #[error("message channel I/O failed")]
    #[diagnostic(code(isocheck::channel::io))]
    ChannelIo(#[source] io::Error),

    #[error("unable to fork a process for test `{test}`")]
    #[diagnostic(code(isocheck::isolate::spawn), help("rerun with --no-fork to execute tests inline"))]
    Spawn {
        test: String,
        #[source]
        source: Errno,
    },

    #[error("waiting for the process of test `{test}` failed")]
    #[diagnostic(code(isocheck::isolate::wait))]
    Wait {
        test: String,
        #[source]
        source: Errno,
    },

    #[error("unexpected wait status for test `{test}`: {status}")]
    #[diagnostic(code(isocheck::isolate::status))]
    UnexpectedWaitStatus { test: String, status: String },

    #[error("{phase} fixture of test case `{case}` panicked: {message}")]
    #[diagnostic(
        code(isocheck::fixture),
        help("setup and teardown run in the runner's own process and must not fail")
    )]
    Fixture {
        case: String,
        phase: FixturePhase,
        message: String,
    },

    #[error("test `{test}` panicked in no-fork mode: {message}")]
    #[diagnostic(
        code(isocheck::inline_panic),
        help("only fork mode isolates crashes; rerun without --no-fork")
    )]
    InlinePanic { test: String, message: String },
}

/// Which fixture callback failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixturePhase {
    Setup,
    Teardown,
}

impl std::fmt::Display for FixturePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FixturePhase::Setup => f.write_str("setup"),
            FixturePhase::Teardown => f.write_str("teardown"),
        }
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
