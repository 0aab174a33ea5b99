//! Process isolation for test bodies.
//!
//! Two mutually exclusive strategies sit behind the [`Isolator`] trait:
//! - [`ForkIsolator`] runs each body in a forked child and decodes the child's wait status.
//! - [`InlineIsolator`] runs the body in the runner's own process and only reports that it returned.
//!
//! Both wrap the body in [`invoke_body`], the single catch point for the failure unwind raised by
//! [`TestContext::fail_now`](crate::TestContext::fail_now).

use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};

use isocheck_core::{ForkMode, Termination};
use nix::errno::Errno;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork};

use crate::channel::Channel;
use crate::context::{TestContext, is_test_failure};
use crate::error::{HarnessError, HarnessResult, panic_message};
use crate::suite::TestFunction;

/// Exit code of a forked child whose body reported a failure.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Exit code of a forked child whose body panicked without reporting a failure.
pub const PANIC_EXIT_CODE: i32 = 101;

/// How a single body invocation ended, before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Fork mode: the child's decoded termination.
    Forked(Termination),
    /// No-fork mode: the body returned control (normally or through a reported failure).
    Inline,
}

/// Outcome of one wrapped body invocation.
#[derive(Debug)]
pub(crate) enum BodyExit {
    Returned,
    Failed,
    Panicked(String),
}

/// Run `body` once, catching the failure unwind and any other panic.
pub(crate) fn invoke_body(test: &TestFunction, ctx: &TestContext) -> BodyExit {
    match panic::catch_unwind(AssertUnwindSafe(|| test.call(ctx))) {
        Ok(()) => BodyExit::Returned,
        Err(payload) if is_test_failure(payload.as_ref()) => BodyExit::Failed,
        Err(payload) => BodyExit::Panicked(panic_message(payload.as_ref())),
    }
}

/// Strategy for executing one test body.
pub trait Isolator {
    /// Execute `test` with a sender on `channel` and report how it ended.
    fn execute(&self, test: &TestFunction, channel: &Channel) -> HarnessResult<Completion>;
}

/// Build the isolator for a fork mode.
pub fn isolator_for(mode: ForkMode) -> Box<dyn Isolator> {
    match mode {
        ForkMode::Fork => Box::new(ForkIsolator),
        ForkMode::NoFork => Box::new(InlineIsolator),
    }
}

/// Runs each body in its own forked copy of the process.
#[derive(Debug, Default)]
pub struct ForkIsolator;

impl Isolator for ForkIsolator {
    fn execute(&self, test: &TestFunction, channel: &Channel) -> HarnessResult<Completion> {
        let sender = channel.sender()?;

        // Held across the fork so no other thread owns the stdout lock in the child. The lock is reentrant and the
        // child's only thread is this one, so the body and the final flush can still take it.
        let mut stdout = io::stdout().lock();
        // Buffered output would otherwise be emitted twice, once by each process.
        let _ = stdout.flush();
        let _ = io::stderr().flush();

        // SAFETY: the child only runs the test body and then leaves through `_exit` without returning into the
        // runner, so no runner state is observed after the fork.
        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                let ctx = TestContext::new(sender);
                let code = match invoke_body(test, &ctx) {
                    BodyExit::Returned => 0,
                    BodyExit::Failed => FAILURE_EXIT_CODE,
                    BodyExit::Panicked(_) => PANIC_EXIT_CODE,
                };
                drop(ctx);
                // `_exit` skips the flush a normal exit would do; keep what the body printed.
                let _ = stdout.flush();
                // SAFETY: `_exit` terminates the child immediately and is async-signal-safe.
                unsafe { libc::_exit(code) }
            }
            Ok(ForkResult::Parent { child }) => {
                drop(stdout);
                drop(sender);
                tracing::trace!(test = test.name(), pid = child.as_raw(), "forked test process");
                let termination = wait_for(child, test.name())?;
                Ok(Completion::Forked(termination))
            }
            Err(source) => Err(HarnessError::Spawn {
                test: test.name().to_string(),
                source,
            }),
        }
    }
}

fn wait_for(child: Pid, test: &str) -> HarnessResult<Termination> {
    loop {
        match waitpid(child, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(Termination::Exited(code)),
            Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(Termination::Signaled(signal as i32)),
            Ok(status) => {
                return Err(HarnessError::UnexpectedWaitStatus {
                    test: test.to_string(),
                    status: format!("{:?}", status),
                });
            }
            Err(Errno::EINTR) => continue,
            Err(source) => {
                return Err(HarnessError::Wait {
                    test: test.to_string(),
                    source,
                });
            }
        }
    }
}

/// Runs each body inline. Only reported failures are recoverable; any other panic ends the run.
#[derive(Debug, Default)]
pub struct InlineIsolator;

impl Isolator for InlineIsolator {
    fn execute(&self, test: &TestFunction, channel: &Channel) -> HarnessResult<Completion> {
        let ctx = TestContext::new(channel.sender()?);
        match invoke_body(test, &ctx) {
            BodyExit::Returned | BodyExit::Failed => Ok(Completion::Inline),
            BodyExit::Panicked(message) => Err(HarnessError::InlinePanic {
                test: test.name().to_string(),
                message,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_returns_control_after_failure() {
        let mut channel = Channel::create().unwrap();
        let test = TestFunction::new("fails", |ctx| ctx.fail_now("inline boom"));

        let completion = InlineIsolator.execute(&test, &channel).unwrap();

        assert_eq!(completion, Completion::Inline);
        assert_eq!(channel.receive_failure().unwrap().as_deref(), Some("inline boom"));
    }

    #[test]
    fn test_inline_stray_panic_is_fatal() {
        let channel = Channel::create().unwrap();
        let test = TestFunction::new("panics", |_| panic!("index out of bounds"));

        let err = InlineIsolator.execute(&test, &channel).unwrap_err();

        assert!(matches!(
            err,
            HarnessError::InlinePanic { ref test, ref message } if test == "panics" && message == "index out of bounds"
        ));
    }

    #[test]
    fn test_fork_decodes_exit_codes() {
        let channel = Channel::create().unwrap();
        let passes = TestFunction::new("passes", |_| {});
        let fails = TestFunction::new("fails", |ctx| ctx.fail_now("x"));
        let exits = TestFunction::new("exits", |_| std::process::exit(4));

        assert_eq!(
            ForkIsolator.execute(&passes, &channel).unwrap(),
            Completion::Forked(Termination::Exited(0))
        );
        assert_eq!(
            ForkIsolator.execute(&fails, &channel).unwrap(),
            Completion::Forked(Termination::Exited(FAILURE_EXIT_CODE))
        );
        assert_eq!(
            ForkIsolator.execute(&exits, &channel).unwrap(),
            Completion::Forked(Termination::Exited(4))
        );
    }

    #[test]
    fn test_fork_decodes_signals() {
        use nix::sys::signal::{Signal, raise};

        let channel = Channel::create().unwrap();
        let killed = TestFunction::new("killed", |_| {
            let _ = raise(Signal::SIGKILL);
        });

        assert_eq!(
            ForkIsolator.execute(&killed, &channel).unwrap(),
            Completion::Forked(Termination::Signaled(Signal::SIGKILL as i32))
        );
    }

    #[test]
    fn test_fork_child_panic_exits_without_message() {
        let mut channel = Channel::create().unwrap();
        let test = TestFunction::new("panics", |_| panic!("stray"));

        let completion = ForkIsolator.execute(&test, &channel).unwrap();

        assert_eq!(completion, Completion::Forked(Termination::Exited(PANIC_EXIT_CODE)));
        assert_eq!(channel.receive_failure().unwrap(), None);
    }
}
