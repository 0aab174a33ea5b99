//! Checkpoint and assertion primitives available to test bodies.
//!
//! Every test body receives a [`TestContext`]. Bodies normally use the macros rather than the methods so the
//! call-site file and line are captured:
//!
//! ```rust,no_run
//! use isocheck::{TestContext, fail, fail_unless, mark_point};
//!
//! fn test_parse(ctx: &TestContext) {
//!     mark_point!(ctx);
//!     let parsed: i32 = "42".parse().unwrap_or(0);
//!     fail_unless!(ctx, parsed == 42, "expected 42, got {}", parsed);
//!     if parsed < 0 {
//!         fail!(ctx, "negative");
//!     }
//! }
//! ```
//!
//! A failing assertion sends its message over the channel and then unwinds to the single point that wraps the
//! body invocation. It never returns into the test body.

use std::panic;

use crate::channel::Sender;

/// Unwind payload raised by [`TestContext::fail_now`].
#[derive(Debug)]
pub(crate) struct TestFailed;

/// Whether an unwind payload is a reported test failure (as opposed to a stray panic).
pub(crate) fn is_test_failure(payload: &(dyn std::any::Any + Send)) -> bool {
    payload.is::<TestFailed>()
}

/// Handle passed to a running test body.
#[derive(Debug)]
pub struct TestContext {
    sender: Sender,
}

impl TestContext {
    pub(crate) fn new(sender: Sender) -> Self {
        Self { sender }
    }

    /// Record the most recently reached source location.
    pub fn record_checkpoint(&self, file: &str, line: u32) {
        let line = i32::try_from(line).unwrap_or(i32::MAX);
        // The channel is lossy by contract; a lost checkpoint only degrades crash diagnostics.
        let _ = self.sender.send_checkpoint(file, line);
    }

    /// Report `message` as this test's failure and leave the test body.
    #[cold]
    pub fn fail_now(&self, message: impl Into<String>) -> ! {
        let message = message.into();
        let _ = self.sender.send_failure(&message);
        panic::resume_unwind(Box::new(TestFailed))
    }
}

/// Record the current source location as the test's checkpoint.
#[macro_export]
macro_rules! mark_point {
    ($ctx:expr) => {
        $crate::TestContext::record_checkpoint(&$ctx, file!(), line!())
    };
}

/// Fail the test unless the condition holds. The call site is recorded as a checkpoint either way.
#[macro_export]
macro_rules! fail_unless {
    ($ctx:expr, $cond:expr $(,)?) => {
        $crate::fail_unless!($ctx, $cond, "Assertion '{}' failed", stringify!($cond))
    };
    ($ctx:expr, $cond:expr, $($arg:tt)+) => {{
        let ctx: &$crate::TestContext = &$ctx;
        ctx.record_checkpoint(file!(), line!());
        if !$cond {
            ctx.fail_now(format!($($arg)+));
        }
    }};
}

/// Fail the test if the condition holds.
#[macro_export]
macro_rules! fail_if {
    ($ctx:expr, $cond:expr $(,)?) => {
        $crate::fail_unless!($ctx, !($cond), "Failure '{}' occurred", stringify!($cond))
    };
    ($ctx:expr, $cond:expr, $($arg:tt)+) => {
        $crate::fail_unless!($ctx, !($cond), $($arg)+)
    };
}

/// Unconditionally fail the test at this location.
#[macro_export]
macro_rules! fail {
    ($ctx:expr, $($arg:tt)+) => {{
        let ctx: &$crate::TestContext = &$ctx;
        ctx.record_checkpoint(file!(), line!());
        ctx.fail_now(format!($($arg)+))
    }};
}
