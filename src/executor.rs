//! Drive one test function end to end and produce exactly one result.

use isocheck_core::{ForkMode, TestResult, classify_forked, classify_inline};

use crate::channel::Channel;
use crate::error::HarnessResult;
use crate::isolate::{Completion, Isolator, isolator_for};
use crate::suite::TestFunction;

/// Runs single test functions through an [`Isolator`] and classifies what happened.
///
/// The executor performs no formatting or printing; it only talks to the channel of the enclosing test case.
pub struct TestExecutor {
    isolator: Box<dyn Isolator>,
}

impl TestExecutor {
    pub fn new(mode: ForkMode) -> Self {
        Self::with_isolator(isolator_for(mode))
    }

    /// Use a custom isolation strategy.
    pub fn with_isolator(isolator: Box<dyn Isolator>) -> Self {
        Self { isolator }
    }

    /// Execute `test` and return its result.
    ///
    /// ## Parameters
    /// - `channel`: the channel of the enclosing test case, reused across its test functions.
    /// - `test_case`: name recorded on the result.
    /// - `test`: the test function to execute.
    ///
    /// ## Notes
    /// - Both the checkpoint and the failure slot are drained on every call, whatever the outcome, so nothing
    ///   carries over to the next test function.
    pub fn run(&self, channel: &mut Channel, test_case: &str, test: &TestFunction) -> HarnessResult<TestResult> {
        tracing::debug!(test_case, test = test.name(), "running test function");

        let completion = self.isolator.execute(test, channel)?;
        let checkpoint = channel.receive_checkpoint()?;
        let failure = channel.receive_failure()?;

        let outcome = match completion {
            Completion::Forked(termination) => classify_forked(termination, failure),
            Completion::Inline => classify_inline(failure),
        };

        tracing::debug!(
            test_case,
            test = test.name(),
            classification = %outcome.classification,
            location = %checkpoint,
            "test function finished"
        );
        Ok(TestResult::new(test_case, test.name(), outcome, checkpoint))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{fail, mark_point};
    use isocheck_core::{Classification, Termination};

    /// Isolator that pretends the body terminated a fixed way, after running it inline.
    struct Scripted(Termination);

    impl Isolator for Scripted {
        fn execute(&self, test: &TestFunction, channel: &Channel) -> HarnessResult<Completion> {
            let _ = crate::isolate::InlineIsolator.execute(test, channel)?;
            Ok(Completion::Forked(self.0))
        }
    }

    #[test]
    fn test_inline_failure_carries_message_and_checkpoint() {
        let mut channel = Channel::create().unwrap();
        let executor = TestExecutor::new(ForkMode::NoFork);
        let line = line!() + 1;
        let test = TestFunction::new("t", |ctx| fail!(ctx, "boom"));

        let result = executor.run(&mut channel, "Case", &test).unwrap();

        assert_eq!(result.classification(), Classification::Failure);
        assert_eq!(result.message(), "boom");
        assert_eq!(result.file(), file!());
        assert_eq!(result.line(), line as i32);
        assert_eq!(result.test_case(), "Case");
        assert_eq!(result.test_name(), "t");
    }

    #[test]
    fn test_signal_keeps_last_checkpoint() {
        let mut channel = Channel::create().unwrap();
        let executor = TestExecutor::with_isolator(Box::new(Scripted(Termination::Signaled(11))));
        let test = TestFunction::new("t", |ctx| mark_point!(ctx));

        let result = executor.run(&mut channel, "Case", &test).unwrap();

        assert_eq!(result.classification(), Classification::Error);
        assert_eq!(result.message(), "Received signal 11");
        assert_eq!(result.file(), file!());
    }

    #[test]
    fn test_failure_is_not_leaked_into_next_pass() {
        let mut channel = Channel::create().unwrap();
        let executor = TestExecutor::with_isolator(Box::new(Scripted(Termination::Exited(0))));
        // Exit 0 classifies as Pass without consulting the message, which must still be drained.
        let sloppy = TestFunction::new("sloppy", |ctx| {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| ctx.fail_now("swallowed")));
        });
        let clean = TestFunction::new("clean", |_| {});

        assert!(executor.run(&mut channel, "Case", &sloppy).unwrap().is_pass());

        let inline = TestExecutor::new(ForkMode::NoFork);
        let result = inline.run(&mut channel, "Case", &clean).unwrap();
        assert!(result.is_pass());
        assert!(result.checkpoint().is_unknown());
    }
}
