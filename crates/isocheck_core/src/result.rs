//! Structured per-test results.

use std::fmt;

use crate::checkpoint::Checkpoint;
use crate::classify::Outcome;

/// Three-way classification of one executed test function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// The body completed and no assertion failed.
    Pass,
    /// The body reported a failure message through the channel.
    Failure,
    /// The executing context ended without reporting (signal, or nonzero exit with no message).
    Error,
}

impl Classification {
    /// One-letter code used in textual reports (`P`, `F`, `E`).
    pub fn short_code(self) -> &'static str {
        match self {
            Classification::Pass => "P",
            Classification::Failure => "F",
            Classification::Error => "E",
        }
    }

    pub fn is_pass(self) -> bool {
        self == Classification::Pass
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Classification::Pass => "pass",
            Classification::Failure => "failure",
            Classification::Error => "error",
        };
        f.write_str(name)
    }
}

/// Result of running exactly one test function.
///
/// Immutable after construction; the runner's result log owns every instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    test_case: String,
    test_name: String,
    classification: Classification,
    message: String,
    checkpoint: Checkpoint,
}

impl TestResult {
    /// Merge a classified outcome with the checkpoint captured for the same execution.
    ///
    /// ## Parameters
    /// - `test_case`: name of the enclosing test case.
    /// - `test_name`: name of the executed test function.
    /// - `outcome`: classification and message from the classifier.
    /// - `checkpoint`: last location received from the channel (or the unknown sentinel).
    pub fn new(
        test_case: impl Into<String>,
        test_name: impl Into<String>,
        outcome: Outcome,
        checkpoint: Checkpoint,
    ) -> Self {
        Self {
            test_case: test_case.into(),
            test_name: test_name.into(),
            classification: outcome.classification,
            message: outcome.message,
            checkpoint,
        }
    }

    pub fn test_case(&self) -> &str {
        &self.test_case
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    pub fn file(&self) -> &str {
        &self.checkpoint.file
    }

    pub fn line(&self) -> i32 {
        self.checkpoint.line
    }

    pub fn is_pass(&self) -> bool {
        self.classification.is_pass()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_exposes_outcome_and_location() {
        let result = TestResult::new(
            "Core",
            "test_div",
            Outcome::failure("division off by one"),
            Checkpoint::new("src/div.rs", 17),
        );

        assert_eq!(result.test_case(), "Core");
        assert_eq!(result.test_name(), "test_div");
        assert_eq!(result.classification(), Classification::Failure);
        assert_eq!(result.message(), "division off by one");
        assert_eq!(result.file(), "src/div.rs");
        assert_eq!(result.line(), 17);
        assert!(!result.is_pass());
    }

    #[test]
    fn test_short_codes() {
        assert_eq!(Classification::Pass.short_code(), "P");
        assert_eq!(Classification::Failure.short_code(), "F");
        assert_eq!(Classification::Error.short_code(), "E");
    }
}
