//! Source locations reported by running test bodies.

use std::fmt;

/// File name used when a test body never recorded a checkpoint.
pub const UNKNOWN_FILE: &str = "unknown";

/// Line number used when a test body never recorded a checkpoint.
pub const UNKNOWN_LINE: i32 = -1;

/// The most recently reached source location inside a running test body.
///
/// Checkpoints are used for crash diagnostics: when a test dies without reporting, its result points at the last
/// location it is known to have reached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checkpoint {
    pub file: String,
    pub line: i32,
}

impl Checkpoint {
    pub fn new(file: impl Into<String>, line: i32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// The `{"unknown", -1}` sentinel.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_FILE, UNKNOWN_LINE)
    }

    pub fn is_unknown(&self) -> bool {
        self.line == UNKNOWN_LINE && self.file == UNKNOWN_FILE
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}
