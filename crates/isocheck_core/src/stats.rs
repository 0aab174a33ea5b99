//! Aggregated run statistics.

use crate::result::Classification;

/// Counters derived from the result log, updated together with each recorded result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestStats {
    /// Number of test functions executed.
    pub checked: usize,
    /// Number classified as `Failure`.
    pub failed: usize,
    /// Number classified as `Error`.
    pub errors: usize,
}

impl TestStats {
    pub fn record(&mut self, classification: Classification) {
        self.checked += 1;
        match classification {
            Classification::Pass => {}
            Classification::Failure => self.failed += 1,
            Classification::Error => self.errors += 1,
        }
    }

    /// Failures plus errors.
    pub fn ntests_failed(&self) -> usize {
        self.failed + self.errors
    }

    pub fn passed(&self) -> usize {
        self.checked - self.ntests_failed()
    }

    /// Whole-number percentage of passing tests, truncated.
    ///
    /// ## Notes
    /// - Returns 100 when nothing failed, including the zero-tests case.
    pub fn percent_passed(&self) -> usize {
        if self.ntests_failed() == 0 {
            return 100;
        }
        self.passed() * 100 / self.checked
    }
}
