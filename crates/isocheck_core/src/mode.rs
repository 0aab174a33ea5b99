//! Fork-mode policy.

/// Environment variable consulted (once, at the composition boundary) for the fork-mode override.
pub const FORK_ENV_VAR: &str = "ISOCHECK_FORK";

/// The single value of [`FORK_ENV_VAR`] that selects no-fork mode.
pub const NO_FORK_VALUE: &str = "no";

/// Execution strategy for test bodies, selected once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForkMode {
    /// Each test function runs in its own forked child process.
    #[default]
    Fork,
    /// Test functions run inline in the runner's own process.
    NoFork,
}

impl ForkMode {
    /// Interpret a raw environment value.
    ///
    /// ## Returns
    /// - (`ForkMode`): `NoFork` for exactly `"no"`, otherwise `Fork` (including unset).
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(NO_FORK_VALUE) => ForkMode::NoFork,
            _ => ForkMode::Fork,
        }
    }

    pub fn is_fork(self) -> bool {
        self == ForkMode::Fork
    }
}
