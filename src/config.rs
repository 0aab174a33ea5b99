//! Runner configuration.
//!
//! The environment is consulted only by [`RunnerConfig::from_env`], which belongs at the composition boundary
//! (the CLI or a test binary's `main`). The runner itself never reads the environment.

use std::env;

use isocheck_core::{FORK_ENV_VAR, ForkMode};

/// Configuration threaded into a [`Runner`](crate::Runner) at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Fork mode chosen by the environment or the caller; `None` falls back to [`ForkMode::Fork`].
    pub fork_mode: Option<ForkMode>,
}

impl RunnerConfig {
    /// Read the fork-mode toggle from the process environment, once.
    pub fn from_env() -> Self {
        let value = env::var(FORK_ENV_VAR).ok();
        let fork_mode = ForkMode::from_env_value(value.as_deref());
        tracing::debug!(var = FORK_ENV_VAR, value = ?value, ?fork_mode, "resolved fork mode from environment");
        Self {
            fork_mode: Some(fork_mode),
        }
    }

    pub fn with_fork_mode(mut self, mode: ForkMode) -> Self {
        self.fork_mode = Some(mode);
        self
    }
}
