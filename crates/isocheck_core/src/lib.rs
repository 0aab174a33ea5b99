//! Provide the shared, pure vocabulary of the isocheck harness.
//!
//! This crate is intentionally small and dependency-free. It contains the deterministic pieces that both the
//! execution engine and its reporting layers agree on:
//! - the checkpoint (last source location reached by a running test body),
//! - the structured test result and its three-way classification,
//! - the classifier that turns a raw completion (exit code, signal, failure message) into an outcome,
//! - aggregated run statistics, and
//! - the fork-mode policy and its environment-value parsing.
//!
//! ## Notes
//!
//! - **No IO**, no global state, no process handling. Spawning, waiting and channel traffic live in `isocheck`.

pub mod checkpoint;
pub mod classify;
pub mod mode;
pub mod result;
pub mod stats;

pub use checkpoint::{Checkpoint, UNKNOWN_FILE, UNKNOWN_LINE};
pub use classify::{
    EMPTY_FAILURE_MESSAGE, Outcome, PASS_MESSAGE, Termination, classify_forked, classify_inline, exit_message,
    signal_message,
};
pub use mode::{FORK_ENV_VAR, ForkMode, NO_FORK_VALUE};
pub use result::{Classification, TestResult};
pub use stats::TestStats;
