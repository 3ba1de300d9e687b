use std::time::Duration;

use inferpool_core::{ExecuteError, LoadError, ValidationError};
use thiserror::Error;

/// Per-request outcome errors. Each batch slot carries its own; a failed
/// slot never aborts or contaminates its siblings.
#[derive(Debug, Error)]
pub enum InferError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Execution(#[from] ExecuteError),

    /// The context pool stayed empty past the configured wait. Surfaced as
    /// an error instead of blocking indefinitely so callers can apply
    /// backpressure upstream.
    #[error("no execution context became free within {waited:?}")]
    ContextsExhausted { waited: Duration },
}

/// Coordinator construction failures.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("worker pool must have at least one worker")]
    NoWorkers,

    #[error("context pool must hold at least one context")]
    NoContexts,

    /// The outer worker pool multiplied by the model's intra-call thread
    /// budget exceeds the host's execution units.
    #[error(
        "nested parallelism budget exceeded: {workers} workers x {intra_threads} \
         intra-op threads > {available} available units"
    )]
    Oversubscribed {
        workers: usize,
        intra_threads: usize,
        available: usize,
    },

    #[error("failed to create execution context: {0}")]
    Context(#[from] LoadError),
}
