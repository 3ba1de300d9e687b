//! Execution coordination over a shared model handle.
//!
//! One immutable `BackendModel` is shared by every caller; per-call scratch
//! comes from a bounded [`ContextPool`], and [`Coordinator::run_batch`]
//! partitions a batch across a fixed-size worker pool while keeping the
//! result sequence index-aligned with the request sequence.

pub mod context;
pub mod coordinator;
pub mod error;
pub mod request;

pub use context::*;
pub use coordinator::*;
pub use error::*;
pub use request::*;
