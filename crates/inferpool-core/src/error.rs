use thiserror::Error;

use crate::DType;

/// Failures while turning a model source into a loaded handle. Fatal to
/// construction; never retried automatically.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error reading model source: {0}")]
    Io(#[from] std::io::Error),

    /// The source bytes do not parse as a model graph.
    #[error("malformed model: {0}")]
    Malformed(String),

    /// The graph parses but uses operators or IO the backend cannot run.
    #[error("unsupported model: {0}")]
    Unsupported(String),

    /// The requested device cannot be used. Loading fails outright rather
    /// than silently falling back to another device.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Per-request input rejection against the model signature. Isolated to the
/// offending request; sibling requests in a batch are unaffected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing input `{name}`")]
    MissingInput { name: String },

    #[error("unknown input `{name}`")]
    UnknownInput { name: String },

    #[error("duplicate input `{name}`")]
    DuplicateInput { name: String },

    #[error("input `{name}`: expected dtype {expected}, got {actual}")]
    DTypeMismatch {
        name: String,
        expected: DType,
        actual: DType,
    },

    #[error("input `{name}`: expected rank {expected}, got {actual}")]
    RankMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("input `{name}`: axis {axis} expects size {expected}, got {actual}")]
    ShapeMismatch {
        name: String,
        axis: usize,
        expected: usize,
        actual: usize,
    },

    #[error("input `{name}`: axis {axis} must be non-zero at execution time")]
    ZeroDim { name: String, axis: usize },

    #[error("input `{name}`: buffer holds {actual} bytes, shape and dtype require {expected}")]
    ByteLenMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Device or runtime fault raised while executing a call. Reported on the
/// affected request only; retry policy belongs to the caller.
#[derive(Clone, Debug, Error)]
pub enum ExecuteError {
    #[error("invalid execution input: {0}")]
    InvalidInput(String),

    #[error("unsupported at execution: {0}")]
    Unsupported(String),

    #[error("backend fault: {0}")]
    Fault(String),
}
