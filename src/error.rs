//! Error types for misorientation analysis

use thiserror::Error;

/// Main error type for misorientation operations
#[derive(Error, Debug)]
pub enum MisoriError {
    #[error("Unknown crystal symmetry family '{0}'")]
    UnknownSymmetryFamily(String),

    #[error("Cannot average an empty set of orientations")]
    EmptyInputSet,

    #[error("Grain {0} has no elements assigned")]
    EmptyGrain(usize),

    #[error("Invalid orientation: {0}")]
    InvalidOrientation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Frame {frame} out of range (0..={max})")]
    FrameOutOfRange { frame: i64, max: usize },

    #[error("Data with key '{0}' does not exist")]
    KeyNotFound(String),

    #[error("Data with key '{0}' already exists")]
    DuplicateKey(String),

    #[error("Data with key '{0}' has the wrong array kind")]
    WrongArrayKind(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for misorientation operations
pub type MisoriResult<T> = Result<T, MisoriError>;
