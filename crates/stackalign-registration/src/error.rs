//! Error types for registration operations.

use stackalign_core::StackError;
use thiserror::Error;

/// Main error type for registration operations.
///
/// All errors are fatal to the current registration attempt; there is no
/// retry policy inside the crate. Failure propagation is fail-fast with
/// enough context to diagnose (slice index, parameter values).
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Invalid configuration, raised at construction or first use.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A transform that must be invertible is singular.
    #[error("singular transform: {0}")]
    SingularTransform(String),

    /// The residual for a slice pair contains NaN or infinite values.
    #[error("non-finite residual for slice {slice_index} (parameters {parameters:?})")]
    NonFiniteResidual {
        slice_index: usize,
        parameters: Vec<f64>,
    },

    /// The least-squares solve did not converge.
    #[error("solver failed to converge: {0}")]
    ConvergenceFailure(String),

    /// Shape mismatch between related quantities.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Error from the stack containers.
    #[error(transparent)]
    Stack(#[from] StackError),
}

/// Result type for registration operations.
pub type Result<T> = std::result::Result<T, RegistrationError>;

impl RegistrationError {
    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a singular transform error.
    pub fn singular_transform(msg: impl Into<String>) -> Self {
        Self::SingularTransform(msg.into())
    }

    /// Create a convergence failure error.
    pub fn convergence_failure(msg: impl Into<String>) -> Self {
        Self::ConvergenceFailure(msg.into())
    }
}
