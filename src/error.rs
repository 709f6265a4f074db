//! Error types.
//!
//! - `FitError` is the library error: everything the fitter, the minimizer and
//!   the IO helpers can fail with.
//! - `AppError` is the binary boundary: a message plus the process exit code.

/// Errors raised while preparing or running a fit.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    /// A flat array cannot be reshaped into `(n_samples, channels)`.
    #[error("cannot reshape {len} values into rows of {channels} channels")]
    ShapeMismatch { len: usize, channels: usize },

    /// The model output and the observed data disagree in length.
    #[error("model returned {actual} values but the data has {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    /// An internal assumption was broken. This is a programming error, not a data error.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Caller-supplied arguments are unusable (empty guess, bad bounds, negative weights, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The model function itself failed.
    #[error("model evaluation failed: {0}")]
    Model(String),

    /// The objective produced a non-finite value where a finite one is required.
    #[error("non-finite value: {0}")]
    NonFinite(String),
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let exit_code = match err {
            FitError::InvalidInput(_) => 2,
            _ => 3,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
