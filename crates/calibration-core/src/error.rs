use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("shape mismatch: {left} probabilities vs {right} outcomes")]
    ShapeMismatch { left: usize, right: usize },

    #[error("fit failed: {0}")]
    FitFailed(String),
}
