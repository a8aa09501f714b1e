use thiserror::Error;

/// Errors returned by classification and decision operations.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("feature width mismatch: classifier expects {expected}, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("classifier model is not loaded")]
    ModelUnavailable,

    #[error("bad weights artifact: {0}")]
    Artifact(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
