use thiserror::Error;

pub type Result<T> = std::result::Result<T, PwmError>;

#[derive(Error, Debug)]
pub enum PwmError {
    #[error("Unknown algorithm: {name}. Valid algorithms: {valid}")]
    UnsupportedAlgorithm { name: String, valid: String },

    #[error("{0}")]
    Validation(String),

    #[error("iteration budget exhausted: produced {produced} of {required} characters")]
    IterationBudgetExhausted { produced: usize, required: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PwmError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
