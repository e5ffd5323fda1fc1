use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LossError>;

/// Everything that can make a loss evaluation fail.
///
/// All variants are raised at call entry, before any numeric work. A zero
/// probability is not an error: it is floored (see `activation::PROB_FLOOR`).
#[derive(Error, Debug)]
pub enum LossError {
    /// Prediction and target shapes are incompatible, or the layout does not
    /// fit the prediction rank.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A class index is out of range, or a one-hot row is not exactly one `1`.
    #[error("invalid label: {0}")]
    InvalidLabel(String),

    /// Bad gamma or class weights.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Non-finite logits, or probabilities outside `[0, 1]`.
    #[error("invalid prediction: {0}")]
    InvalidPrediction(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ndarray::ShapeError> for LossError {
    fn from(err: ndarray::ShapeError) -> Self {
        LossError::ShapeMismatch(err.to_string())
    }
}
