pub mod error;
pub mod math;
pub mod activation;
pub mod labels;
pub mod loss;
pub mod config;
pub mod io;

// Convenience re-exports
pub use error::{LossError, Result};
pub use math::layout::Layout;
pub use math::prediction::Prediction;
pub use activation::activation::{ActivationFunction, Scores};
pub use labels::encoder::Target;
pub use loss::{cross_entropy_loss, focal_loss, FocalVariant, LossEvaluator, LossReport, LossType};
pub use config::loss_config::LossConfig;
pub use io::batch::BatchFile;
