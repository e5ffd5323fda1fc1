pub mod cross_entropy;
pub mod evaluator;
pub mod focal;
pub mod loss_type;
pub mod reduction;
pub mod weights;

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

use crate::error::Result;
use crate::labels::encoder::Target;
use crate::math::prediction::Prediction;

pub use cross_entropy::CrossEntropyLoss;
pub use evaluator::{LossEvaluator, LossReport};
pub use focal::FocalLoss;
pub use loss_type::{FocalVariant, LossType};
pub use weights::ClassWeights;

/// A loss computed independently for every unit from its probability row
/// and true class. Weighting and reduction happen afterwards.
pub trait UnitLoss {
    fn unit_loss(&self, probs: ArrayView1<'_, f64>, class: usize) -> f64;

    /// Applies `unit_loss` to every row of a `[units, classes]` matrix.
    fn unit_losses(&self, probs: ArrayView2<'_, f64>, classes: ArrayView1<'_, usize>) -> Array1<f64> {
        probs
            .axis_iter(Axis(0))
            .zip(classes.iter())
            .map(|(row, &class)| self.unit_loss(row, class))
            .collect()
    }
}

/// Mean cross-entropy over every unit, optionally weighted by true class.
pub fn cross_entropy_loss(prediction: &Prediction, target: &Target, class_weights: Option<&[f64]>) -> Result<f64> {
    LossEvaluator::new(LossType::CrossEntropy, class_weights.map(<[f64]>::to_vec))?
        .evaluate(prediction, target)
}

/// Mean focal loss over every unit, optionally weighted by true class.
pub fn focal_loss(
    prediction: &Prediction,
    target: &Target,
    gamma: f64,
    class_weights: Option<&[f64]>,
    variant: FocalVariant,
) -> Result<f64> {
    LossEvaluator::new(LossType::Focal { gamma, variant }, class_weights.map(<[f64]>::to_vec))?
        .evaluate(prediction, target)
}
