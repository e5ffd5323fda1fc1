use ndarray::ArrayView1;

use crate::activation::floor_zero;
use crate::loss::UnitLoss;

/// Categorical cross-entropy; binary cross-entropy when there are two classes.
///
/// With a one-hot target the sum `-Σ e_c log p_c` keeps only the true class,
/// so each unit costs `-log p[true_class]`, zero floored first.
pub struct CrossEntropyLoss;

impl UnitLoss for CrossEntropyLoss {
    fn unit_loss(&self, probs: ArrayView1<'_, f64>, class: usize) -> f64 {
        -floor_zero(probs[class]).ln()
    }
}
