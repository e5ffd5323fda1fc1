use ndarray::{Array1, ArrayView1};

use crate::error::{LossError, Result};

/// Per-class multiplicative weights, indexed by class id.
///
/// Weights need not sum to 1. Each unit's loss is scaled by the weight of
/// its *true* class, looked up by index.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassWeights {
    weights: Vec<f64>,
}

impl ClassWeights {
    pub fn new(weights: Vec<f64>) -> Result<ClassWeights> {
        if let Some((class, w)) = weights.iter().enumerate().find(|(_, w)| !w.is_finite() || **w < 0.0) {
            return Err(LossError::InvalidConfig(format!(
                "class weight {w} for class {class} must be finite and >= 0"
            )));
        }
        Ok(ClassWeights { weights })
    }

    /// Fails unless there is exactly one weight per class.
    pub fn check_classes(&self, classes: usize) -> Result<()> {
        if self.weights.len() != classes {
            return Err(LossError::InvalidConfig(format!(
                "{} class weights given for {classes} classes",
                self.weights.len()
            )));
        }
        Ok(())
    }

    /// Weight of each unit's true class. Callers run `check_classes` first,
    /// so every id indexes a weight.
    pub(crate) fn lookup(&self, true_classes: ArrayView1<'_, usize>) -> Array1<f64> {
        true_classes.mapv(|class| self.weights[class])
    }

    /// Scales every unit's loss by its true-class weight.
    pub(crate) fn apply(&self, losses: &mut Array1<f64>, true_classes: ArrayView1<'_, usize>) {
        *losses *= &self.lookup(true_classes);
    }
}
