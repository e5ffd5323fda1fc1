use ndarray::{Array2, ArrayD};

use crate::activation::activation::{ActivationFunction, Scores};
use crate::error::{LossError, Result};
use crate::math::layout::Layout;

/// A prediction tensor together with how to read it.
///
/// The layout is inferred from the rank unless set with `with_layout`.
#[derive(Debug, Clone)]
pub struct Prediction {
    values: ArrayD<f64>,
    scores: Scores,
    layout: Layout,
}

impl Prediction {
    pub fn new(values: ArrayD<f64>, scores: Scores) -> Result<Prediction> {
        let layout = Layout::infer(values.ndim())?;
        Ok(Prediction { values, scores, layout })
    }

    /// Raw scores, normalized by sigmoid or softmax before any loss.
    pub fn logits(values: ArrayD<f64>) -> Result<Prediction> {
        Prediction::new(values, Scores::Logits)
    }

    /// Values already normalized along the class axis.
    pub fn probabilities(values: ArrayD<f64>) -> Result<Prediction> {
        Prediction::new(values, Scores::Probabilities)
    }

    pub fn with_layout(mut self, layout: Layout) -> Result<Prediction> {
        layout.check_rank(self.values.ndim())?;
        self.layout = layout;
        Ok(self)
    }

    pub fn values(&self) -> &ArrayD<f64> {
        &self.values
    }

    pub fn scores(&self) -> Scores {
        self.scores
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Length of the class axis as stored (1 for binary predictions).
    pub fn channels(&self) -> usize {
        match self.layout.class_axis(self.values.ndim()) {
            Some(axis) => self.values.shape()[axis],
            None => 1,
        }
    }

    /// Number of classes the loss sees: a single channel means two outcomes.
    pub fn classes(&self) -> usize {
        match self.channels() {
            1 => 2,
            c => c,
        }
    }

    pub fn is_binary(&self) -> bool {
        self.channels() == 1
    }

    /// Shape of the prediction with its class axis removed.
    pub fn unit_shape(&self) -> Vec<usize> {
        // Rank was checked against the layout when the prediction was built.
        let mut shape = self.values.shape().to_vec();
        if let Some(axis) = self.layout.class_axis(shape.len()) {
            shape.remove(axis);
        }
        shape
    }

    pub fn units(&self) -> usize {
        self.unit_shape().iter().product()
    }

    pub(crate) fn check_not_empty(&self) -> Result<()> {
        if self.channels() == 0 {
            return Err(LossError::ShapeMismatch("class axis has length 0".into()));
        }
        if self.units() == 0 {
            return Err(LossError::ShapeMismatch("prediction holds no units".into()));
        }
        Ok(())
    }

    /// Normalized `[units, classes]` probability rows.
    pub fn probability_rows(&self) -> Result<Array2<f64>> {
        let rows = self.layout.unit_rows(self.values.view())?;
        ActivationFunction::for_scores(self.scores, rows.ncols()).normalize(rows)
    }
}
