use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::activation::activation::Scores;
use crate::error::{LossError, Result};
use crate::labels::encoder::Target;
use crate::math::layout::Layout;
use crate::math::prediction::Prediction;

/// Ground truth as stored in a batch file, flattened in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetFile {
    /// One class id per unit; shape is the prediction shape minus its class axis.
    Indices(Vec<usize>),
    /// Same layout as the prediction, class axis of length `classes`.
    OneHot(Vec<f64>),
}

/// A prediction/target pair read by the `ferrite-loss` binary.
///
/// ```json
/// {
///   "shape": [2],
///   "prediction": [0.9, 0.1],
///   "target": { "indices": [1, 1] }
/// }
/// ```
///
/// `layout` defaults to the one inferred from the rank; `scores` defaults to
/// whatever the loss config says.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFile {
    pub shape: Vec<usize>,
    pub prediction: Vec<f64>,
    #[serde(default)]
    pub layout: Option<Layout>,
    #[serde(default)]
    pub scores: Option<Scores>,
    pub target: TargetFile,
}

impl BatchFile {
    pub fn load_json(path: &str) -> Result<BatchFile> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Builds the prediction and target tensors. `default_scores` applies when
    /// the file does not say how to read its values.
    pub fn into_inputs(self, default_scores: Scores) -> Result<(Prediction, Target)> {
        let expected: usize = self.shape.iter().product();
        if expected != self.prediction.len() {
            return Err(LossError::ShapeMismatch(format!(
                "shape {:?} needs {expected} prediction values, file has {}",
                self.shape,
                self.prediction.len()
            )));
        }
        let values = ArrayD::from_shape_vec(IxDyn(&self.shape), self.prediction)?;
        let mut prediction = Prediction::new(values, self.scores.unwrap_or(default_scores))?;
        if let Some(layout) = self.layout {
            prediction = prediction.with_layout(layout)?;
        }

        let unit_shape = prediction.unit_shape();
        let target = match self.target {
            TargetFile::Indices(ids) => Target::indices(ArrayD::from_shape_vec(IxDyn(&unit_shape), ids)?),
            TargetFile::OneHot(hot) => {
                let shape = prediction.layout().with_classes(&unit_shape, prediction.classes());
                Target::one_hot(ArrayD::from_shape_vec(IxDyn(&shape), hot)?)
            }
        };
        Ok((prediction, target))
    }
}
