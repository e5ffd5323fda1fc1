use serde::{Serialize, Deserialize};

use crate::activation::activation::Scores;
use crate::error::Result;
use crate::loss::loss_type::LossType;

/// A serializable description of which loss to compute and how to read the
/// predictions it is fed.
///
/// Fields:
/// - `loss`          — cross-entropy or focal (with gamma and variant)
/// - `class_weights` — optional per-class weights, one per class
/// - `scores`        — whether predictions are logits or probabilities
///
/// Saved to / loaded from JSON so a loss setup can be reused across runs:
///
/// ```json
/// { "loss": { "type": "focal", "gamma": 2.0 }, "class_weights": [0.25, 1.0] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossConfig {
    pub loss: LossType,
    #[serde(default)]
    pub class_weights: Option<Vec<f64>>,
    #[serde(default)]
    pub scores: Scores,
}

impl LossConfig {
    pub fn new(loss: LossType) -> Self {
        LossConfig {
            loss,
            class_weights: None,
            scores: Scores::default(),
        }
    }

    pub fn with_class_weights(mut self, weights: Vec<f64>) -> Self {
        self.class_weights = Some(weights);
        self
    }

    pub fn with_scores(mut self, scores: Scores) -> Self {
        self.scores = scores;
        self
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `LossConfig` from a JSON file.
    pub fn load_json(path: &str) -> Result<LossConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl Default for LossConfig {
    fn default() -> Self {
        LossConfig::new(LossType::CrossEntropy)
    }
}
