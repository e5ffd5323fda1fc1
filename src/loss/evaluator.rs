use ndarray::{Array1, ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::loss_config::LossConfig;
use crate::error::Result;
use crate::labels::encoder::Target;
use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::loss::focal::FocalLoss;
use crate::loss::loss_type::LossType;
use crate::loss::reduction;
use crate::loss::weights::ClassWeights;
use crate::loss::UnitLoss;
use crate::math::layout::Layout;
use crate::math::prediction::Prediction;

/// Summary of one evaluation, as printed by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LossReport {
    /// `cross_entropy`, `focal` or `focal_all_classes`.
    pub loss: String,
    /// Mean over all units.
    pub mean: f64,
    /// Number of units averaged.
    pub units: usize,
    /// Mean of each image (or each example) in unit order.
    pub per_image: Vec<f64>,
    /// Fraction of the summed loss carried by each unit, flattened.
    pub shares: Vec<f64>,
}

/// Computes one configured loss over predictions and targets.
///
/// The loss formula and class weights are fixed at construction and
/// validated there; each call validates shapes and labels before doing any
/// arithmetic, and keeps no state between calls.
#[derive(Debug, Clone)]
pub struct LossEvaluator {
    loss: LossType,
    weights: Option<ClassWeights>,
}

struct UnitLosses {
    values: Array1<f64>,
    unit_shape: Vec<usize>,
    layout: Layout,
}

impl LossEvaluator {
    pub fn new(loss: LossType, class_weights: Option<Vec<f64>>) -> Result<LossEvaluator> {
        loss.validate()?;
        let weights = class_weights.map(ClassWeights::new).transpose()?;
        Ok(LossEvaluator { loss, weights })
    }

    pub fn from_config(config: &LossConfig) -> Result<LossEvaluator> {
        LossEvaluator::new(config.loss, config.class_weights.clone())
    }

    fn unit_losses(&self, prediction: &Prediction, target: &Target) -> Result<UnitLosses> {
        prediction.check_not_empty()?;
        let layout = prediction.layout();
        let unit_shape = prediction.unit_shape();
        let classes = prediction.classes();

        if let Some(weights) = &self.weights {
            weights.check_classes(classes)?;
        }
        let true_classes = target.true_classes(layout, &unit_shape, classes)?;
        let probs = prediction.probability_rows()?;

        let zeros = probs.iter().filter(|p| **p == 0.0).count();
        if zeros > 0 {
            trace!(zeros, "zero probabilities will be floored before the logarithm");
        }

        let mut values = match self.loss {
            LossType::CrossEntropy => CrossEntropyLoss.unit_losses(probs.view(), true_classes.view()),
            LossType::Focal { gamma, variant } => {
                FocalLoss::new(gamma, variant)?.unit_losses(probs.view(), true_classes.view())
            }
        };
        if let Some(weights) = &self.weights {
            weights.apply(&mut values, true_classes.view());
        }

        debug!(
            loss = self.loss.name(),
            ?layout,
            units = values.len(),
            classes,
            weighted = self.weights.is_some(),
            "computed unit losses"
        );
        Ok(UnitLosses { values, unit_shape, layout })
    }

    /// Mean loss over every unit of the prediction.
    pub fn evaluate(&self, prediction: &Prediction, target: &Target) -> Result<f64> {
        let units = self.unit_losses(prediction, target)?;
        reduction::flat_mean(units.values.view().into_dyn())
    }

    /// Loss of every unit, shaped like the prediction without its class axis.
    pub fn per_unit(&self, prediction: &Prediction, target: &Target) -> Result<ArrayD<f64>> {
        let units = self.unit_losses(prediction, target)?;
        Ok(units.values.into_shape(IxDyn(&units.unit_shape))?)
    }

    /// Mean loss of each image of a batch (one entry per example for the
    /// `Examples` layout).
    pub fn per_image(&self, prediction: &Prediction, target: &Target) -> Result<Array1<f64>> {
        let units = self.unit_losses(prediction, target)?;
        let (groups, per_group) = units.layout.groups(&units.unit_shape);
        reduction::per_image_means(units.values.view(), groups, per_group)
    }

    /// Fraction of the summed loss carried by each unit.
    pub fn contributions(&self, prediction: &Prediction, target: &Target) -> Result<ArrayD<f64>> {
        let per_unit = self.per_unit(prediction, target)?;
        Ok(reduction::contributions(per_unit.view()))
    }

    pub fn report(&self, prediction: &Prediction, target: &Target) -> Result<LossReport> {
        let units = self.unit_losses(prediction, target)?;
        let (groups, per_group) = units.layout.groups(&units.unit_shape);
        let per_image = reduction::per_image_means(units.values.view(), groups, per_group)?;
        let values = units.values.into_dyn();
        Ok(LossReport {
            loss: self.loss.name().to_string(),
            mean: reduction::flat_mean(values.view())?,
            units: values.len(),
            per_image: per_image.to_vec(),
            shares: reduction::contributions(values.view()).iter().copied().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LossError;
    use crate::loss::loss_type::FocalVariant;
    use ndarray::{array, Array};

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn binary_examples_cross_entropy() {
        let pred = Prediction::probabilities(array![0.9, 0.1].into_dyn()).unwrap();
        let target = Target::indices(array![1, 1].into_dyn());
        let eval = LossEvaluator::new(LossType::CrossEntropy, None).unwrap();
        let per_unit = eval.per_unit(&pred, &target).unwrap();
        assert!(approx(per_unit[[0]], 0.105_360_5, 1e-6));
        assert!(approx(per_unit[[1]], 2.302_585_1, 1e-6));
        let mean = eval.evaluate(&pred, &target).unwrap();
        assert!(approx(mean, (0.105_360_5 + 2.302_585_1) / 2.0, 1e-6));
    }

    #[test]
    fn class_weights_scale_by_true_class() {
        let pred = Prediction::probabilities(array![[0.5, 0.5], [0.5, 0.5]].into_dyn()).unwrap();
        let target = Target::indices(array![0, 1].into_dyn());
        let plain = LossEvaluator::new(LossType::CrossEntropy, None).unwrap();
        let weighted = LossEvaluator::new(LossType::CrossEntropy, Some(vec![1.0, 3.0])).unwrap();
        let per_unit = weighted.per_unit(&pred, &target).unwrap();
        let ln2 = std::f64::consts::LN_2;
        assert!(approx(per_unit[[0]], ln2, 1e-12));
        assert!(approx(per_unit[[1]], 3.0 * ln2, 1e-12));
        assert!(approx(
            weighted.evaluate(&pred, &target).unwrap(),
            2.0 * plain.evaluate(&pred, &target).unwrap(),
            1e-12
        ));
    }

    #[test]
    fn weight_count_must_match_classes() {
        let pred = Prediction::probabilities(array![[0.2, 0.3, 0.5]].into_dyn()).unwrap();
        let target = Target::indices(array![2].into_dyn());
        let eval = LossEvaluator::new(LossType::focal(2.0), Some(vec![1.0, 1.0])).unwrap();
        assert!(matches!(eval.evaluate(&pred, &target), Err(LossError::InvalidConfig(_))));
    }

    #[test]
    fn class_weights_scale_focal_by_true_class() {
        let pred = Prediction::probabilities(array![[0.7, 0.2, 0.1], [0.1, 0.3, 0.6]].into_dyn()).unwrap();
        let target = Target::indices(array![0, 2].into_dyn());
        let weights = [0.5, 1.0, 2.0];
        let term = |q: f64| -(1.0 - q).powf(2.0) * q.ln();

        let only = [term(0.7), term(0.6)];
        let all = [term(0.7) + term(0.8) + term(0.9), term(0.9) + term(0.7) + term(0.6)];
        for (variant, plain) in [(FocalVariant::TrueClassOnly, only), (FocalVariant::AllClasses, all)] {
            let eval = LossEvaluator::new(LossType::Focal { gamma: 2.0, variant }, Some(weights.to_vec())).unwrap();
            let per_unit = eval.per_unit(&pred, &target).unwrap();
            assert!(approx(per_unit[[0]], weights[0] * plain[0], 1e-12), "{variant:?}: {per_unit}");
            assert!(approx(per_unit[[1]], weights[2] * plain[1], 1e-12), "{variant:?}: {per_unit}");
            let mean = eval.evaluate(&pred, &target).unwrap();
            assert!(approx(mean, (weights[0] * plain[0] + weights[2] * plain[1]) / 2.0, 1e-12));
        }
    }

    #[test]
    fn weighted_out_of_range_label_is_an_error() {
        let pred = Prediction::probabilities(array![[0.5, 0.5]].into_dyn()).unwrap();
        let target = Target::indices(array![5].into_dyn());
        let eval = LossEvaluator::new(LossType::focal(2.0), Some(vec![1.0, 2.0])).unwrap();
        assert!(matches!(eval.per_unit(&pred, &target), Err(LossError::InvalidLabel(_))));
    }

    #[test]
    fn construction_validates_config() {
        assert!(LossEvaluator::new(LossType::focal(-2.0), None).is_err());
        assert!(LossEvaluator::new(LossType::CrossEntropy, Some(vec![1.0, -1.0])).is_err());
    }

    #[test]
    fn segmentation_batch_per_image_means() {
        // Two 1x2 images, three classes; image 0 perfectly right, image 1 uniform.
        let mut probs = Array::zeros(IxDyn(&[2, 3, 1, 2]));
        probs[[0, 0, 0, 0]] = 1.0;
        probs[[0, 2, 0, 1]] = 1.0;
        for c in 0..3 {
            for w in 0..2 {
                probs[[1, c, 0, w]] = 1.0 / 3.0;
            }
        }
        let pred = Prediction::probabilities(probs).unwrap();
        let target = Target::indices(array![[[0, 2]], [[1, 1]]].into_dyn());
        let eval = LossEvaluator::new(LossType::CrossEntropy, None).unwrap();

        let per_image = eval.per_image(&pred, &target).unwrap();
        assert_eq!(per_image.len(), 2);
        assert!(approx(per_image[0], 0.0, 1e-12));
        assert!(approx(per_image[1], 3f64.ln(), 1e-12));
        let mean = eval.evaluate(&pred, &target).unwrap();
        assert!(approx(mean, 3f64.ln() / 2.0, 1e-12));
    }

    #[test]
    fn image_logits_with_one_hot_target() {
        // [C=2, H=1, W=2] logits; pixel 0 favours class 1, pixel 1 class 0.
        let pred = Prediction::logits(array![[[0.0, 2.0]], [[2.0, 0.0]]].into_dyn()).unwrap();
        let target = Target::one_hot(array![[[0.0, 1.0]], [[1.0, 0.0]]].into_dyn());
        let eval = LossEvaluator::new(LossType::CrossEntropy, None).unwrap();
        let per_unit = eval.per_unit(&pred, &target).unwrap();
        assert_eq!(per_unit.shape(), &[1, 2]);
        // Both pixels give the labelled class a logit 2 above the other one.
        let p = 1.0 / (1.0 + (-2f64).exp());
        assert!(approx(per_unit[[0, 0]], -p.ln(), 1e-12));
        assert!(approx(per_unit[[0, 1]], -p.ln(), 1e-12));
    }

    #[test]
    fn report_collects_shares() {
        let pred = Prediction::probabilities(array![0.9, 0.1].into_dyn()).unwrap();
        let target = Target::indices(array![1, 1].into_dyn());
        let eval = LossEvaluator::new(
            LossType::Focal { gamma: 2.0, variant: FocalVariant::TrueClassOnly },
            None,
        )
        .unwrap();
        let report = eval.report(&pred, &target).unwrap();
        assert_eq!(report.loss, "focal");
        assert_eq!(report.units, 2);
        assert_eq!(report.per_image.len(), 2);
        assert!(approx(report.shares[0] + report.shares[1], 1.0, 1e-12));
        assert!(report.shares[0] < 0.001);
    }
}
