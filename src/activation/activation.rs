use ndarray::{Array2, ArrayViewMut1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{LossError, Result};

/// Probabilities exactly equal to zero are replaced by this value before a
/// logarithm is taken. Only zeros are touched; no additive smoothing.
pub const PROB_FLOOR: f64 = 1e-8;

/// Per-class slack allowed when checking that a caller's probability row
/// sums to 1.
pub const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// How the caller's prediction values are to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scores {
    /// Raw scores; normalized with sigmoid (one channel) or softmax.
    Logits,
    /// Already in `[0, 1]`, each multi-class row summing to 1; used as-is.
    #[default]
    Probabilities,
}

/// The normalization applied along the class axis of a unit row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationFunction {
    /// Single-channel logits: `[1 - σ(x), σ(x)]`.
    Sigmoid,
    /// Multi-channel logits, max-shifted before exponentiating.
    Softmax,
    /// Probabilities passed through (a single channel still expands to `[1 - p, p]`).
    Identity,
}

impl ActivationFunction {
    pub fn for_scores(scores: Scores, channels: usize) -> ActivationFunction {
        match (scores, channels) {
            (Scores::Probabilities, _) => ActivationFunction::Identity,
            (Scores::Logits, 1) => ActivationFunction::Sigmoid,
            (Scores::Logits, _) => ActivationFunction::Softmax,
        }
    }

    /// Turns `[U, channels]` rows into `[U, classes]` probability rows.
    ///
    /// Every value is validated before any of them is transformed. A single
    /// channel always comes back as two columns (negative, positive).
    pub fn normalize(&self, mut rows: Array2<f64>) -> Result<Array2<f64>> {
        match self {
            ActivationFunction::Identity => {
                if let Some(bad) = rows.iter().find(|p| !(0.0..=1.0).contains(*p)) {
                    return Err(LossError::InvalidPrediction(format!(
                        "probability {bad} is outside [0, 1]"
                    )));
                }
                let classes = rows.ncols();
                if classes > 1 {
                    let tolerance = ROW_SUM_TOLERANCE * classes as f64;
                    for (unit, row) in rows.axis_iter(Axis(0)).enumerate() {
                        let sum = row.sum();
                        if (sum - 1.0).abs() > tolerance {
                            return Err(LossError::InvalidPrediction(format!(
                                "probabilities of unit {unit} sum to {sum}, not 1"
                            )));
                        }
                    }
                }
                if classes == 1 {
                    Ok(Array2::from_shape_fn((rows.nrows(), 2), |(i, j)| {
                        let p = rows[[i, 0]];
                        if j == 1 { p } else { 1.0 - p }
                    }))
                } else {
                    Ok(rows)
                }
            }
            ActivationFunction::Sigmoid | ActivationFunction::Softmax => {
                if let Some(bad) = rows.iter().find(|x| !x.is_finite()) {
                    return Err(LossError::InvalidPrediction(format!("logit {bad} is not finite")));
                }
                if *self == ActivationFunction::Sigmoid {
                    // σ(-x) instead of 1 - σ(x) keeps the small side exact.
                    Ok(Array2::from_shape_fn((rows.nrows(), 2), |(i, j)| {
                        let x = rows[[i, 0]];
                        if j == 1 { sigmoid(x) } else { sigmoid(-x) }
                    }))
                } else {
                    for row in rows.axis_iter_mut(Axis(0)) {
                        softmax_in_place(row);
                    }
                    Ok(rows)
                }
            }
        }
    }
}

/// Logistic function, split by sign so `exp` never overflows.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Numerically stable softmax over one unit row.
pub fn softmax_in_place(mut row: ArrayViewMut1<'_, f64>) {
    let max = row.fold(f64::NEG_INFINITY, |m, &x| m.max(x));
    row.mapv_inplace(|x| (x - max).exp());
    let sum = row.sum();
    row.mapv_inplace(|x| x / sum);
}

/// Replaces an exact zero with `PROB_FLOOR`.
pub fn floor_zero(p: f64) -> f64 {
    if p == 0.0 { PROB_FLOOR } else { p }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn sigmoid_is_symmetric_and_saturates_without_overflow() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
        assert_eq!(sigmoid(1000.0), 1.0);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!(sigmoid(-1000.0).is_finite());
    }

    #[test]
    fn softmax_rows_sum_to_one_for_huge_logits() {
        let rows = array![[1000.0, 1001.0, 1002.0], [-5.0, 0.0, 5.0]];
        let probs = ActivationFunction::Softmax.normalize(rows).unwrap();
        for row in probs.rows() {
            assert!(row.iter().all(|p| p.is_finite() && (0.0..=1.0).contains(p)));
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
        // Shift invariance: the first row equals softmax([0, 1, 2]).
        let reference = ActivationFunction::Softmax.normalize(array![[0.0, 1.0, 2.0]]).unwrap();
        for (a, b) in probs.row(0).iter().zip(reference.row(0).iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn single_channel_expands_to_complement_pair() {
        let probs = ActivationFunction::Identity.normalize(array![[0.9], [0.25]]).unwrap();
        assert_eq!(probs.dim(), (2, 2));
        assert!((probs[[0, 0]] - 0.1).abs() < 1e-12);
        assert_eq!(probs[[0, 1]], 0.9);
        assert_eq!(probs[[1, 0]], 0.75);

        let logits = ActivationFunction::Sigmoid.normalize(array![[0.0], [3.0]]).unwrap();
        assert!((logits[[0, 1]] - 0.5).abs() < 1e-12);
        assert!((logits[[1, 0]] + logits[[1, 1]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn picks_activation_from_scores_and_channels() {
        assert_eq!(ActivationFunction::for_scores(Scores::Logits, 1), ActivationFunction::Sigmoid);
        assert_eq!(ActivationFunction::for_scores(Scores::Logits, 4), ActivationFunction::Softmax);
        assert_eq!(ActivationFunction::for_scores(Scores::Probabilities, 1), ActivationFunction::Identity);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let err = ActivationFunction::Identity.normalize(array![[0.5, 1.5]]).unwrap_err();
        assert!(matches!(err, LossError::InvalidPrediction(_)));
        let err = ActivationFunction::Softmax.normalize(array![[f64::NAN, 0.0]]).unwrap_err();
        assert!(matches!(err, LossError::InvalidPrediction(_)));
    }

    #[test]
    fn probability_rows_must_sum_to_one() {
        for bad in [array![[0.9, 0.9, 0.9]], array![[0.0, 0.0, 0.0]], array![[0.2, 0.3, 0.5], [0.5, 0.4, 0.0]]] {
            let err = ActivationFunction::Identity.normalize(bad.clone()).unwrap_err();
            assert!(matches!(err, LossError::InvalidPrediction(_)), "{bad}");
        }
        // Rounding well inside the tolerance is accepted untouched.
        let rows = array![[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0], [0.1, 0.2, 0.7 + 1e-7]];
        assert_eq!(ActivationFunction::Identity.normalize(rows.clone()).unwrap(), rows);
    }

    #[test]
    fn floor_only_touches_zero() {
        assert_eq!(floor_zero(0.0), PROB_FLOOR);
        assert_eq!(floor_zero(0.3), 0.3);
        assert_eq!(floor_zero(1e-12), 1e-12);
    }
}
