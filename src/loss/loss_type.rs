use serde::{Serialize, Deserialize};

use crate::error::{LossError, Result};

/// Which terms a focal loss sums per unit.
///
/// - `TrueClassOnly` — `-(1 - p_t)^γ · log(p_t)`; the probability mass on
///   wrong classes only matters through `p_t`.
/// - `AllClasses`    — sums `-(1 - q_c)^γ · log(q_c)` over every class, with
///   `q_c = p_c` for the true class and `1 - p_c` otherwise. Never smaller
///   than `TrueClassOnly`; residual mass on wrong classes is penalized too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocalVariant {
    #[default]
    TrueClassOnly,
    AllClasses,
}

/// Selects the loss formula an evaluator applies.
///
/// - `CrossEntropy` — `-log(p_t)` per unit.
/// - `Focal`        — cross-entropy scaled by `(1 - p_t)^gamma`; `gamma = 0`
///   gives back cross-entropy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum LossType {
    CrossEntropy,
    Focal {
        gamma: f64,
        #[serde(default)]
        variant: FocalVariant,
    },
}

impl LossType {
    pub fn focal(gamma: f64) -> LossType {
        LossType::Focal { gamma, variant: FocalVariant::TrueClassOnly }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            LossType::CrossEntropy => Ok(()),
            LossType::Focal { gamma, .. } if gamma.is_finite() && *gamma >= 0.0 => Ok(()),
            LossType::Focal { gamma, .. } => Err(LossError::InvalidConfig(format!(
                "gamma must be a finite value >= 0, got {gamma}"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LossType::CrossEntropy => "cross_entropy",
            LossType::Focal { variant: FocalVariant::TrueClassOnly, .. } => "focal",
            LossType::Focal { variant: FocalVariant::AllClasses, .. } => "focal_all_classes",
        }
    }
}
