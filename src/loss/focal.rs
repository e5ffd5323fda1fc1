use ndarray::ArrayView1;

use crate::activation::floor_zero;
use crate::error::Result;
use crate::loss::loss_type::{FocalVariant, LossType};
use crate::loss::UnitLoss;

/// Focal loss (Lin et al.): cross-entropy scaled by `(1 - p_t)^gamma` so that
/// confidently correct units contribute little.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocalLoss {
    gamma: f64,
    variant: FocalVariant,
}

impl FocalLoss {
    pub fn new(gamma: f64, variant: FocalVariant) -> Result<FocalLoss> {
        LossType::Focal { gamma, variant }.validate()?;
        Ok(FocalLoss { gamma, variant })
    }

    /// `-(1 - q)^γ · log(q)` for the confidence `q` of one outcome.
    ///
    /// `q` is floored before use, so `q = 0` stays finite; `powf(_, 0.0)` is
    /// exactly 1, which keeps `γ = 0` identical to cross-entropy.
    pub fn term(&self, q: f64) -> f64 {
        let q = floor_zero(q);
        -(1.0 - q).powf(self.gamma) * q.ln()
    }
}

impl UnitLoss for FocalLoss {
    fn unit_loss(&self, probs: ArrayView1<'_, f64>, class: usize) -> f64 {
        match self.variant {
            FocalVariant::TrueClassOnly => self.term(probs[class]),
            FocalVariant::AllClasses => probs
                .iter()
                .enumerate()
                .map(|(c, &p)| if c == class { self.term(p) } else { self.term(1.0 - p) })
                .sum(),
        }
    }
}
