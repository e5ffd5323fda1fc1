#![allow(dead_code)]

use ferrite_loss::{Prediction, Target};
use ndarray::{Array, ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Relative closeness with an absolute fallback near zero.
pub fn close(a: f64, b: f64, rel: f64) -> bool {
    (a - b).abs() <= rel * a.abs().max(b.abs()).max(1e-12)
}

/// Binary probability predictions `[N]` with every target equal to class 1.
pub fn binary_positive(probs: &[f64]) -> (Prediction, Target) {
    let pred = Prediction::probabilities(Array::from_vec(probs.to_vec()).into_dyn()).unwrap();
    let target = Target::indices(Array::from_elem(probs.len(), 1usize).into_dyn());
    (pred, target)
}

/// Random logits of the given shape in `[-8, 8)`.
pub fn random_logits(rng: &mut StdRng, shape: &[usize]) -> ArrayD<f64> {
    Array::from_shape_fn(IxDyn(shape), |_| rng.gen_range(-8.0..8.0))
}

/// Random class ids of the given unit shape.
pub fn random_labels(rng: &mut StdRng, unit_shape: &[usize], classes: usize) -> ArrayD<usize> {
    Array::from_shape_fn(IxDyn(unit_shape), |_| rng.gen_range(0..classes))
}
