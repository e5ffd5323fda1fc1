pub mod activation;

pub use activation::{floor_zero, sigmoid, ActivationFunction, Scores, PROB_FLOOR, ROW_SUM_TOLERANCE};
