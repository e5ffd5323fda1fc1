pub mod layout;
pub mod prediction;

pub use layout::Layout;
pub use prediction::Prediction;
