pub mod batch;

pub use batch::{BatchFile, TargetFile};
