pub mod loss_config;

pub use loss_config::LossConfig;
