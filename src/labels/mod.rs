pub mod encoder;

pub use encoder::{decode, decode_target, encode, encode_target, validate_one_hot, Target};
