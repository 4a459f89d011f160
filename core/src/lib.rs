pub mod dictionary;
pub mod error;
pub mod normalize;
pub mod protocol;
