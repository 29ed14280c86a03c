pub mod error;
pub mod misc;
pub mod processor;
pub mod scaler;
pub mod split;
pub mod table;
