//! Data preprocessing module
//!
//! Feature standardization applied inside every fitted pipeline.

mod scaler;

pub use scaler::StandardScaler;
