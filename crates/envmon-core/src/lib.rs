//! Core data types, validation and comfort analysis for envmon
//!
//! This crate provides the reading model shared by acquisition, delivery
//! and presentation, plus the pure functions that judge a reading.

pub mod analyzer;
pub mod pipeline;
pub mod rollups;
pub mod types;
pub mod units;
pub mod validate;

pub use analyzer::*;
pub use pipeline::*;
pub use rollups::*;
pub use types::*;
pub use units::*;
pub use validate::*;
