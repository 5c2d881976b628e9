//! Delivery cache and batcher
//!
//! Holds admitted readings in a bounded ring buffer and hands them to a
//! time-series sink in batches. A failed write leaves the cache untouched
//! for the next attempt; sustained failure loses only the oldest entries.

pub mod batcher;
pub mod cache;

pub use batcher::*;
pub use cache::*;

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Sink {sink} write failed: {message}")]
    SinkFailed { sink: String, message: String },

    #[error("Sink {sink} did not answer within {timeout:?}")]
    Timeout { sink: String, timeout: Duration },

    #[error("Invalid delivery settings: {0}")]
    InvalidSettings(String),
}

pub type DeliveryResult<T> = Result<T, DeliveryError>;
