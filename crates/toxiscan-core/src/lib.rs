//! Toxiscan Core
//!
//! Core types and error handling shared across toxiscan components.
//!
//! This crate provides:
//! - The `PredictionResult` returned for every scored text
//! - Class labels and prediction source tags
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{PredictionResult, PredictionSource, ToxicityLabel};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{PredictionResult, PredictionSource, ToxicityLabel};
}
