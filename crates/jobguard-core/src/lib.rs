//! JobGuard Core
//!
//! Core types and error handling shared across JobGuard components.
//!
//! This crate provides:
//! - The request-scoped types of the prediction pipeline (input text,
//!   encoded input, logits, probabilities, result record)
//! - Input validation and result assembly
//! - The error taxonomy used by the classifier and the HTTP layer

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    assemble, validate, EncodedInput, InputText, LogitVector, PredictionLabel, PredictionResult,
    ProbabilityDistribution,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{
        EncodedInput, InputText, LogitVector, PredictionLabel, PredictionResult,
        ProbabilityDistribution,
    };
}
