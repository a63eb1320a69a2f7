//! JobGuard Classifier
//!
//! Job-posting fraud classification on top of Candle.
//!
//! The pipeline runs leaf-first:
//! - [`tokenizer`]: text to token ids and attention mask (truncation and
//!   padding supplied by the model)
//! - [`engine`]: forward pass of the sequence-classification model
//! - [`scoring`]: softmax and argmax over the two classes
//! - [`pipeline`]: validation, the stages above, and result assembly
//!
//! [`model_loader`] builds the tokenizer and engine from a local model
//! directory once, at startup.

pub mod engine;
pub mod model_config;
pub mod model_loader;
pub mod pipeline;
pub mod scoring;
pub mod tokenizer;

pub use engine::{BertEngine, InferenceEngine, RobertaEngine};
pub use model_config::{Architecture, ModelArtifacts, ModelDescriptor};
pub use model_loader::{DeviceType, LoadedModel, ModelOptions, ModelProvider};
pub use pipeline::{BlockingPredictor, FraudPipeline, Predictor};
pub use scoring::{argmax, normalize, softmax};
pub use tokenizer::{EncodingSettings, PaddingPolicy, TextEncoder, TokenizerAdapter};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::engine::InferenceEngine;
    pub use crate::model_loader::{DeviceType, ModelOptions, ModelProvider};
    pub use crate::pipeline::{BlockingPredictor, FraudPipeline, Predictor};
    pub use crate::tokenizer::{PaddingPolicy, TextEncoder};
}
