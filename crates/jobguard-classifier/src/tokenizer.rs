//! Tokenizer adapter: text to fixed-shape model input
//!
//! Wraps a Hugging Face `tokenizers::Tokenizer` configured with the model's
//! truncation and padding policy. Truncation always keeps the start of the
//! text; padding goes on the right and is masked out.

use jobguard_core::{EncodedInput, Error, InputText, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokenizers::{
    PaddingDirection, PaddingParams, PaddingStrategy, Tokenizer, TruncationDirection,
    TruncationParams, TruncationStrategy,
};

/// Converts validated text into model input
pub trait TextEncoder: Send + Sync {
    /// Encode a single text (batch size 1)
    fn encode(&self, text: &InputText) -> Result<EncodedInput>;

    /// Longest sequence this encoder produces, special tokens included
    fn max_length(&self) -> usize;
}

/// How short sequences are padded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddingPolicy {
    /// Pad to the longest sequence in the batch. With a single text this
    /// adds no padding.
    #[default]
    Longest,
    /// Always pad to `max_length`
    MaxLength,
}

/// Truncation and padding parameters, supplied by the model provider
#[derive(Debug, Clone)]
pub struct EncodingSettings {
    pub max_length: usize,
    pub padding: PaddingPolicy,
    pub pad_id: u32,
    pub pad_token: String,
}

/// [`TextEncoder`] backed by a Hugging Face tokenizer
pub struct TokenizerAdapter {
    tokenizer: Tokenizer,
    settings: EncodingSettings,
}

impl TokenizerAdapter {
    /// Configure `tokenizer` with the given truncation/padding policy
    pub fn new(mut tokenizer: Tokenizer, settings: EncodingSettings) -> Result<Self> {
        if settings.max_length == 0 {
            return Err(Error::config("max_length must be greater than zero"));
        }

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: settings.max_length,
                direction: TruncationDirection::Right,
                strategy: TruncationStrategy::LongestFirst,
                stride: 0,
            }))
            .map_err(|e| Error::tokenization(format!("Invalid truncation settings: {}", e)))?;

        let strategy = match settings.padding {
            PaddingPolicy::Longest => PaddingStrategy::BatchLongest,
            PaddingPolicy::MaxLength => PaddingStrategy::Fixed(settings.max_length),
        };

        tokenizer.with_padding(Some(PaddingParams {
            strategy,
            direction: PaddingDirection::Right,
            pad_to_multiple_of: None,
            pad_id: settings.pad_id,
            pad_type_id: 0,
            pad_token: settings.pad_token.clone(),
        }));

        Ok(Self {
            tokenizer,
            settings,
        })
    }

    /// Load `tokenizer.json` and configure it
    pub fn from_file(path: impl AsRef<Path>, settings: EncodingSettings) -> Result<Self> {
        let path = path.as_ref();
        let tokenizer = Tokenizer::from_file(path).map_err(|e| {
            Error::model_load(format!("Failed to load tokenizer {}: {}", path.display(), e))
        })?;
        Self::new(tokenizer, settings)
    }

    /// Look up a token id in the vocabulary
    pub fn token_to_id(&self, token: &str) -> Option<u32> {
        self.tokenizer.token_to_id(token)
    }

    pub fn settings(&self) -> &EncodingSettings {
        &self.settings
    }
}

impl TextEncoder for TokenizerAdapter {
    fn encode(&self, text: &InputText) -> Result<EncodedInput> {
        let encoding = self
            .tokenizer
            .encode(text.as_str(), true)
            .map_err(|e| Error::tokenization(format!("Tokenization failed: {}", e)))?;

        if !encoding.get_overflowing().is_empty() {
            tracing::debug!(
                max_length = self.settings.max_length,
                "Input truncated to the model's maximum length"
            );
        }

        let encoded = EncodedInput {
            input_ids: encoding.get_ids().to_vec(),
            attention_mask: encoding.get_attention_mask().to_vec(),
            type_ids: encoding.get_type_ids().to_vec(),
        };

        if encoded.is_empty() {
            return Err(Error::tokenization("Tokenizer produced no tokens"));
        }

        Ok(encoded)
    }

    fn max_length(&self) -> usize {
        self.settings.max_length
    }
}
