//! Inference engines: encoded input to logits
//!
//! Engines wrap immutable candle models. A forward pass takes `&self` and
//! keeps no per-call state on the model, so one engine is shared across
//! worker threads without locking.

use candle_core::{Device, IndexOp, Tensor};
use candle_nn::{Linear, Module};
use candle_transformers::models::bert::BertModel;
use candle_transformers::models::xlm_roberta::XLMRobertaForSequenceClassification;
use jobguard_core::{EncodedInput, Error, LogitVector, Result};

/// Computes raw class scores for one encoded text
pub trait InferenceEngine: Send + Sync {
    /// Run the forward pass
    fn infer(&self, encoded: &EncodedInput) -> Result<LogitVector>;

    /// Engine (model) name
    fn name(&self) -> &str;
}

/// RoBERTa-family sequence classifier (RoBERTa, XLM-RoBERTa, PhoBERT)
pub struct RobertaEngine {
    name: String,
    model: XLMRobertaForSequenceClassification,
    device: Device,
}

impl RobertaEngine {
    pub fn new(
        name: impl Into<String>,
        model: XLMRobertaForSequenceClassification,
        device: Device,
    ) -> Self {
        Self {
            name: name.into(),
            model,
            device,
        }
    }
}

impl InferenceEngine for RobertaEngine {
    fn infer(&self, encoded: &EncodedInput) -> Result<LogitVector> {
        encoded.check_shape()?;

        let input_ids = batch_tensor(&encoded.input_ids, &self.device, "input ids")?;
        let attention_mask = batch_tensor(&encoded.attention_mask, &self.device, "attention mask")?;
        let token_type_ids = batch_tensor(&encoded.type_ids, &self.device, "token type ids")?;

        let logits = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids)
            .map_err(|e| Error::inference(format!("Model forward pass failed: {}", e)))?;

        logits_from_tensor(&logits)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// BERT encoder with pooler and linear classification head
pub struct BertEngine {
    name: String,
    model: BertModel,
    pooler: Linear,
    classifier: Linear,
    device: Device,
}

impl BertEngine {
    pub fn new(
        name: impl Into<String>,
        model: BertModel,
        pooler: Linear,
        classifier: Linear,
        device: Device,
    ) -> Self {
        Self {
            name: name.into(),
            model,
            pooler,
            classifier,
            device,
        }
    }
}

impl InferenceEngine for BertEngine {
    fn infer(&self, encoded: &EncodedInput) -> Result<LogitVector> {
        encoded.check_shape()?;

        let input_ids = batch_tensor(&encoded.input_ids, &self.device, "input ids")?;
        let attention_mask = batch_tensor(&encoded.attention_mask, &self.device, "attention mask")?;
        let token_type_ids = batch_tensor(&encoded.type_ids, &self.device, "token type ids")?;

        let hidden_states = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(|e| Error::inference(format!("Model forward pass failed: {}", e)))?;

        // [CLS] position of the single sequence: (1, hidden)
        let cls_embedding = hidden_states
            .i((.., 0))
            .map_err(|e| Error::inference(format!("Failed to get CLS token: {}", e)))?;

        let pooled = self
            .pooler
            .forward(&cls_embedding)
            .and_then(|t| t.tanh())
            .map_err(|e| Error::inference(format!("Pooler failed: {}", e)))?;

        let logits = self
            .classifier
            .forward(&pooled)
            .map_err(|e| Error::inference(format!("Classification head failed: {}", e)))?;

        logits_from_tensor(&logits)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Build a `(1, seq_len)` tensor
fn batch_tensor(values: &[u32], device: &Device, what: &str) -> Result<Tensor> {
    Tensor::new(values, device)
        .and_then(|t| t.unsqueeze(0))
        .map_err(|e| Error::inference(format!("Failed to create {} tensor: {}", what, e)))
}

/// Extract the two class scores from a `(1, 2)` logits tensor
fn logits_from_tensor(logits: &Tensor) -> Result<LogitVector> {
    let dims = logits.dims();
    if dims != [1, 2] {
        return Err(Error::inference(format!(
            "Unexpected logits shape {:?}, expected [1, 2]",
            dims
        )));
    }

    let values: Vec<f32> = logits
        .squeeze(0)
        .and_then(|t| t.to_vec1())
        .map_err(|e| Error::inference(format!("Failed to read logits: {}", e)))?;

    LogitVector::try_from(values)
}
