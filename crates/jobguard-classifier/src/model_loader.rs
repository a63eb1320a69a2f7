//! Model loading for the Candle-based fraud classifier
//!
//! The provider turns a populated local model directory into a tokenizer
//! adapter and an inference engine. Every failure here is a
//! [`Error::ModelLoad`]: the process must not start serving without a model.

use crate::engine::{BertEngine, InferenceEngine, RobertaEngine};
use crate::model_config::{
    resolve_max_length, Architecture, ModelArtifacts, ModelDescriptor, TokenizerHints,
};
use crate::pipeline::FraudPipeline;
use crate::tokenizer::{EncodingSettings, PaddingPolicy, TextEncoder, TokenizerAdapter};
use candle_core::{DType, Device};
use candle_nn::{Linear, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{
    Config as XlmRobertaConfig, XLMRobertaForSequenceClassification,
};
use jobguard_core::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

const NUM_LABELS: usize = 2;

/// Device type for inference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceType {
    /// CPU inference (always available)
    #[default]
    Cpu,
    /// CUDA GPU inference (if available)
    Cuda(usize),
    /// Metal (Apple Silicon)
    Metal(usize),
}

impl FromStr for DeviceType {
    type Err = Error;

    /// Accepts `cpu`, `cuda`, `cuda:N`, `metal`, `mps`, `metal:N`
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let (kind, index) = match lower.split_once(':') {
            Some((kind, index)) => {
                let index = index
                    .parse()
                    .map_err(|_| Error::config(format!("Invalid device index in '{}'", s)))?;
                (kind.to_string(), index)
            }
            None => (lower, 0),
        };

        match kind.as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda(index)),
            "metal" | "mps" => Ok(Self::Metal(index)),
            other => Err(Error::config(format!("Unknown device '{}'", other))),
        }
    }
}

impl DeviceType {
    fn create(self) -> Result<Device> {
        match self {
            Self::Cpu => Ok(Device::Cpu),
            Self::Cuda(idx) => Device::new_cuda(idx).map_err(|e| {
                Error::model_load(format!("Failed to create CUDA device {}: {}", idx, e))
            }),
            Self::Metal(idx) => Device::new_metal(idx).map_err(|e| {
                Error::model_load(format!("Failed to create Metal device {}: {}", idx, e))
            }),
        }
    }
}

/// Options for loading the model
#[derive(Debug, Clone, Default)]
pub struct ModelOptions {
    /// Display name; defaults to the directory name
    pub name: Option<String>,

    /// Device to run inference on
    pub device: DeviceType,

    /// Override for the truncation/padding length
    pub max_length: Option<usize>,

    /// Padding policy
    pub padding: PaddingPolicy,
}

impl ModelOptions {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_device(mut self, device: DeviceType) -> Self {
        self.device = device;
        self
    }

    pub fn with_max_length(mut self, max_length: Option<usize>) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_padding(mut self, padding: PaddingPolicy) -> Self {
        self.padding = padding;
        self
    }
}

/// Tokenizer and weights loaded from a model directory
pub struct LoadedModel {
    name: String,
    architecture: Architecture,
    encoder: Arc<TokenizerAdapter>,
    engine: Arc<dyn InferenceEngine>,
}

impl LoadedModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn max_length(&self) -> usize {
        self.encoder.max_length()
    }

    pub fn encoder(&self) -> Arc<dyn TextEncoder> {
        self.encoder.clone()
    }

    pub fn engine(&self) -> Arc<dyn InferenceEngine> {
        self.engine.clone()
    }

    /// Wire the loaded model into a prediction pipeline
    pub fn into_pipeline(self) -> FraudPipeline {
        FraudPipeline::new(self.encoder, self.engine)
    }
}

/// Loads a [`LoadedModel`] from a local directory
#[derive(Debug, Clone, Default)]
pub struct ModelProvider {
    options: ModelOptions,
}

impl ModelProvider {
    pub fn new(options: ModelOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    /// Load tokenizer and weights from `dir`
    pub fn load(&self, dir: impl AsRef<Path>) -> Result<LoadedModel> {
        let start = Instant::now();
        let artifacts = ModelArtifacts::locate(dir)?;

        let descriptor = ModelDescriptor::from_file(&artifacts.config)?;
        let architecture = descriptor.architecture()?;
        descriptor.check_binary_labels()?;

        let hints = match &artifacts.tokenizer_config {
            Some(path) => TokenizerHints::from_file(path)?,
            None => TokenizerHints::default(),
        };

        let name = self.options.name.clone().unwrap_or_else(|| {
            artifacts
                .dir
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("jobguard-model")
                .to_string()
        });

        tracing::info!(
            "Loading {} model '{}' from {}",
            architecture.as_str(),
            name,
            artifacts.dir.display()
        );

        let encoder = Arc::new(self.load_encoder(&artifacts, &descriptor, &hints)?);

        let device = self.options.device.create()?;
        let vb = load_var_builder(&artifacts, &device)?;

        let engine: Arc<dyn InferenceEngine> = match architecture {
            Architecture::Roberta => {
                let config: XlmRobertaConfig = parse_json_config(&artifacts.config)?;
                let model = load_roberta_sequence_model(&vb, &config)?;
                Arc::new(RobertaEngine::new(name.clone(), model, device))
            }
            Architecture::Bert => {
                let config: BertConfig = parse_json_config(&artifacts.config)?;
                let hidden_size = descriptor
                    .hidden_size
                    .ok_or_else(|| Error::model_load("BERT config is missing hidden_size"))?;
                let (model, pooler) = load_bert_backbone(&vb, &config, hidden_size)?;
                let classifier = load_classification_head(&vb, hidden_size)?;
                Arc::new(BertEngine::new(
                    name.clone(),
                    model,
                    pooler,
                    classifier,
                    device,
                ))
            }
        };

        tracing::info!(
            max_length = encoder.max_length(),
            padding = ?self.options.padding,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model '{}' loaded",
            name
        );

        Ok(LoadedModel {
            name,
            architecture,
            encoder,
            engine,
        })
    }

    fn load_encoder(
        &self,
        artifacts: &ModelArtifacts,
        descriptor: &ModelDescriptor,
        hints: &TokenizerHints,
    ) -> Result<TokenizerAdapter> {
        let max_length = resolve_max_length(self.options.max_length, hints, descriptor)
            .map_err(into_load_error)?;

        let pad_id = descriptor.pad_token_id();
        let pad_token = hints.pad_token().unwrap_or_else(|| "<pad>".to_string());

        let encoder = TokenizerAdapter::from_file(
            &artifacts.tokenizer,
            EncodingSettings {
                max_length,
                padding: self.options.padding,
                pad_id,
                pad_token: pad_token.clone(),
            },
        )
        .map_err(into_load_error)?;

        if let Some(vocab_id) = encoder.token_to_id(&pad_token) {
            if vocab_id != pad_id {
                tracing::warn!(
                    "Pad token '{}' has id {} in the vocabulary but config.json declares {}; using {}",
                    pad_token,
                    vocab_id,
                    pad_id,
                    pad_id
                );
            }
        }

        Ok(encoder)
    }
}

/// Anything failing while loading is fatal at startup
fn into_load_error(e: Error) -> Error {
    match e {
        Error::ModelLoad(msg) => Error::ModelLoad(msg),
        other => Error::model_load(other.to_string()),
    }
}

fn parse_json_config<T: DeserializeOwned>(config_path: &Path) -> Result<T> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        Error::model_load(format!(
            "Failed to read config {}: {}",
            config_path.display(),
            e
        ))
    })?;

    serde_json::from_str(&config_str).map_err(|e| {
        Error::model_load(format!(
            "Failed to parse config {}: {}",
            config_path.display(),
            e
        ))
    })
}

fn load_var_builder(artifacts: &ModelArtifacts, device: &Device) -> Result<VarBuilder<'static>> {
    // SAFETY: the weights file is memory-mapped read-only and must not be
    // modified while the model is in use.
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[&artifacts.weights], DType::F32, device).map_err(
            |e| {
                Error::model_load(format!(
                    "Failed to load weights {}: {}",
                    artifacts.weights.display(),
                    e
                ))
            },
        )?
    };

    Ok(vb)
}

fn load_roberta_sequence_model(
    vb: &VarBuilder,
    config: &XlmRobertaConfig,
) -> Result<XLMRobertaForSequenceClassification> {
    let mut errors = Vec::new();

    for prefix in ["", "model"] {
        let vb_prefix = if prefix.is_empty() {
            vb.clone()
        } else {
            vb.pp(prefix)
        };

        match XLMRobertaForSequenceClassification::new(NUM_LABELS, config, vb_prefix) {
            Ok(model) => {
                tracing::debug!(
                    "Loaded RoBERTa weights from '{}'",
                    if prefix.is_empty() { "<root>" } else { prefix }
                );
                return Ok(model);
            }
            Err(e) => errors.push(format!(
                "{}: {}",
                if prefix.is_empty() { "<root>" } else { prefix },
                e
            )),
        }
    }

    Err(Error::model_load(format!(
        "Failed to load RoBERTa sequence classifier with tried prefixes [{}]",
        errors.join(" | ")
    )))
}

fn load_bert_backbone(
    vb: &VarBuilder,
    config: &BertConfig,
    hidden_size: usize,
) -> Result<(BertModel, Linear)> {
    let mut errors = Vec::new();

    for prefix in ["bert", ""] {
        let vb_prefix = if prefix.is_empty() {
            vb.clone()
        } else {
            vb.pp(prefix)
        };

        let loaded = BertModel::load(vb_prefix.clone(), config).and_then(|model| {
            candle_nn::linear(hidden_size, hidden_size, vb_prefix.pp("pooler.dense"))
                .map(|pooler| (model, pooler))
        });

        match loaded {
            Ok(loaded) => {
                tracing::debug!(
                    "Loaded BERT backbone from '{}'",
                    if prefix.is_empty() { "<root>" } else { prefix }
                );
                return Ok(loaded);
            }
            Err(e) => errors.push(format!(
                "{}: {}",
                if prefix.is_empty() { "<root>" } else { prefix },
                e
            )),
        }
    }

    Err(Error::model_load(format!(
        "Failed to load BERT backbone with tried prefixes [{}]",
        errors.join(" | ")
    )))
}

/// A fine-tuned head is required; there is no random-init fallback
fn load_classification_head(vb: &VarBuilder, hidden_size: usize) -> Result<Linear> {
    candle_nn::linear(hidden_size, NUM_LABELS, vb.pp("classifier")).map_err(|e| {
        Error::model_load(format!(
            "No trained classification head (classifier.weight/bias, {}x{}): {}",
            NUM_LABELS, hidden_size, e
        ))
    })
}
