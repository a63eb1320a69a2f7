//! Model directory layout and the descriptor read from `config.json`

use jobguard_core::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.json";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const WEIGHTS_FILE: &str = "model.safetensors";
pub const TOKENIZER_CONFIG_FILE: &str = "tokenizer_config.json";

/// `model_max_length` values above this are the "no limit" placeholder
/// written by the Python tokenizer tooling.
const UNBOUNDED_MAX_LENGTH: f64 = 1e9;

/// Paths of the artifacts inside a local model directory
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub dir: PathBuf,
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
    pub tokenizer_config: Option<PathBuf>,
}

impl ModelArtifacts {
    /// Locate the required files, failing with every missing name at once
    pub fn locate(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::model_load(format!(
                "Model directory does not exist: {}",
                dir.display()
            )));
        }

        let missing: Vec<&str> = [CONFIG_FILE, TOKENIZER_FILE, WEIGHTS_FILE]
            .into_iter()
            .filter(|file| !dir.join(file).is_file())
            .collect();

        if !missing.is_empty() {
            return Err(Error::model_load(format!(
                "Missing model artifacts in {}: {}",
                dir.display(),
                missing.join(", ")
            )));
        }

        let tokenizer_config = dir.join(TOKENIZER_CONFIG_FILE);

        Ok(Self {
            dir: dir.to_path_buf(),
            config: dir.join(CONFIG_FILE),
            tokenizer: dir.join(TOKENIZER_FILE),
            weights: dir.join(WEIGHTS_FILE),
            tokenizer_config: tokenizer_config.is_file().then_some(tokenizer_config),
        })
    }
}

/// Supported encoder families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    /// RoBERTa, XLM-RoBERTa, PhoBERT, CamemBERT
    Roberta,
    /// BERT with pooler and linear head
    Bert,
}

impl Architecture {
    pub fn from_model_type(model_type: &str) -> Option<Self> {
        match model_type.to_ascii_lowercase().replace('_', "-").as_str() {
            "roberta" | "xlm-roberta" | "phobert" | "camembert" => Some(Self::Roberta),
            "bert" => Some(Self::Bert),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Roberta => "roberta",
            Self::Bert => "bert",
        }
    }
}

/// The subset of the Hugging Face `config.json` the provider inspects.
///
/// Architecture-specific fields are parsed separately by the candle config
/// types.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelDescriptor {
    pub model_type: String,

    pub max_position_embeddings: usize,

    #[serde(default)]
    pub pad_token_id: Option<u32>,

    #[serde(default)]
    pub hidden_size: Option<usize>,

    #[serde(default)]
    pub id2label: Option<HashMap<String, String>>,

    #[serde(default)]
    pub architectures: Vec<String>,
}

impl ModelDescriptor {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::model_load(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
            .map_err(|e| Error::model_load(format!("{} ({})", e, path.display())))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::model_load(format!("Failed to parse model config: {}", e)))
    }

    pub fn architecture(&self) -> Result<Architecture> {
        Architecture::from_model_type(&self.model_type).ok_or_else(|| {
            Error::model_load(format!("Unsupported model_type '{}'", self.model_type))
        })
    }

    pub fn pad_token_id(&self) -> u32 {
        self.pad_token_id.unwrap_or(match self.architecture() {
            Ok(Architecture::Bert) => 0,
            _ => 1,
        })
    }

    /// Longest input the position embeddings can address.
    ///
    /// RoBERTa-family position ids start at `pad_token_id + 1`.
    pub fn position_limit(&self) -> Result<usize> {
        let limit = match self.architecture()? {
            Architecture::Roberta => self
                .max_position_embeddings
                .saturating_sub(self.pad_token_id() as usize + 1),
            Architecture::Bert => self.max_position_embeddings,
        };

        if limit == 0 {
            return Err(Error::model_load(format!(
                "max_position_embeddings={} leaves no room for tokens",
                self.max_position_embeddings
            )));
        }
        Ok(limit)
    }

    /// The label schema is fixed at two classes
    pub fn check_binary_labels(&self) -> Result<()> {
        match &self.id2label {
            Some(labels) if labels.len() != 2 => Err(Error::model_load(format!(
                "Expected a two-class model, config declares {} labels",
                labels.len()
            ))),
            _ => Ok(()),
        }
    }
}

/// Optional hints from `tokenizer_config.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenizerHints {
    #[serde(default)]
    pub model_max_length: Option<f64>,

    #[serde(default)]
    pub pad_token: Option<serde_json::Value>,
}

impl TokenizerHints {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::model_load(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            Error::model_load(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Bounded `model_max_length`, if one is declared
    pub fn max_length(&self) -> Option<usize> {
        self.model_max_length
            .filter(|len| *len > 0.0 && *len < UNBOUNDED_MAX_LENGTH)
            .map(|len| len as usize)
    }

    /// Pad token as a plain string; accepts both the string and the
    /// added-token object forms.
    pub fn pad_token(&self) -> Option<String> {
        match self.pad_token.as_ref()? {
            serde_json::Value::String(token) => Some(token.clone()),
            serde_json::Value::Object(map) => map
                .get("content")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            _ => None,
        }
    }
}

/// Resolve the truncation/padding length.
///
/// Order: explicit override, tokenizer hint, position-embedding limit. The
/// result never exceeds what the position embeddings can address.
pub fn resolve_max_length(
    override_len: Option<usize>,
    hints: &TokenizerHints,
    descriptor: &ModelDescriptor,
) -> Result<usize> {
    let limit = descriptor.position_limit()?;

    match override_len {
        Some(0) => Err(Error::config("max_length must be greater than zero")),
        Some(len) if len > limit => Err(Error::model_load(format!(
            "max_length {} exceeds the model's position limit of {}",
            len, limit
        ))),
        Some(len) => Ok(len),
        None => Ok(hints.max_length().map_or(limit, |len| len.min(limit))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHOBERT_CONFIG: &str = r#"{
        "architectures": ["RobertaForSequenceClassification"],
        "model_type": "roberta",
        "max_position_embeddings": 258,
        "pad_token_id": 1,
        "hidden_size": 768,
        "id2label": {"0": "LABEL_0", "1": "LABEL_1"},
        "tokenizer_class": "PhobertTokenizer"
    }"#;

    #[test]
    fn test_roberta_position_limit() {
        let descriptor = ModelDescriptor::from_json(PHOBERT_CONFIG).unwrap();
        assert_eq!(descriptor.architecture().unwrap(), Architecture::Roberta);
        assert_eq!(descriptor.position_limit().unwrap(), 256);
        assert!(descriptor.check_binary_labels().is_ok());
    }

    #[test]
    fn test_bert_position_limit() {
        let descriptor = ModelDescriptor::from_json(
            r#"{"model_type": "bert", "max_position_embeddings": 512}"#,
        )
        .unwrap();
        assert_eq!(descriptor.position_limit().unwrap(), 512);
        assert_eq!(descriptor.pad_token_id(), 0);
    }

    #[test]
    fn test_rejects_multiclass_and_unknown_models() {
        let descriptor = ModelDescriptor::from_json(
            r#"{"model_type": "roberta", "max_position_embeddings": 514,
                "id2label": {"0": "a", "1": "b", "2": "c"}}"#,
        )
        .unwrap();
        assert!(matches!(
            descriptor.check_binary_labels(),
            Err(Error::ModelLoad(_))
        ));

        let descriptor =
            ModelDescriptor::from_json(r#"{"model_type": "gpt2", "max_position_embeddings": 1024}"#)
                .unwrap();
        assert!(matches!(descriptor.architecture(), Err(Error::ModelLoad(_))));
    }

    #[test]
    fn test_max_length_resolution_order() {
        let descriptor = ModelDescriptor::from_json(PHOBERT_CONFIG).unwrap();
        let unbounded: TokenizerHints =
            serde_json::from_str(r#"{"model_max_length": 1000000000000000019884624838656}"#)
                .unwrap();
        let bounded: TokenizerHints =
            serde_json::from_str(r#"{"model_max_length": 128}"#).unwrap();

        assert_eq!(resolve_max_length(None, &unbounded, &descriptor).unwrap(), 256);
        assert_eq!(resolve_max_length(None, &bounded, &descriptor).unwrap(), 128);
        assert_eq!(resolve_max_length(Some(64), &bounded, &descriptor).unwrap(), 64);
        assert!(resolve_max_length(Some(0), &bounded, &descriptor).is_err());
        assert!(resolve_max_length(Some(1024), &bounded, &descriptor).is_err());
    }

    #[test]
    fn test_pad_token_forms() {
        let plain: TokenizerHints = serde_json::from_str(r#"{"pad_token": "<pad>"}"#).unwrap();
        assert_eq!(plain.pad_token().as_deref(), Some("<pad>"));

        let object: TokenizerHints = serde_json::from_str(
            r#"{"pad_token": {"content": "[PAD]", "lstrip": false, "__type": "AddedToken"}}"#,
        )
        .unwrap();
        assert_eq!(object.pad_token().as_deref(), Some("[PAD]"));
    }

    #[test]
    fn test_locate_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), PHOBERT_CONFIG).unwrap();

        let err = ModelArtifacts::locate(dir.path()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains(TOKENIZER_FILE));
        assert!(message.contains(WEIGHTS_FILE));
        assert!(!message.contains(CONFIG_FILE));
    }
}
