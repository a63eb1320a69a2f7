//! Load-and-forward tests against tiny randomly initialised checkpoints
//!
//! Each test writes a model directory (config.json, tokenizer.json,
//! model.safetensors) built with a `VarMap`, then goes through
//! `ModelProvider::load` and the real Candle engines.

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{
    Config as XlmRobertaConfig, XLMRobertaForSequenceClassification,
};
use jobguard_classifier::{
    Architecture, InferenceEngine, LoadedModel, ModelOptions, ModelProvider, PaddingPolicy,
    TextEncoder,
};
use jobguard_core::{Error, InputText, PredictionLabel};
use std::path::Path;
use tempfile::TempDir;

const HIDDEN: usize = 8;

// 20 positions with pad id 1 leave room for 18 tokens
const ROBERTA_CONFIG: &str = r#"{
    "model_type": "roberta",
    "architectures": ["RobertaForSequenceClassification"],
    "vocab_size": 16,
    "hidden_size": 8,
    "num_hidden_layers": 1,
    "num_attention_heads": 2,
    "intermediate_size": 16,
    "hidden_act": "gelu",
    "hidden_dropout_prob": 0.1,
    "attention_probs_dropout_prob": 0.1,
    "max_position_embeddings": 20,
    "type_vocab_size": 1,
    "layer_norm_eps": 1e-5,
    "position_embedding_type": "absolute",
    "pad_token_id": 1,
    "id2label": {"0": "LABEL_0", "1": "LABEL_1"}
}"#;

const BERT_CONFIG: &str = r#"{
    "model_type": "bert",
    "vocab_size": 16,
    "hidden_size": 8,
    "num_hidden_layers": 1,
    "num_attention_heads": 2,
    "intermediate_size": 16,
    "hidden_act": "gelu",
    "hidden_dropout_prob": 0.1,
    "max_position_embeddings": 20,
    "type_vocab_size": 2,
    "initializer_range": 0.02,
    "layer_norm_eps": 1e-12,
    "pad_token_id": 1,
    "position_embedding_type": "absolute",
    "use_cache": false,
    "classifier_dropout": null
}"#;

const TOKENIZER_JSON: &str = r#"{
    "version": "1.0",
    "truncation": null,
    "padding": null,
    "added_tokens": [],
    "normalizer": null,
    "pre_tokenizer": {"type": "Whitespace"},
    "post_processor": {
        "type": "RobertaProcessing",
        "sep": ["</s>", 2],
        "cls": ["<s>", 0],
        "trim_offsets": true,
        "add_prefix_space": true
    },
    "decoder": null,
    "model": {
        "type": "WordLevel",
        "vocab": {
            "<s>": 0, "<pad>": 1, "</s>": 2, "<unk>": 3,
            "earn": 4, "money": 5, "from": 6, "home": 7,
            "senior": 8, "engineer": 9, "no": 10, "experience": 11
        },
        "unk_token": "<unk>"
    }
}"#;

fn write_common_files(dir: &Path, config: &str) {
    std::fs::write(dir.join("config.json"), config).unwrap();
    std::fs::write(dir.join("tokenizer.json"), TOKENIZER_JSON).unwrap();
}

fn roberta_checkpoint() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_common_files(dir.path(), ROBERTA_CONFIG);

    let config: XlmRobertaConfig = serde_json::from_str(ROBERTA_CONFIG).unwrap();
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    XLMRobertaForSequenceClassification::new(2, &config, vb).unwrap();
    varmap.save(dir.path().join("model.safetensors")).unwrap();

    dir
}

fn bert_checkpoint(with_head: bool) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_common_files(dir.path(), BERT_CONFIG);

    let config: BertConfig = serde_json::from_str(BERT_CONFIG).unwrap();
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    BertModel::load(vb.pp("bert"), &config).unwrap();
    candle_nn::linear(HIDDEN, HIDDEN, vb.pp("bert.pooler.dense")).unwrap();
    if with_head {
        candle_nn::linear(HIDDEN, 2, vb.pp("classifier")).unwrap();
    }
    varmap.save(dir.path().join("model.safetensors")).unwrap();

    dir
}

fn load(dir: &Path, padding: PaddingPolicy) -> LoadedModel {
    ModelProvider::new(ModelOptions::default().with_padding(padding))
        .load(dir)
        .unwrap()
}

fn text(s: &str) -> InputText {
    InputText::parse(Some(s)).unwrap()
}

fn long_text() -> String {
    "senior engineer no experience earn money from home ".repeat(6)
}

fn assert_two_finite_logits(model: &LoadedModel, inputs: &[String]) {
    let encoder = model.encoder();
    let engine = model.engine();

    for input in inputs {
        let encoded = encoder.encode(&text(input)).unwrap();
        let logits = engine.infer(&encoded).unwrap();

        assert_eq!(logits.as_array().len(), 2);
        assert!(logits.is_finite(), "non-finite logits for {:?}", input);
    }
}

fn assert_padding_does_not_change_scores(dir: &Path, inputs: &[String]) {
    let longest = load(dir, PaddingPolicy::Longest).into_pipeline();
    let max_length = load(dir, PaddingPolicy::MaxLength).into_pipeline();

    for input in inputs {
        let a = longest.predict(Some(input)).unwrap();
        let b = max_length.predict(Some(input)).unwrap();

        assert!(
            (a.probabilities().real - b.probabilities().real).abs() < 1e-5,
            "padding changed Real for {:?}: {} vs {}",
            input,
            a.probabilities().real,
            b.probabilities().real
        );
        assert_eq!(a.prediction(), b.prediction());
    }
}

fn inputs() -> Vec<String> {
    vec![
        "earn money from home".to_string(),
        "senior engineer".to_string(),
        "Tuyển gấp, lương cao".to_string(),
        long_text(),
    ]
}

#[test]
fn test_roberta_checkpoint_loads() {
    let dir = roberta_checkpoint();
    let model = load(dir.path(), PaddingPolicy::Longest);

    assert_eq!(model.architecture(), Architecture::Roberta);
    assert_eq!(model.max_length(), 18);
    assert_eq!(model.engine().name(), model.name());
}

#[test]
fn test_roberta_forward_returns_two_finite_logits() {
    let dir = roberta_checkpoint();
    let model = load(dir.path(), PaddingPolicy::Longest);

    assert_two_finite_logits(&model, &inputs());
}

#[test]
fn test_roberta_truncates_to_position_limit() {
    let dir = roberta_checkpoint();

    for padding in [PaddingPolicy::Longest, PaddingPolicy::MaxLength] {
        let model = load(dir.path(), padding);
        let encoded = model.encoder().encode(&text(&long_text())).unwrap();

        assert_eq!(encoded.len(), 18);
        assert_eq!(encoded.attention_mask, vec![1; 18]);
        assert!(model.engine().infer(&encoded).unwrap().is_finite());
    }
}

#[test]
fn test_roberta_padding_policy_does_not_change_scores() {
    let dir = roberta_checkpoint();
    assert_padding_does_not_change_scores(dir.path(), &inputs());
}

#[test]
fn test_roberta_max_length_override_beyond_positions_fails() {
    let dir = roberta_checkpoint();
    let result =
        ModelProvider::new(ModelOptions::default().with_max_length(Some(64))).load(dir.path());

    assert!(matches!(result, Err(Error::ModelLoad(_))));
}

#[test]
fn test_roberta_pipeline_end_to_end() {
    let dir = roberta_checkpoint();
    let pipeline = load(dir.path(), PaddingPolicy::Longest).into_pipeline();

    let result = pipeline.predict(Some("earn money from home")).unwrap();
    let probabilities = result.probabilities();

    assert_eq!(result.text(), "earn money from home");
    assert!((probabilities.total() - 1.0).abs() < 1e-6);
    let expected = if probabilities.fraudulent > probabilities.real {
        PredictionLabel::Fraudulent
    } else {
        PredictionLabel::Real
    };
    assert_eq!(result.prediction(), expected);

    assert!(matches!(pipeline.predict(Some("")), Err(Error::EmptyInput)));
}

#[test]
fn test_bert_checkpoint_loads() {
    let dir = bert_checkpoint(true);
    let model = load(dir.path(), PaddingPolicy::Longest);

    assert_eq!(model.architecture(), Architecture::Bert);
    assert_eq!(model.max_length(), 20);
}

#[test]
fn test_bert_forward_returns_two_finite_logits() {
    let dir = bert_checkpoint(true);
    let model = load(dir.path(), PaddingPolicy::MaxLength);

    assert_two_finite_logits(&model, &inputs());

    let encoded = model.encoder().encode(&text(&long_text())).unwrap();
    assert_eq!(encoded.len(), 20);
}

#[test]
fn test_bert_padding_policy_does_not_change_scores() {
    let dir = bert_checkpoint(true);
    assert_padding_does_not_change_scores(dir.path(), &inputs());
}

#[test]
fn test_bert_without_classification_head_fails() {
    let dir = bert_checkpoint(false);
    let result = ModelProvider::default().load(dir.path());

    match result {
        Err(Error::ModelLoad(msg)) => assert!(msg.contains("classification head"), "{}", msg),
        Err(other) => panic!("expected a model load error, got {}", other),
        Ok(_) => panic!("expected a model load error"),
    }
}
