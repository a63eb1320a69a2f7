//! Prediction pipeline: validate, encode, infer, normalize, assemble
//!
//! [`FraudPipeline`] is the synchronous core. [`BlockingPredictor`] runs it
//! on tokio's blocking pool behind a bounded number of permits, so the
//! CPU-bound forward pass never stalls the async reactor.

use crate::engine::InferenceEngine;
use crate::scoring::normalize;
use crate::tokenizer::TextEncoder;
use async_trait::async_trait;
use jobguard_core::{assemble, validate, Error, InputText, PredictionResult, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// The prediction pipeline over an injected encoder and engine
#[derive(Clone)]
pub struct FraudPipeline {
    encoder: Arc<dyn TextEncoder>,
    engine: Arc<dyn InferenceEngine>,
}

impl FraudPipeline {
    pub fn new(encoder: Arc<dyn TextEncoder>, engine: Arc<dyn InferenceEngine>) -> Self {
        Self { encoder, engine }
    }

    /// Validate raw request text and predict
    pub fn predict(&self, raw: Option<&str>) -> Result<PredictionResult> {
        self.predict_text(validate(raw)?)
    }

    /// Predict for already-validated text
    pub fn predict_text(&self, text: InputText) -> Result<PredictionResult> {
        let start = Instant::now();

        let encoded = self.encoder.encode(&text)?;
        let logits = self.engine.infer(&encoded)?;
        let (probabilities, label) = normalize(&logits);

        tracing::debug!(
            tokens = encoded.token_count(),
            label = label.as_str(),
            real = probabilities.real,
            fraudulent = probabilities.fraudulent,
            latency_us = start.elapsed().as_micros() as u64,
            "Prediction complete"
        );

        Ok(assemble(text, label, probabilities))
    }

    pub fn model_name(&self) -> &str {
        self.engine.name()
    }
}

/// Async entry point used by the HTTP layer
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Predict for validated text
    async fn predict(&self, text: InputText) -> Result<PredictionResult>;

    /// Name of the model behind this predictor
    fn model_name(&self) -> &str;
}

/// Runs the pipeline on the blocking pool with at most `workers`
/// predictions in flight.
pub struct BlockingPredictor {
    pipeline: FraudPipeline,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl BlockingPredictor {
    pub fn new(pipeline: FraudPipeline, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Predictions that could start right now
    pub fn idle_workers(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait]
impl Predictor for BlockingPredictor {
    async fn predict(&self, text: InputText) -> Result<PredictionResult> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::internal("Inference worker pool is closed"))?;

        let pipeline = self.pipeline.clone();

        // The permit travels with the task: if the caller gives up, the
        // slot stays taken until the forward pass actually finishes.
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            pipeline.predict_text(text)
        })
        .await
        .map_err(|e| Error::internal(format!("Inference task failed: {}", e)))?
    }

    fn model_name(&self) -> &str {
        self.pipeline.model_name()
    }
}
