//! Server configuration

use crate::cli::{ModelArgs, ServeArgs};
use jobguard_classifier::{DeviceType, ModelOptions, PaddingPolicy};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Model location and encoding options
    #[serde(default)]
    pub model: ModelConfig,

    /// Inference worker pool
    #[serde(default)]
    pub inference: InferenceConfig,

    /// HTTP limits
    #[serde(default)]
    pub http: HttpConfig,
}

impl ServerConfig {
    /// Load configuration from file, or defaults when the file is absent
    pub fn load(config_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            tracing::debug!(
                "No configuration file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)?;
        let config = serde_yaml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Invalid configuration {}: {}", config_path.display(), e)
        })?;
        Ok(config)
    }

    /// Apply model location overrides
    pub fn apply_model_args(&mut self, args: &ModelArgs) {
        if let Some(dir) = &args.model_dir {
            self.model.dir = dir.clone();
        }
        if let Some(repo) = &args.hf_repo {
            self.model.hf_repo = Some(repo.clone());
        }
        if let Some(revision) = &args.hf_revision {
            self.model.hf_revision = revision.clone();
        }
    }

    /// Apply `serve` overrides
    pub fn apply_serve_args(&mut self, args: &ServeArgs) {
        self.apply_model_args(&args.model);

        if let Some(listen) = &args.listen {
            self.listen = listen.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(device) = &args.device {
            self.model.device = device.clone();
        }
        if let Some(workers) = args.workers {
            self.inference.workers = Some(workers);
        }
        if args.max_length.is_some() {
            self.model.max_length = args.max_length;
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.listen, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {}:{}: {}", self.listen, self.port, e))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            model: ModelConfig::default(),
            inference: InferenceConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Directory holding config.json, tokenizer.json and model.safetensors
    #[serde(default = "default_model_dir")]
    pub dir: PathBuf,

    /// Display name; defaults to the directory name
    #[serde(default)]
    pub name: Option<String>,

    /// Inference device
    #[serde(default = "default_device")]
    pub device: String,

    /// Truncation length override
    #[serde(default)]
    pub max_length: Option<usize>,

    #[serde(default)]
    pub padding: PaddingPolicy,

    /// Hugging Face repository used to provision an empty model directory
    #[serde(default)]
    pub hf_repo: Option<String>,

    #[serde(default = "default_revision")]
    pub hf_revision: String,
}

impl ModelConfig {
    /// Options for the model provider
    pub fn options(&self) -> anyhow::Result<ModelOptions> {
        let device: DeviceType = self.device.parse()?;

        let mut options = ModelOptions::default()
            .with_device(device)
            .with_max_length(self.max_length)
            .with_padding(self.padding);
        if let Some(name) = &self.name {
            options = options.with_name(name.clone());
        }
        Ok(options)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dir: default_model_dir(),
            name: None,
            device: default_device(),
            max_length: None,
            padding: PaddingPolicy::default(),
            hf_repo: None,
            hf_revision: default_revision(),
        }
    }
}

/// Inference worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Concurrent inferences; defaults to the number of CPUs
    #[serde(default)]
    pub workers: Option<usize>,

    /// How long a request waits for its prediction
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl InferenceConfig {
    pub fn workers(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            workers: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// HTTP limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("./phobert_job_fraud")
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}
