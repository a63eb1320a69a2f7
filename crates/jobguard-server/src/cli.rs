use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "jobguard-server")]
#[command(author, version, about = "Job-posting fraud classification service")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "jobguard.yaml", env = "JOBGUARD_CONFIG", global = true)]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "JOBGUARD_LOG_JSON", global = true)]
    pub log_json: bool,

    /// Defaults to `serve`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Serve(ServeArgs::default()))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Load the model and serve the HTTP API
    Serve(ServeArgs),

    /// Download the model into the model directory and exit
    Fetch(ModelArgs),
}

/// Where the model lives and where to fetch it from
#[derive(Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// Local model directory
    #[arg(short, long, env = "JOBGUARD_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Hugging Face repository to provision the model from
    #[arg(long, env = "JOBGUARD_HF_REPO")]
    pub hf_repo: Option<String>,

    /// Repository revision
    #[arg(long)]
    pub hf_revision: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Listen address
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long, env = "PORT")]
    pub port: Option<u16>,

    /// Inference device: cpu, cuda[:N], metal[:N]
    #[arg(long)]
    pub device: Option<String>,

    /// Maximum concurrent inferences
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Override the tokenizer truncation length
    #[arg(long)]
    pub max_length: Option<usize>,
}
