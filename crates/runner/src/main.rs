use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use runner::PipelineConfig;

/// Self-consistency NER over CMeEE with a chat-completion model.
#[derive(Parser, Debug)]
#[command(name = "cmeee-consistency", version)]
struct Cli {
    /// Continue from the existing output file
    #[arg(short = 'c', long)]
    continue_generate: bool,
    /// Start index into the evaluation split
    #[arg(short, long, default_value_t = 0)]
    start: usize,
    /// Number of sentences per slice
    #[arg(short, long, default_value_t = 5)]
    length: usize,
    /// Slices run while start + length <= total
    #[arg(long, default_value_t = 500)]
    total: usize,
    #[arg(short = 'k', long, env = "OPENAI_API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,
    #[arg(long, env = "OPENAI_API_BASE", default_value = "https://api.openai.com/v1")]
    api_base: String,
    #[arg(short, long, default_value = "gpt-3.5-turbo")]
    model: String,
    #[arg(short, long, default_value_t = 0.5)]
    temperature: f32,
    #[arg(long, default_value_t = 1024)]
    max_tokens: u32,
    /// Trust the entity offsets reported by the model
    #[arg(short = 'i', long)]
    use_index: bool,
    /// Few-shot examples per prompt
    #[arg(short = 'n', long, default_value_t = 3)]
    num_examples: usize,
    /// Prompt runs per sentence
    #[arg(long, default_value_t = 5)]
    num_consistency: usize,
    /// Votes needed to keep an entity
    #[arg(long, default_value_t = 2)]
    threshold: usize,
    /// CBLUE dataset root
    #[arg(short, long, default_value = "../data/CBLUEDatasets")]
    root: PathBuf,
    #[arg(long, default_value = "train")]
    train_split: String,
    #[arg(long, default_value = "select_dev")]
    eval_split: String,
    /// Backoff before retrying a throttled or rejected request
    #[arg(long, default_value_t = 20)]
    backoff_secs: u64,
    #[arg(short, long, default_value = "../ckpts/chatgpt_api")]
    output_dir: PathBuf,
    #[arg(short = 'f', long, default_value = "CMeEE_consistency.json")]
    output_file: String,
}

impl From<Cli> for PipelineConfig {
    fn from(cli: Cli) -> Self {
        let mut config = PipelineConfig::default();

        config.completion.api_key = cli.api_key;
        config.completion.api_base = cli.api_base;
        config.completion.model = cli.model;
        config.completion.temperature = cli.temperature;
        config.completion.max_tokens = cli.max_tokens;

        config.consistency.num_examples = cli.num_examples;
        config.consistency.num_runs = cli.num_consistency;
        config.consistency.threshold = cli.threshold;
        config.consistency.use_index = cli.use_index;

        config.retry.backoff_secs = cli.backoff_secs;

        config.dataset.root = cli.root;
        config.dataset.train_split = cli.train_split;
        config.dataset.eval_split = cli.eval_split;

        config.slices.start = cli.start;
        config.slices.length = cli.length;
        config.slices.total = cli.total;
        config.slices.resume = cli.continue_generate;

        config.output.dir = cli.output_dir;
        config.output.file = cli.output_file;

        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PipelineConfig::from(Cli::parse());
    info!(config = %serde_json::to_string(&config)?, "Starting self-consistency NER");

    runner::run(config).await
}
