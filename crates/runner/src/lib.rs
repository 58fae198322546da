pub mod config;
pub mod driver;
pub mod stats;
pub mod store;

pub use config::{DatasetConfig, OutputConfig, PipelineConfig, RetryConfig, SliceConfig};
pub use driver::BatchDriver;
pub use stats::{RunStats, StatsSnapshot};
pub use store::PredictionStore;

use anyhow::{Context, Result};
use corpus::CmeeeDataset;
use extract::{CompletionService, EntityTypeMap, ExampleSampler, OpenAiClient, SelfConsistency};
use tracing::info;

/// Build the pipeline from `config` and process every configured slice.
pub async fn run(config: PipelineConfig) -> Result<()> {
    if config.completion.api_key.is_empty() {
        anyhow::bail!("No API key configured (pass --api-key or set OPENAI_API_KEY)");
    }

    let retry = config.retry.policy();
    let client = OpenAiClient::new(config.completion.clone(), retry)
        .context("Failed to build completion client")?;

    run_with_client(client, &config).await
}

/// Same as [`run`] with a caller-supplied completion service.
pub async fn run_with_client<C: CompletionService>(client: C, config: &PipelineConfig) -> Result<()> {
    let dataset = CmeeeDataset::new(&config.dataset.root);
    let training = dataset.load_split(&config.dataset.train_split).await?;

    let retry = config.retry.policy();
    let aggregator = SelfConsistency::new(
        client,
        ExampleSampler::new(training),
        EntityTypeMap::new(),
        config.consistency.clone(),
        retry,
    );
    let mut driver = BatchDriver::new(aggregator, PredictionStore::new(config.output.path()), retry);

    for (n, start) in config.slices.starts().into_iter().enumerate() {
        let slice = dataset
            .load_slice(&config.dataset.eval_split, start, config.slices.length)
            .await?;

        // Later slices build on the file the previous slice wrote.
        let resume = config.slices.resume || n > 0;

        info!(start = start, length = slice.len(), resume = resume, "Starting slice");
        driver.run_slice(&slice, resume).await?;
    }

    Ok(())
}
