use anyhow::Result;
use extract::{
    CompletionService, ConsistencyOutcome, LabeledSentence, NerResult, PredictionRecord,
    RetryPolicy, SelfConsistency,
};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::stats::{RunStats, StatsSnapshot, TimedOperation};
use crate::store::PredictionStore;

/// Runs the aggregator over a slice of sentences and persists the batch.
pub struct BatchDriver<C> {
    aggregator: SelfConsistency<C>,
    store: PredictionStore,
    retry: RetryPolicy,
}

impl<C: CompletionService> BatchDriver<C> {
    pub fn new(aggregator: SelfConsistency<C>, store: PredictionStore, retry: RetryPolicy) -> Self {
        Self {
            aggregator,
            store,
            retry,
        }
    }

    /// Predict every sentence of `slice` in order, then write
    /// `existing ++ new` to the store, where `existing` is the stored batch
    /// when `resume` is set and empty otherwise.
    ///
    /// A failing sentence aborts the slice before anything is written.
    pub async fn run_slice(
        &mut self,
        slice: &[LabeledSentence],
        resume: bool,
    ) -> Result<StatsSnapshot> {
        let existing = if resume {
            self.store.load().await?
        } else {
            Vec::new()
        };

        let mut stats = RunStats::new();
        let mut predictions: Vec<PredictionRecord> = Vec::with_capacity(slice.len());

        for (i, example) in slice.iter().enumerate() {
            let timer = TimedOperation::start();
            let outcome = self.predict_sentence(&example.text, &mut stats).await?;
            stats.record_sentence(&outcome, timer.elapsed());

            info!(
                index = i,
                of = slice.len(),
                kept = outcome.prediction.entities.len(),
                "Finished sentence"
            );
            predictions.push(outcome.prediction);
        }

        let resumed = existing.len();
        let mut batch = existing;
        batch.extend(predictions);
        self.store.save(&batch).await?;

        let snapshot = stats.snapshot();
        info!(
            path = ?self.store.path(),
            resumed = resumed,
            total = batch.len(),
            stats = ?snapshot,
            "Saved predictions"
        );

        Ok(snapshot)
    }

    /// A rejected request gets one more full aggregation after the backoff.
    async fn predict_sentence(
        &mut self,
        sentence: &str,
        stats: &mut RunStats,
    ) -> NerResult<ConsistencyOutcome> {
        match self.aggregator.predict(sentence).await {
            Err(e) if e.is_invalid_request() => {
                warn!(
                    backoff_ms = self.retry.backoff().as_millis(),
                    error = %e,
                    "Request rejected, retrying sentence"
                );
                stats.record_retry();
                sleep(self.retry.backoff()).await;
                self.aggregator.predict(sentence).await
            }
            other => other,
        }
    }
}
