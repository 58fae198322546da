use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{NerError, NerResult};
use crate::llm::CompletionService;
use crate::parser::CompletionParser;
use crate::prompt::{ExampleSampler, build_messages, build_system_instruction};
use crate::retry::RetryPolicy;
use crate::schema::{EntityRecord, EntityTypeMap, PredictionRecord};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyConfig {
    /// Few-shot examples drawn per run.
    pub num_examples: usize,
    /// Independent runs per sentence.
    pub num_runs: usize,
    /// Minimum votes for an entity to be kept.
    pub threshold: usize,
    /// Trust the offsets reported by the model instead of re-locating spans.
    pub use_index: bool,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            num_examples: 3,
            num_runs: 5,
            threshold: 2,
            use_index: false,
        }
    }
}

/// Vote counts per distinct entity record, in first-seen order.
///
/// Two records share a bucket only when text, type and both offsets match.
#[derive(Debug, Default)]
pub struct VoteTally {
    order: Vec<EntityRecord>,
    counts: HashMap<EntityRecord, usize>,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: EntityRecord) {
        match self.counts.get_mut(&record) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(record.clone(), 1);
                self.order.push(record);
            }
        }
    }

    pub fn add_run(&mut self, records: Vec<EntityRecord>) {
        for record in records {
            self.add(record);
        }
    }

    pub fn votes(&self, record: &EntityRecord) -> usize {
        self.counts.get(record).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Records with at least `threshold` votes, in first-seen order.
    pub fn retain(&self, threshold: usize) -> Vec<EntityRecord> {
        self.order
            .iter()
            .filter(|record| self.votes(record) >= threshold)
            .cloned()
            .collect()
    }
}

/// Outcome of aggregating one sentence, with the numbers the driver reports.
#[derive(Debug, Clone)]
pub struct ConsistencyOutcome {
    pub prediction: PredictionRecord,
    pub runs: usize,
    pub raw_entities: usize,
    pub distinct_entities: usize,
}

pub struct SelfConsistency<C> {
    client: C,
    sampler: ExampleSampler,
    types: EntityTypeMap,
    system_instruction: String,
    config: ConsistencyConfig,
    retry: RetryPolicy,
    rng: StdRng,
}

impl<C: CompletionService> SelfConsistency<C> {
    pub fn new(
        client: C,
        sampler: ExampleSampler,
        types: EntityTypeMap,
        config: ConsistencyConfig,
        retry: RetryPolicy,
    ) -> Self {
        let system_instruction = build_system_instruction(&types);
        Self {
            client,
            sampler,
            types,
            system_instruction,
            config,
            retry,
            rng: StdRng::from_entropy(),
        }
    }

    /// Replace the sampling generator, e.g. with a seeded one.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Run the full pipeline `num_runs` times and keep the entities that
    /// reach the vote threshold.
    ///
    /// Any run that still fails after its retry aborts the sentence; no
    /// partial tally is returned.
    pub async fn predict(&mut self, sentence: &str) -> NerResult<ConsistencyOutcome> {
        let mut tally = VoteTally::new();
        let mut raw_entities = 0;

        for run in 0..self.config.num_runs {
            let examples = self.sampler.sample(self.config.num_examples, &mut self.rng)?;

            let entities = self
                .retry
                .retry("consistency_run", NerError::is_rate_limited, || {
                    self.run_once(&examples, sentence)
                })
                .await?;

            raw_entities += entities.len();
            tally.add_run(entities);

            if tally.is_empty() {
                debug!(run = run + 1, of = self.config.num_runs, "No entities proposed yet");
                continue;
            }

            let votes: Vec<(&str, usize)> = tally
                .order
                .iter()
                .map(|r| (r.entity.as_str(), tally.votes(r)))
                .collect();
            debug!(
                run = run + 1,
                of = self.config.num_runs,
                distinct = tally.len(),
                votes = ?votes,
                "Updated vote tally"
            );
        }

        let prediction = PredictionRecord {
            text: sentence.to_string(),
            entities: tally.retain(self.config.threshold),
        };

        info!(
            sentence = sentence,
            kept = prediction.entities.len(),
            distinct = tally.len(),
            threshold = self.config.threshold,
            "Aggregated sentence"
        );

        Ok(ConsistencyOutcome {
            prediction,
            runs: self.config.num_runs,
            raw_entities,
            distinct_entities: tally.len(),
        })
    }

    async fn run_once(&self, examples: &[String], sentence: &str) -> NerResult<Vec<EntityRecord>> {
        let messages = build_messages(&self.system_instruction, examples, sentence);
        let completion = self.client.complete(&messages).await?;

        let parser = CompletionParser::new(&self.types, self.config.use_index);
        Ok(parser.parse(&completion, sentence))
    }
}
