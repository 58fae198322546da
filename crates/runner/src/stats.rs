use serde::Serialize;
use std::time::{Duration, Instant};

use extract::ConsistencyOutcome;

/// Counters for one slice of the batch.
#[derive(Debug, Default)]
pub struct RunStats {
    sentences: usize,
    runs: usize,
    sentence_retries: usize,
    raw_entities: usize,
    distinct_entities: usize,
    kept_entities: usize,
    elapsed: Duration,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sentence(&mut self, outcome: &ConsistencyOutcome, duration: Duration) {
        self.sentences += 1;
        self.runs += outcome.runs;
        self.raw_entities += outcome.raw_entities;
        self.distinct_entities += outcome.distinct_entities;
        self.kept_entities += outcome.prediction.entities.len();
        self.elapsed += duration;
    }

    pub fn record_retry(&mut self) {
        self.sentence_retries += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sentences: self.sentences,
            runs: self.runs,
            sentence_retries: self.sentence_retries,
            raw_entities: self.raw_entities,
            distinct_entities: self.distinct_entities,
            kept_entities: self.kept_entities,
            avg_sentence_time_ms: if self.sentences > 0 {
                self.elapsed.as_secs_f64() * 1000.0 / self.sentences as f64
            } else {
                0.0
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatsSnapshot {
    pub sentences: usize,
    pub runs: usize,
    pub sentence_retries: usize,
    pub raw_entities: usize,
    pub distinct_entities: usize,
    pub kept_entities: usize,
    pub avg_sentence_time_ms: f64,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::PredictionRecord;

    #[test]
    fn test_empty_snapshot() {
        let snapshot = RunStats::new().snapshot();
        assert_eq!(snapshot.sentences, 0);
        assert_eq!(snapshot.avg_sentence_time_ms, 0.0);
    }

    #[test]
    fn test_accumulates_outcomes() {
        let outcome = ConsistencyOutcome {
            prediction: PredictionRecord {
                text: "句子".to_string(),
                entities: Vec::new(),
            },
            runs: 5,
            raw_entities: 7,
            distinct_entities: 3,
        };

        let mut stats = RunStats::new();
        stats.record_sentence(&outcome, Duration::from_millis(10));
        stats.record_sentence(&outcome, Duration::from_millis(30));
        stats.record_retry();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.sentences, 2);
        assert_eq!(snapshot.runs, 10);
        assert_eq!(snapshot.raw_entities, 14);
        assert_eq!(snapshot.sentence_retries, 1);
        assert!((snapshot.avg_sentence_time_ms - 20.0).abs() < 1e-6);
    }
}
