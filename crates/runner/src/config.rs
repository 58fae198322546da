use extract::{CompletionConfig, ConsistencyConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub completion: CompletionConfig,
    pub consistency: ConsistencyConfig,
    pub retry: RetryConfig,
    pub dataset: DatasetConfig,
    pub slices: SliceConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Wait before the single retry on throttling or a rejected request.
    pub backoff_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub root: PathBuf,
    pub train_split: String,
    pub eval_split: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceConfig {
    pub start: usize,
    pub length: usize,
    /// Slices are processed while `start + length <= total`.
    pub total: usize,
    pub resume: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub file: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            completion: CompletionConfig::default(),
            consistency: ConsistencyConfig::default(),
            retry: RetryConfig { backoff_secs: 20 },
            dataset: DatasetConfig {
                root: PathBuf::from("../data/CBLUEDatasets"),
                train_split: "train".to_string(),
                eval_split: "select_dev".to_string(),
            },
            slices: SliceConfig {
                start: 0,
                length: 5,
                total: 500,
                resume: false,
            },
            output: OutputConfig {
                dir: PathBuf::from("../ckpts/chatgpt_api"),
                file: "CMeEE_consistency.json".to_string(),
            },
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::once(Duration::from_secs(self.backoff_secs))
    }
}

impl OutputConfig {
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file)
    }
}

impl SliceConfig {
    /// Start offsets of every slice the run will process.
    pub fn starts(&self) -> Vec<usize> {
        if self.length == 0 {
            return Vec::new();
        }

        let mut starts = Vec::new();
        let mut start = self.start;
        while start + self.length <= self.total {
            starts.push(start);
            start += self.length;
        }
        starts
    }
}
