pub mod reader;

pub use reader::SplitReader;

use anyhow::Result;
use extract::LabeledSentence;
use std::path::PathBuf;
use tracing::info;

/// The CMeEE task inside a CBLUE dataset checkout.
///
/// Splits live at `<root>/CMeEE/CMeEE_<split>.json`.
#[derive(Debug, Clone)]
pub struct CmeeeDataset {
    root: PathBuf,
}

impl CmeeeDataset {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn split_path(&self, split: &str) -> PathBuf {
        self.root
            .join("CMeEE")
            .join(format!("CMeEE_{}.json", split))
    }

    /// Load every record of a split, in file order.
    pub async fn load_split(&self, split: &str) -> Result<Vec<LabeledSentence>> {
        let path = self.split_path(split);
        let sentences = SplitReader::read_file(&path).await?;

        info!(split = split, records = sentences.len(), path = ?path, "Loaded dataset split");
        Ok(sentences)
    }

    /// Records `[start, start + length)` of a split, clamped to its end.
    pub async fn load_slice(
        &self,
        split: &str,
        start: usize,
        length: usize,
    ) -> Result<Vec<LabeledSentence>> {
        let sentences = self.load_split(split).await?;
        Ok(sentences
            .into_iter()
            .skip(start)
            .take(length)
            .collect())
    }
}
