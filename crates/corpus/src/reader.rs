use anyhow::{Context, Result};
use extract::LabeledSentence;
use std::path::Path;
use tokio::fs;

pub struct SplitReader;

impl SplitReader {
    /// Read a JSON array of labeled sentences.
    pub async fn read_file(path: &Path) -> Result<Vec<LabeledSentence>> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        match extension {
            "json" => {
                let content = fs::read_to_string(path)
                    .await
                    .context(format!("Failed to read split file: {:?}", path))?;
                let sentences = serde_json::from_str(&content)
                    .context(format!("Failed to parse split file: {:?}", path))?;
                Ok(sentences)
            }
            _ => anyhow::bail!("Unsupported split format: {}", extension),
        }
    }
}
