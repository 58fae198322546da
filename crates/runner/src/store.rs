use anyhow::{Context, Result};
use extract::PredictionRecord;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Whole-file JSON array of prediction records.
///
/// The file is rewritten in full on every save; there is no append mode.
#[derive(Debug, Clone)]
pub struct PredictionStore {
    path: PathBuf,
}

impl PredictionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Vec<PredictionRecord>> {
        let json = fs::read_to_string(&self.path)
            .await
            .context(format!("Failed to read predictions: {:?}", self.path))?;

        serde_json::from_str(&json)
            .context(format!("Failed to parse predictions: {:?}", self.path))
    }

    pub async fn save(&self, batch: &[PredictionRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .context(format!("Failed to create output dir: {:?}", parent))?;
            }
        }

        let json = serde_json::to_string_pretty(batch)?;
        fs::write(&self.path, json)
            .await
            .context(format!("Failed to write predictions: {:?}", self.path))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{EntityRecord, EntityType};

    fn prediction() -> PredictionRecord {
        PredictionRecord {
            text: "患者有发热和咳嗽".to_string(),
            entities: vec![EntityRecord {
                entity: "发热".to_string(),
                entity_type: EntityType::Symptom,
                start_idx: 3,
                end_idx: 4,
            }],
        }
    }

    #[tokio::test]
    async fn test_saved_file_keeps_chinese_literal() {
        let dir = tempfile::tempdir().unwrap();
        let store = PredictionStore::new(dir.path().join("nested").join("out.json"));

        store.save(&[prediction()]).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"text\": \"患者有发热和咳嗽\""));
        assert!(raw.contains("\"type\": \"sym\""));
        assert!(!raw.contains("\\u"));

        assert_eq!(store.load().await.unwrap(), vec![prediction()]);
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = PredictionStore::new(dir.path().join("absent.json"));
        assert!(store.load().await.is_err());
    }
}
