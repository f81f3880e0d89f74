use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{MonitorError, Result};

/// Custom camera labels keyed by device id, persisted as a JSON file.
#[derive(Debug, Clone)]
pub struct LabelStore {
    path: PathBuf,
}

impl LabelStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// A missing file yields an empty map.
    pub async fn load(&self) -> Result<HashMap<String, String>> {
        if !fs::try_exists(&self.path).await? {
            debug!("No label file at {}", self.path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read(&self.path).await?;
        let labels: HashMap<String, String> = serde_json::from_slice(&content).map_err(|e| {
            MonitorError::Storage(format!("Corrupt label file {}: {}", self.path.display(), e))
        })?;

        info!("Loaded {} camera labels from {}", labels.len(), self.path.display());
        Ok(labels)
    }

    pub async fn save(&self, labels: &HashMap<String, String>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).await?;
            }
        }

        let content = serde_json::to_vec_pretty(labels)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    pub async fn set_label(&self, camera_id: &str, label: &str) -> Result<()> {
        let mut labels = self.load().await?;
        labels.insert(camera_id.to_string(), label.to_string());
        self.save(&labels).await
    }
}
