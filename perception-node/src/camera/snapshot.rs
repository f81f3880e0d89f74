use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::{FrameSource, RawFrame};
use crate::config::CameraConfig;
use crate::error::{MonitorError, Result};

/// Largest snapshot body accepted before decoding.
pub const DEFAULT_MAX_SNAPSHOT_BYTES: u64 = 8 * 1024 * 1024;

/// Pulls still images from cameras that expose an HTTP snapshot endpoint.
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    urls: HashMap<String, String>,
    max_bytes: u64,
}

impl HttpSnapshotSource {
    pub fn new(cameras: &[CameraConfig], timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MonitorError::Capture(format!("Failed to build snapshot client: {}", e)))?;

        let urls = cameras
            .iter()
            .filter_map(|c| c.snapshot_url.clone().map(|url| (c.id.clone(), url)))
            .collect();

        Ok(Self {
            client,
            urls,
            max_bytes: DEFAULT_MAX_SNAPSHOT_BYTES,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    fn oversized(&self, camera_id: &str, size: u64) -> MonitorError {
        MonitorError::Capture(format!(
            "snapshot for {} is {} bytes, limit is {}",
            camera_id, size, self.max_bytes
        ))
    }
}

#[async_trait]
impl FrameSource for HttpSnapshotSource {
    async fn capture(&self, camera_id: &str) -> Result<Option<RawFrame>> {
        let Some(url) = self.urls.get(camera_id) else {
            warn!("Camera {} has no snapshot URL configured", camera_id);
            return Ok(None);
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MonitorError::Capture(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MonitorError::Capture(format!(
                "snapshot for {} returned {}",
                camera_id,
                response.status()
            )));
        }

        if let Some(declared) = response.content_length() {
            if declared > self.max_bytes {
                return Err(self.oversized(camera_id, declared));
            }
        }

        // Content-Length may be absent, so enforce the limit while streaming too.
        let mut data = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| MonitorError::Capture(e.to_string()))?
        {
            let size = (data.len() + chunk.len()) as u64;
            if size > self.max_bytes {
                return Err(self.oversized(camera_id, size));
            }
            data.extend_from_slice(&chunk);
        }

        if data.is_empty() {
            debug!("Empty snapshot from camera {}", camera_id);
            return Ok(None);
        }

        Ok(Some(RawFrame {
            camera_id: camera_id.to_string(),
            data,
            captured_at: chrono::Utc::now(),
        }))
    }
}
