use async_trait::async_trait;

use crate::error::Result;

pub mod compress;
pub mod registry;
pub mod snapshot;
pub mod synthetic;

/// Undecoded still image as delivered by a camera.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub camera_id: String,
    pub data: Vec<u8>,
    pub captured_at: chrono::DateTime<chrono::Utc>,
}

/// Frame after downscaling and re-encoding, ready for the gateway.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

#[async_trait]
pub trait FrameSource: Send + Sync {
    /// `Ok(None)` means no frame was available for this camera right now.
    async fn capture(&self, camera_id: &str) -> Result<Option<RawFrame>>;
}
