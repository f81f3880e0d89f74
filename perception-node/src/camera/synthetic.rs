use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb};
use rand::prelude::*;
use std::io::Cursor;

use super::{FrameSource, RawFrame};
use crate::error::Result;

/// Generates noisy PNG frames for every camera. Pairs with the simulated
/// gateway so the monitor can run without hardware.
#[derive(Debug, Clone)]
pub struct SyntheticFrameSource {
    width: u32,
    height: u32,
}

impl SyntheticFrameSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    fn render(&self) -> Result<Vec<u8>> {
        let mut rng = thread_rng();
        let base: u8 = rng.gen_range(60..200);
        let buffer = ImageBuffer::from_fn(self.width, self.height, |x, y| {
            let shade = base.wrapping_add(((x + y) % 32) as u8);
            Rgb([shade, shade, base])
        });

        let mut png = Vec::new();
        DynamicImage::ImageRgb8(buffer).write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)?;
        Ok(png)
    }
}

#[async_trait]
impl FrameSource for SyntheticFrameSource {
    async fn capture(&self, camera_id: &str) -> Result<Option<RawFrame>> {
        Ok(Some(RawFrame {
            camera_id: camera_id.to_string(),
            data: self.render()?,
            captured_at: chrono::Utc::now(),
        }))
    }
}
