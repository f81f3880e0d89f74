use async_trait::async_trait;
use sentinel_common::SafetyAnalysis;

use crate::camera::EncodedImage;
use crate::error::Result;

pub mod http;
pub mod simulated;

pub use http::HttpAnalysisGateway;
pub use simulated::SimulatedGateway;

/// Remote hazard analysis. Returned analyses are raw: confidence filtering and
/// the safe verdict are recomputed locally.
#[async_trait]
pub trait AnalysisGateway: Send + Sync {
    async fn analyze(&self, image: &EncodedImage) -> Result<SafetyAnalysis>;
}
