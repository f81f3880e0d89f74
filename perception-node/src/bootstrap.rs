use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::camera::registry::CameraRegistry;
use crate::camera::snapshot::HttpSnapshotSource;
use crate::camera::synthetic::SyntheticFrameSource;
use crate::camera::FrameSource;
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::gateway::{AnalysisGateway, HttpAnalysisGateway, SimulatedGateway};
use crate::messaging::LogNotifier;
use crate::processing::{MonitorDeps, MonitorEngine, MonitorHandle};
use crate::storage::LabelStore;
use crate::utils::metrics::Metrics;

const SIMULATED_LATENCY: Duration = Duration::from_millis(1_500);
const SIMULATED_HAZARD_PROBABILITY: f64 = 0.35;

/// Wires the configured collaborators around a fresh monitor loop. The
/// returned engine still has to be spawned.
pub async fn build_monitor(config: &MonitorConfig) -> Result<(MonitorEngine, MonitorHandle)> {
    // Restore custom camera labels
    let labels = LabelStore::new(config.storage.labels_path.clone());
    let saved = match labels.load().await {
        Ok(saved) => saved,
        Err(e) => {
            warn!("Ignoring camera labels: {}", e);
            Default::default()
        }
    };

    // Build the camera registry
    let registry = CameraRegistry::from_configs(&config.cameras, &saved);
    if registry.list().is_empty() {
        warn!("No cameras configured, monitor will stay idle");
    }

    // Pick real or simulated collaborators
    let (gateway, frames): (Arc<dyn AnalysisGateway>, Arc<dyn FrameSource>) = if config.gateway.simulated {
        info!("Using simulated analysis gateway and synthetic frames");
        (
            Arc::new(SimulatedGateway::new(SIMULATED_LATENCY, SIMULATED_HAZARD_PROBABILITY)),
            Arc::new(SyntheticFrameSource::new(1280, 720)),
        )
    } else {
        info!("Using analysis gateway at {}", config.gateway.endpoint);
        (
            Arc::new(HttpAnalysisGateway::new(&config.gateway)?),
            Arc::new(HttpSnapshotSource::new(&config.cameras, config.gateway.request_timeout())?),
        )
    };

    let deps = MonitorDeps {
        gateway,
        frames,
        notifier: Arc::new(LogNotifier),
        metrics: Arc::new(Metrics::new()?),
        labels: Some(labels),
    };

    Ok(MonitorEngine::new(config, registry, deps))
}
