use sentinel_common::CameraInfo;
use std::collections::HashMap;
use tracing::info;

use crate::config::CameraConfig;
use crate::error::{MonitorError, Result};

/// Known cameras in enumeration order. Cameras are never removed, only
/// deactivated; order is the scheduler's tie-break.
#[derive(Debug, Clone, Default)]
pub struct CameraRegistry {
    cameras: Vec<CameraInfo>,
}

impl CameraRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persisted labels take precedence over configured ones.
    pub fn from_configs(configs: &[CameraConfig], labels: &HashMap<String, String>) -> Self {
        let mut registry = Self::new();
        for config in configs {
            let label = labels
                .get(&config.id)
                .cloned()
                .unwrap_or_else(|| config.label.clone());
            if registry.register(&config.id, &label) && !config.active {
                if let Some(camera) = registry.cameras.last_mut() {
                    camera.active = false;
                }
            }
        }
        registry
    }

    /// Adds a newly enumerated device as active. Re-registering a known id is a no-op.
    pub fn register(&mut self, id: &str, label: &str) -> bool {
        if self.get(id).is_some() {
            return false;
        }
        self.cameras.push(CameraInfo {
            id: id.to_string(),
            label: label.to_string(),
            active: true,
        });
        info!("Registered camera {} ({})", id, label);
        true
    }

    pub fn get(&self, id: &str) -> Option<&CameraInfo> {
        self.cameras.iter().find(|c| c.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut CameraInfo> {
        self.cameras
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| MonitorError::UnknownCamera(id.to_string()))
    }

    pub fn set_active(&mut self, id: &str, active: bool) -> Result<()> {
        let camera = self.get_mut(id)?;
        if camera.active != active {
            camera.active = active;
            info!("Camera {} {}", id, if active { "activated" } else { "deactivated" });
        }
        Ok(())
    }

    pub fn rename(&mut self, id: &str, label: &str) -> Result<()> {
        let camera = self.get_mut(id)?;
        camera.label = label.to_string();
        Ok(())
    }

    pub fn active_ids(&self) -> Vec<String> {
        self.cameras
            .iter()
            .filter(|c| c.active)
            .map(|c| c.id.clone())
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.cameras.iter().filter(|c| c.active).count()
    }

    pub fn list(&self) -> &[CameraInfo] {
        &self.cameras
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(id: &str, label: &str, active: bool) -> CameraConfig {
        CameraConfig {
            id: id.to_string(),
            label: label.to_string(),
            snapshot_url: None,
            active,
        }
    }

    #[test]
    fn persisted_labels_override_configured_ones() {
        let labels = HashMap::from([("cam-2".to_string(), "Loading Bay".to_string())]);
        let registry = CameraRegistry::from_configs(
            &[config("cam-1", "Line 1", true), config("cam-2", "Camera 2", false)],
            &labels,
        );

        assert_eq!(registry.get("cam-2").unwrap().label, "Loading Bay");
        assert_eq!(registry.active_ids(), vec!["cam-1".to_string()]);
    }

    #[test]
    fn deactivated_cameras_are_kept() {
        let mut registry = CameraRegistry::new();
        registry.register("cam-1", "Line 1");
        registry.register("cam-2", "Line 2");
        registry.set_active("cam-1", false).unwrap();

        assert_eq!(registry.list().len(), 2);
        assert_eq!(registry.active_count(), 1);
        assert!(!registry.register("cam-1", "Duplicate"));
    }

    #[test]
    fn unknown_camera_is_an_error() {
        let mut registry = CameraRegistry::new();
        assert!(matches!(
            registry.rename("ghost", "x"),
            Err(MonitorError::UnknownCamera(_))
        ));
    }
}
