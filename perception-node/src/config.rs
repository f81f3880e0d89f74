use serde::{Deserialize, Serialize};
use sentinel_common::{utils::validate_url, AlertSettings};
use std::{path::PathBuf, time::Duration};
use validator::Validate;

use crate::error::{MonitorError, Result};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MonitorConfig {
    pub node_id: String,
    pub cameras: Vec<CameraConfig>,
    pub gateway: GatewayConfig,
    pub scheduler: SchedulerConfig,
    pub alerts: AlertConfig,
    pub history: HistoryConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CameraConfig {
    pub id: String,
    pub label: String,
    pub snapshot_url: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GatewayConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
    pub max_image_dimension: u32,
    pub jpeg_quality: u8,
    pub simulated: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerConfig {
    pub single_camera_interval_ms: u64,
    pub multi_camera_interval_ms: u64,
    pub watchdog_timeout_ms: u64,
    pub hazard_weight: f64,
    pub retention_weight: f64,
    pub retention_window_sec: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AlertConfig {
    /// Operator-editable part, also exposed through the settings API.
    pub settings: AlertSettings,
    pub sms_cooldown_sec: u64,
    pub alarm_rearm_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub labels_path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

fn default_true() -> bool {
    true
}

impl MonitorConfig {
    /// Loads `path` (if present) layered with `SENTINEL__*` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("SENTINEL").separator("__"))
            .build()?;

        let config: MonitorConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.alerts.settings.validate()?;

        if self.scheduler.watchdog_timeout_ms == 0 {
            return Err(MonitorError::Config("watchdog_timeout_ms must be positive".to_string()));
        }
        if self.scheduler.single_camera_interval_ms == 0 || self.scheduler.multi_camera_interval_ms == 0 {
            return Err(MonitorError::Config("tick intervals must be positive".to_string()));
        }
        if self.history.capacity == 0 {
            return Err(MonitorError::Config("history capacity must be positive".to_string()));
        }
        if !self.gateway.simulated {
            validate_url(&self.gateway.endpoint).map_err(MonitorError::Config)?;
        }
        if !(1..=100).contains(&self.gateway.jpeg_quality) {
            return Err(MonitorError::Config("jpeg_quality must be within 1..=100".to_string()));
        }

        for camera in &self.cameras {
            if let Some(url) = &camera.snapshot_url {
                validate_url(url).map_err(MonitorError::Config)?;
            }
        }

        Ok(())
    }
}

impl SchedulerConfig {
    /// Shorter interval when several feeds share the single analysis slot.
    pub fn tick_interval(&self, active_cameras: usize) -> Duration {
        if active_cameras > 1 {
            Duration::from_millis(self.multi_camera_interval_ms)
        } else {
            Duration::from_millis(self.single_camera_interval_ms)
        }
    }

    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_timeout_ms)
    }

    pub fn retention_window(&self) -> Duration {
        Duration::from_secs(self.retention_window_sec)
    }
}

impl AlertConfig {
    pub fn sms_cooldown(&self) -> Duration {
        Duration::from_secs(self.sms_cooldown_sec)
    }

    pub fn alarm_rearm(&self) -> Duration {
        Duration::from_millis(self.alarm_rearm_ms)
    }
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            node_id: "sentinel-monitor-1".to_string(),
            cameras: Vec::new(),
            gateway: GatewayConfig::default(),
            scheduler: SchedulerConfig::default(),
            alerts: AlertConfig::default(),
            history: HistoryConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8500/v1/analyze".to_string(),
            api_key: None,
            request_timeout_ms: 12_000,
            max_image_dimension: 640,
            jpeg_quality: 60,
            simulated: false,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            single_camera_interval_ms: 5_000,
            multi_camera_interval_ms: 2_500,
            watchdog_timeout_ms: 15_000,
            hazard_weight: 40.0,
            retention_weight: 60.0,
            retention_window_sec: 90,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            settings: AlertSettings::default(),
            sms_cooldown_sec: 300,
            alarm_rearm_ms: 3_000,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 10 }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            labels_path: PathBuf::from("data/camera_labels.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
