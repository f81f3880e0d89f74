pub mod bootstrap;
pub mod camera;
pub mod config;
pub mod error;
pub mod gateway;
pub mod messaging;
pub mod processing;
pub mod storage;
pub mod utils;

pub use bootstrap::build_monitor;
pub use config::MonitorConfig;
pub use error::{MonitorError, Result};
pub use processing::{MonitorDeps, MonitorEngine, MonitorHandle, MonitorSnapshot};
