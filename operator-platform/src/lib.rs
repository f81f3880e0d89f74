pub mod api;
pub mod config;
pub mod error;

use sentinel_monitor::MonitorHandle;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub monitor: MonitorHandle,
}

impl AppState {
    pub fn new(monitor: MonitorHandle) -> Self {
        Self { monitor }
    }
}
