pub mod alert;
pub mod context;
pub mod engine;
pub mod hazard_filter;
pub mod history;
pub mod predictions;
pub mod scheduler;

pub use context::{MonitorContext, MonitorSnapshot};
pub use engine::{MonitorDeps, MonitorEngine, MonitorHandle};
