use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Gateway responded with status {0}")]
    GatewayStatus(u16),

    #[error("Malformed gateway response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("Monitor channel closed")]
    ChannelClosed,

    #[error("Unknown camera: {0}")]
    UnknownCamera(String),
}

impl MonitorError {
    /// Lag-like failures that should surface as an inconclusive reading rather
    /// than an analysis error.
    pub fn is_lag(&self) -> bool {
        matches!(self, MonitorError::Timeout(_) | MonitorError::GatewayStatus(_))
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            MonitorError::Timeout(error.to_string())
        } else if let Some(status) = error.status() {
            MonitorError::GatewayStatus(status.as_u16())
        } else if error.is_decode() {
            MonitorError::MalformedResponse(error.to_string())
        } else {
            MonitorError::Gateway(error.to_string())
        }
    }
}

impl From<image::ImageError> for MonitorError {
    fn from(error: image::ImageError) -> Self {
        MonitorError::Image(error.to_string())
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(error: serde_json::Error) -> Self {
        MonitorError::Serialization(error.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for MonitorError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        MonitorError::Timeout(error.to_string())
    }
}

impl From<config::ConfigError> for MonitorError {
    fn from(error: config::ConfigError) -> Self {
        MonitorError::Config(error.to_string())
    }
}

impl From<prometheus::Error> for MonitorError {
    fn from(error: prometheus::Error) -> Self {
        MonitorError::Metrics(error.to_string())
    }
}

impl From<validator::ValidationErrors> for MonitorError {
    fn from(error: validator::ValidationErrors) -> Self {
        MonitorError::Config(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lag_errors_are_timeouts_and_bad_statuses() {
        assert!(MonitorError::Timeout("12s".into()).is_lag());
        assert!(MonitorError::GatewayStatus(503).is_lag());
        assert!(!MonitorError::MalformedResponse("eof".into()).is_lag());
        assert!(!MonitorError::Gateway("refused".into()).is_lag());
    }
}
