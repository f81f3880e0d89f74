use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use sentinel_monitor::MonitorError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OperatorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Monitor(#[from] MonitorError),
}

impl From<validator::ValidationErrors> for OperatorError {
    fn from(error: validator::ValidationErrors) -> Self {
        OperatorError::BadRequest(error.to_string())
    }
}

impl ResponseError for OperatorError {
    fn status_code(&self) -> StatusCode {
        match self {
            OperatorError::BadRequest(_) => StatusCode::BAD_REQUEST,
            OperatorError::Monitor(MonitorError::UnknownCamera(_)) => StatusCode::NOT_FOUND,
            OperatorError::Monitor(MonitorError::Config(_)) => StatusCode::BAD_REQUEST,
            OperatorError::Monitor(MonitorError::ChannelClosed) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

pub type Result<T> = std::result::Result<T, OperatorError>;
