use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use control_plane::now_rfc3339;
use kernel::KernelError;
use kernel_space::HelperError;
use serde::Serialize;
use thiserror::Error;

/// Every failure leaves the server as `{error, timestamp}`.
#[derive(Debug, Error)]
#[error("{status}: {message}")]
pub struct AppError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    timestamp: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn rate_limited() -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded")
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            timestamp: now_rfc3339(),
        });
        (self.status, body).into_response()
    }
}

impl From<KernelError> for AppError {
    fn from(err: KernelError) -> Self {
        match err {
            KernelError::CapabilityDisabled(_) => AppError::unavailable(err.to_string()),
            KernelError::BadRequest(message) => AppError::bad_request(message),
            KernelError::Upstream(message) => AppError::internal(message),
            KernelError::NotInitialized | KernelError::InitializationFailed(_) => {
                AppError::internal(err.to_string())
            }
        }
    }
}

impl From<HelperError> for AppError {
    fn from(err: HelperError) -> Self {
        match err {
            HelperError::Disabled(_) => AppError::unavailable(err.to_string()),
            HelperError::Schema(_) => AppError::bad_request(err.to_string()),
            HelperError::Ingestion(_) => AppError::internal(err.to_string()),
            HelperError::Kernel(inner) => inner.into(),
        }
    }
}

impl From<control_plane::ConfigError> for AppError {
    fn from(err: control_plane::ConfigError) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::internal(format!("config file: {err}"))
    }
}

