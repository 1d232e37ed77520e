use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use service::auth::RedirectTo;
use service::notify::Notification;
use service::ServiceError;
use thiserror::Error;
use tracing::{error, warn};

/// Error returned by handlers and middleware.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    /// A route guard refused the request.
    #[error("redirect to {}", .0.path())]
    Guard(RedirectTo),
    #[error("session still loading")]
    Loading,
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Service(err) => match err {
                ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ServiceError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
                ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
                ServiceError::Remote(_) => StatusCode::BAD_GATEWAY,
                ServiceError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Guard(RedirectTo::Login) => StatusCode::UNAUTHORIZED,
            Self::Guard(RedirectTo::Home) => StatusCode::FORBIDDEN,
            Self::Loading => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::Service(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        let mut body = json!({
            "error": self.to_string(),
            "notification": Notification::error(format!("Error: {}", self.user_message())),
        });
        match &self {
            Self::Service(ServiceError::Validation(fields)) => body["fields"] = json!(fields),
            Self::Guard(to) => body["redirect"] = json!(to.path()),
            _ => {}
        }
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}
