use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use podrunner_core::Error as ExecutionError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Execution(error) => match error {
                ExecutionError::Validation(_) => StatusCode::BAD_REQUEST,
                ExecutionError::Orchestrator { .. } | ExecutionError::NotFound { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                ExecutionError::DeadlineExceeded { .. } => StatusCode::GATEWAY_TIMEOUT,
                ExecutionError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::AuthenticationFailed => "authentication",
            ApiError::InvalidBody(_) => "validation",
            ApiError::Execution(error) => error.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_response = ErrorResponse {
            error: self.to_string(),
            kind: self.kind(),
            unit: match &self {
                ApiError::Execution(error) => error.unit_name().map(str::to_string),
                _ => None,
            },
        };

        let body = serde_json::to_string(&error_response)
            .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", self));

        let mut response = Response::new(body.into());
        *response.status_mut() = status;

        response.headers_mut().insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        response
    }
}
