//! Error types for the form field server

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use formfield_core::FormFieldError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not a PDF file: {0}")]
    NotAPdf(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Upload exceeds the {0} MB limit")]
    PayloadTooLarge(usize),

    #[error("PDF processing failed: {0}")]
    Pdf(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_)
            | ServerError::NotAPdf(_)
            | ServerError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Pdf(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ServerError::InvalidRequest(_) => "INVALID_REQUEST",
            ServerError::NotAPdf(_) => "NOT_A_PDF",
            ServerError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ServerError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ServerError::Pdf(_) => "PDF_ERROR",
            ServerError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Classify a multipart read failure, given the configured limit in MB.
    pub fn from_multipart(err: MultipartError, limit_mb: usize) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge(limit_mb)
        } else {
            ServerError::InvalidRequest(format!("Failed to read multipart body: {}", err.body_text()))
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        }

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code: self.code().to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<FormFieldError> for ServerError {
    fn from(err: FormFieldError) -> Self {
        match err {
            FormFieldError::NotAPdf(msg) => ServerError::NotAPdf(msg),
            FormFieldError::InvalidPayload(msg) => ServerError::InvalidPayload(msg),
            other => ServerError::Pdf(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("PDF task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_status() {
        let cases = [
            (FormFieldError::NotAPdf("x".into()), StatusCode::BAD_REQUEST),
            (FormFieldError::InvalidPayload("x".into()), StatusCode::BAD_REQUEST),
            (FormFieldError::Load("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (FormFieldError::Save("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (FormFieldError::Structure("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status(), status);
        }
    }

    #[test]
    fn test_payload_too_large_status() {
        assert_eq!(
            ServerError::PayloadTooLarge(25).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
