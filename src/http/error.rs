//! Failure taxonomy and its HTTP mapping.
//!
//! Every failure that reaches the transport boundary is an [`ApiError`].
//! Turning it into a response attaches an [`ErrorReport`] extension; the
//! instrumentation middleware reads that report to label `http_errors_total`
//! and write the ERROR record. The response body only carries the stable
//! `{ "code", "message" }` shape; `detail` never leaves the log.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Failure classes. The string form is the `error_type` metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Internal,
    CascadeFailure,
    Timeout,
    DownstreamError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation_error",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal_error",
            ErrorKind::CascadeFailure => "cascade_failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::DownstreamError => "downstream_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Conflict => StatusCode::BAD_REQUEST,
            ErrorKind::Internal
            | ErrorKind::CascadeFailure
            | ErrorKind::Timeout
            | ErrorKind::DownstreamError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A handler failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    detail: Option<String>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn cascade(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CascadeFailure, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn downstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DownstreamError, message)
    }

    /// Internal detail for the log sink only.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Response extension describing a failed request.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'static str,
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.kind.as_str(),
            message: &self.message,
        };
        let mut response = (self.kind.status(), Json(body)).into_response();
        response.extensions_mut().insert(ErrorReport {
            kind: self.kind,
            message: self.message,
            detail: self.detail,
        });
        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation("Invalid request body").with_detail(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation("Invalid path parameter").with_detail(rejection.body_text())
    }
}
