//! Error types for page responses.
//!
//! Pipeline failures never pick an HTTP status themselves. This module maps
//! them to a JSON error body with a stable code so clients and tests can tell
//! a navigation mismatch from a broken template.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use http::header;
use pageflow_core::{FailureKind, PipelineError};
use serde::Serialize;
use std::fmt;

/// Code for configurer, template and context failures.
pub const RENDER_FAILURE: &str = "RENDER_FAILURE";

/// Code for an unmatched navigation key with no fallback configured.
pub const NAVIGATION_MISMATCH: &str = "NAVIGATION_MISMATCH";

/// Code for a request abandoned at a deadline or an invalid phase move.
pub const REQUEST_ABORTED: &str = "REQUEST_ABORTED";

/// Application error returned in place of a page.
///
/// # Examples
///
/// ```ignore
/// async fn handler() -> Result<PageResponse, AppError> {
///     let page = load_page().map_err(|e| AppError::internal("Page unavailable").with_source(e))?;
///     Ok(PageResponse::new(page))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Attach the underlying error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }

    /// HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// User-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    fn log(&self) {
        if !self.status.is_server_error() {
            return;
        }
        if let Some(source) = &self.source {
            tracing::error!(
                status = %self.status,
                code = %self.code,
                message = %self.message,
                error = %source,
                "Page pipeline failed"
            );
        } else {
            tracing::error!(
                status = %self.status,
                code = %self.code,
                message = %self.message,
                "Page pipeline failed"
            );
        }
    }

    fn body(&self) -> ErrorResponse<'_> {
        ErrorResponse {
            code: &self.code,
            message: &self.message,
        }
    }

    /// Convert into a buffered response for the blocking adapter.
    #[must_use]
    pub fn into_buffered(self) -> http::Response<Vec<u8>> {
        self.log();
        let body = serde_json::to_vec(&self.body()).unwrap_or_default();
        let mut response = http::Response::new(body);
        *response.status_mut() = self.status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        response
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse<'a> {
    code: &'a str,
    message: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        (self.status, Json(self.body())).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let (code, message) = match err.kind() {
            FailureKind::NavigationMismatch => (NAVIGATION_MISMATCH, "Navigation is not configured for this page"),
            FailureKind::RenderFailure => (RENDER_FAILURE, "The page could not be rendered"),
            FailureKind::Aborted => (REQUEST_ABORTED, "The request was abandoned before the page was rendered"),
        };
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.to_string(),
            code.to_string(),
        )
        .with_source(err.into())
    }
}
