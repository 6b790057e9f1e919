//! Error rendering for the platform API.
//!
//! Errors go out in the platform API error format described at
//! <https://devcenter.heroku.com/articles/platform-api-reference#errors>:
//! a JSON object with an `id` naming the error class and a human readable
//! `message`.

use axum::http::StatusCode;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use dockyard_protocol::{BackendError, ValidationError};

use super::codec::{encode, DecodeError};

/// Wire-format error body.
///
/// `status` never goes over the wire. When set, it overrides the status the
/// renderer would otherwise use.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ErrorResource {
    #[serde(default)]
    pub id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip)]
    pub status: Option<StatusCode>,
}

impl ErrorResource {
    pub fn new(id: impl Into<String>, message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            url: None,
            status: Some(status),
        }
    }

    /// An error that only carries a message and renders with the default status
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            message: message.into(),
            url: None,
            status: None,
        }
    }

    pub fn bad_request() -> Self {
        Self::new(
            "bad_request",
            "Request invalid, validate usage and try again",
            StatusCode::BAD_REQUEST,
        )
    }

    pub fn not_found() -> Self {
        Self::new(
            "not_found",
            "Request failed, the specified resource does not exist",
            StatusCode::NOT_FOUND,
        )
    }

    pub fn unauthorized() -> Self {
        Self::new(
            "unauthorized",
            "Request not authenticated, API token is missing, invalid or expired",
            StatusCode::UNAUTHORIZED,
        )
    }

    pub fn two_factor() -> Self {
        Self::new(
            "two_factor",
            "Two factor code is required.",
            StatusCode::UNAUTHORIZED,
        )
    }

    pub fn not_acceptable() -> Self {
        Self::new(
            "not_acceptable",
            "Requested API version is not supported, use version 3",
            StatusCode::NOT_ACCEPTABLE,
        )
    }

    pub fn request_timeout() -> Self {
        Self::new(
            "request_timeout",
            "Request took too long to complete",
            StatusCode::SERVICE_UNAVAILABLE,
        )
    }
}

/// Everything an operation can fail with.
///
/// The three variants are the three ways an error can be rendered. Adding a
/// variant means adding a row to [`classify`].
#[derive(Error, Debug)]
pub enum ApiError {
    /// A caller-visible error with its own id and message
    #[error(transparent)]
    Resource(#[from] ErrorResource),

    /// A backend validation failure. Rendered as a generic bad request.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Anything else. Rendered with its message only.
    #[error(transparent)]
    Opaque(#[from] anyhow::Error),
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound { .. } => ApiError::Resource(ErrorResource::not_found()),
            BackendError::Validation(err) => ApiError::Validation(err),
            err @ BackendError::Internal { .. } => ApiError::Opaque(err.into()),
        }
    }
}

/// An [`ApiError`] paired with the status it renders with when the error
/// itself does not declare one.
#[derive(Debug)]
pub struct Failure {
    pub error: ApiError,
    pub default_status: StatusCode,
}

impl Failure {
    pub fn new(error: impl Into<ApiError>, default_status: StatusCode) -> Self {
        Self {
            error: error.into(),
            default_status,
        }
    }

    fn internal(error: impl Into<ApiError>) -> Self {
        Self::new(error, StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<ApiError> for Failure {
    fn from(err: ApiError) -> Self {
        match err {
            err @ ApiError::Validation(_) => Failure::new(err, StatusCode::BAD_REQUEST),
            err => Failure::internal(err),
        }
    }
}

impl From<ErrorResource> for Failure {
    fn from(err: ErrorResource) -> Self {
        Failure::internal(err)
    }
}

impl From<ValidationError> for Failure {
    fn from(err: ValidationError) -> Self {
        ApiError::from(err).into()
    }
}

impl From<BackendError> for Failure {
    fn from(err: BackendError) -> Self {
        ApiError::from(err).into()
    }
}

impl From<anyhow::Error> for Failure {
    fn from(err: anyhow::Error) -> Self {
        Failure::internal(err)
    }
}

impl From<DecodeError> for Failure {
    fn from(err: DecodeError) -> Self {
        Failure::new(anyhow::Error::new(err), StatusCode::BAD_REQUEST)
    }
}

/// Decide the status and body an error renders as.
///
/// | error             | status                              | body                 |
/// |-------------------|-------------------------------------|----------------------|
/// | `Resource`        | declared status, else default       | the resource         |
/// | `Validation`      | default                             | fixed `bad_request`  |
/// | `Opaque`          | default                             | `{message}`          |
pub fn classify(err: ApiError, default_status: StatusCode) -> (StatusCode, ErrorResource) {
    match err {
        ApiError::Resource(resource) => (resource.status.unwrap_or(default_status), resource),
        ApiError::Validation(_) => (default_status, ErrorResource::bad_request()),
        ApiError::Opaque(err) => (default_status, ErrorResource::message(err.to_string())),
    }
}

/// Sink for rendered errors
pub trait ErrorLog: Send + Sync + 'static {
    fn record(&self, status: StatusCode, resource: &ErrorResource);
}

/// Emits one structured `tracing` event per rendered error
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorLog;

impl ErrorLog for TracingErrorLog {
    fn record(&self, status: StatusCode, resource: &ErrorResource) {
        error!(
            id = %resource.id,
            message = %resource.message,
            status = status.as_u16(),
            "request failed"
        );
    }
}

/// Turns failures into platform API error responses
#[derive(Clone)]
pub struct ErrorRenderer {
    log: Arc<dyn ErrorLog>,
}

impl ErrorRenderer {
    pub fn new(log: Arc<dyn ErrorLog>) -> Self {
        Self { log }
    }

    /// Render `err`, falling back to `default_status` when the error does
    /// not carry its own. The rendered resource is logged before the
    /// response is built.
    pub fn render(&self, err: ApiError, default_status: StatusCode) -> Response {
        let (status, resource) = classify(err, default_status);
        self.log.record(status, &resource);
        encode(status, &resource)
    }

    pub fn render_failure(&self, failure: Failure) -> Response {
        self.render(failure.error, failure.default_status)
    }
}

impl Default for ErrorRenderer {
    fn default() -> Self {
        Self::new(Arc::new(TracingErrorLog))
    }
}

impl std::fmt::Debug for ErrorRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorRenderer").finish_non_exhaustive()
    }
}
