//! Error types for the endpoint router

use http::{Method, StatusCode};
use restomatic_sql::CompositorError;
use std::path::PathBuf;
use thiserror::Error;

/// Router error type
///
/// Every variant maps to an HTTP status via [`RouteError::status_code`];
/// the router renders these into responses and never hands them to the host.
#[derive(Error, Debug)]
pub enum RouteError {
    /// No endpoint matches the path
    #[error("No endpoint found for {path}")]
    NotFound { path: String },

    /// An endpoint matches the path but not the method
    #[error("Method {method} is not allowed")]
    MethodNotAllowed { method: Method, allowed: Vec<Method> },

    /// Request body does not match the endpoint's declared format
    #[error("Bad request body: {0}")]
    BadInput(String),

    /// Request body exceeds the configured limit
    #[error("Request body of {size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Handler-chosen status and message
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    /// Uncaught handler failure
    #[error("Handler failed: {0}")]
    Handler(String),

    /// Compositor failure escaping a handler
    #[error(transparent)]
    Compositor(#[from] CompositorError),

    /// Static file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Handler output cannot be encoded in the endpoint's format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Endpoint registration rejected
    #[error("Invalid endpoint registration: {0}")]
    Registration(String),
}

impl RouteError {
    /// Error carrying its own status, for handlers
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadInput(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Status { status, .. } => *status,
            Self::Compositor(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                StatusCode::NOT_FOUND
            }
            Self::Handler(_) | Self::Io { .. } | Self::InvalidResponse(_) | Self::Registration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<anyhow::Error> for RouteError {
    fn from(error: anyhow::Error) -> Self {
        let error = match error.downcast::<RouteError>() {
            Ok(route_error) => return route_error,
            Err(other) => other,
        };
        match error.downcast::<CompositorError>() {
            Ok(compositor_error) => Self::Compositor(compositor_error),
            Err(other) => Self::Handler(format!("{other:#}")),
        }
    }
}

/// Result type for router operations
pub type RouteResult<T> = Result<T, RouteError>;
