//! Endpoints: what a location/method pair dispatches to

use crate::error::{RouteError, RouteResult};
use crate::format::Format;
use crate::request::Request;
use crate::response::Response;
use http::Method;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Request handler
///
/// Implemented for any `Fn(&Request) -> RouteResult<Response>` closure.
pub trait Handler: Send + Sync {
    fn call(&self, request: &Request) -> RouteResult<Response>;
}

impl<F> Handler for F
where
    F: Fn(&Request) -> RouteResult<Response> + Send + Sync,
{
    fn call(&self, request: &Request) -> RouteResult<Response> {
        self(request)
    }
}

/// What an endpoint serves
#[derive(Clone)]
pub enum EndpointTarget {
    Handler(Arc<dyn Handler>),
    /// File read on every request; `Content-Type` guessed from its extension
    StaticFile(PathBuf),
    /// Fixed bytes with a fixed `Content-Type`
    StaticData {
        bytes: Arc<[u8]>,
        content_type: String,
    },
}

impl EndpointTarget {
    /// Wrap a closure handler
    pub fn handler<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> RouteResult<Response> + Send + Sync + 'static,
    {
        Self::Handler(Arc::new(handler))
    }

    pub fn static_file(path: impl Into<PathBuf>) -> Self {
        Self::StaticFile(path.into())
    }

    pub fn static_data(bytes: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self::StaticData {
            bytes: Arc::from(bytes.into()),
            content_type: content_type.into(),
        }
    }

    pub(crate) fn serve(&self, request: &Request) -> RouteResult<Response> {
        match self {
            Self::Handler(handler) => handler.call(request),
            Self::StaticFile(path) => {
                debug!(path = %path.display(), "Serving static file");
                let bytes = std::fs::read(path).map_err(|source| RouteError::Io {
                    path: path.clone(),
                    source,
                })?;
                let mime = mime_guess::from_path(path).first_or_octet_stream();
                Response::bytes(bytes).with_header("content-type", mime.as_ref())
            }
            Self::StaticData {
                bytes,
                content_type,
            } => Response::bytes(bytes.to_vec()).with_header("content-type", content_type),
        }
    }

    fn is_static(&self) -> bool {
        !matches!(self, Self::Handler(_))
    }
}

impl fmt::Debug for EndpointTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(_) => f.write_str("Handler"),
            Self::StaticFile(path) => f.debug_tuple("StaticFile").field(path).finish(),
            Self::StaticData { bytes, content_type } => f
                .debug_struct("StaticData")
                .field("len", &bytes.len())
                .field("content_type", content_type)
                .finish(),
        }
    }
}

/// How a location is compared with the request path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    /// Path equals the location
    Exact,
    /// Path starts with the location
    Prefix,
}

/// One registration: location, method, target and formats.
///
/// Handler endpoints default to JSON in and out. Static endpoints default
/// to raw formats, so the target's own `Content-Type` is kept.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub kind: MatchKind,
    pub location: String,
    pub method: Method,
    pub target: EndpointTarget,
    pub in_format: Format,
    pub out_format: Format,
    /// Any other method on this location answers 405, even when a prefix
    /// endpoint would accept it
    pub disallow_other_methods: bool,
}

impl Endpoint {
    pub fn new(kind: MatchKind, location: impl Into<String>, method: Method, target: EndpointTarget) -> Self {
        let format = if target.is_static() { Format::Raw } else { Format::Json };
        Self {
            kind,
            location: location.into(),
            method,
            target,
            in_format: format,
            out_format: format,
            disallow_other_methods: false,
        }
    }

    pub fn exact(location: impl Into<String>, method: Method, target: EndpointTarget) -> Self {
        Self::new(MatchKind::Exact, location, method, target)
    }

    pub fn prefix(location: impl Into<String>, method: Method, target: EndpointTarget) -> Self {
        Self::new(MatchKind::Prefix, location, method, target)
    }

    pub fn in_format(mut self, format: Format) -> Self {
        self.in_format = format;
        self
    }

    pub fn out_format(mut self, format: Format) -> Self {
        self.out_format = format;
        self
    }

    pub fn disallow_other_methods(mut self) -> Self {
        self.disallow_other_methods = true;
        self
    }

    /// Whether the handler builds the whole response itself
    pub(crate) fn delegates_response(&self) -> bool {
        self.in_format == Format::Raw || self.out_format == Format::Raw
    }
}
