//! Request object handed to endpoint handlers

use crate::error::RouteResult;
use crate::format::{parse_form, FormData, RequestBody};
use http::{HeaderMap, Method};
use std::net::SocketAddr;

/// Request target split as `path;params?query#fragment`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Uri {
    pub path: String,
    pub params: String,
    pub query: FormData,
    pub fragment: String,
}

impl Uri {
    /// Split a request target. The query string is URL-decoded; the path is
    /// kept as sent so it matches registered locations literally.
    pub fn parse(target: &str) -> RouteResult<Self> {
        let (rest, fragment) = target.split_once('#').unwrap_or((target, ""));
        let (rest, query) = rest.split_once('?').unwrap_or((rest, ""));
        let (path, params) = rest.split_once(';').unwrap_or((rest, ""));

        Ok(Self {
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            params: params.to_string(),
            query: parse_form(query)?,
            fragment: fragment.to_string(),
        })
    }

    /// First value of a query parameter
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query.get(name)?.first().map(String::as_str)
    }
}

/// What the host knows about the connection
#[derive(Debug, Clone, Default)]
pub struct TransportContext {
    pub headers: HeaderMap,
    pub remote_addr: Option<SocketAddr>,
}

/// A decoded request
#[derive(Debug, Clone)]
pub struct Request {
    pub uri: Uri,
    pub method: Method,
    pub transport_context: TransportContext,
    pub body: RequestBody,
}

/// Methods whose body is decoded before the handler runs
pub(crate) fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PATCH)
}
