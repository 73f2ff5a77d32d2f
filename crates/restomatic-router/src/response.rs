//! Handler responses and their encoding into bytes

use crate::error::{RouteError, RouteResult};
use crate::format::Format;
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use serde::Serialize;
use serde_json::Value;

/// Body returned by a handler
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
}

impl From<Value> for ResponseBody {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for ResponseBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ResponseBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// Handler output: body, status (default 200) and extra headers
#[derive(Debug, Clone)]
pub struct Response {
    pub body: ResponseBody,
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl Response {
    pub fn new(body: impl Into<ResponseBody>) -> Self {
        Self {
            body: body.into(),
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        }
    }

    /// Serialize `value` into a JSON body
    pub fn json(value: impl Serialize) -> RouteResult<Self> {
        let value = serde_json::to_value(value)
            .map_err(|e| RouteError::InvalidResponse(format!("Unserializable body: {e}")))?;
        Ok(Self::new(value))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ResponseBody::Text(text.into()))
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(ResponseBody::Bytes(bytes.into()))
    }

    /// Empty body with a status, e.g. `204 No Content`
    pub fn empty(status: StatusCode) -> Self {
        Self::text("").with_status(status)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Append a header; the name and value must be valid HTTP header text
    pub fn with_header(mut self, name: &str, value: &str) -> RouteResult<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| RouteError::InvalidResponse(format!("Invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| RouteError::InvalidResponse(format!("Invalid header value {value:?}: {e}")))?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Append several headers given as name/value pairs
    pub fn with_headers<'a, I>(self, pairs: I) -> RouteResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        pairs
            .into_iter()
            .try_fold(self, |response, (name, value)| response.with_header(name, value))
    }

    /// Encode into the final wire response for an endpoint whose output
    /// format is `format`. `delegated` responses keep their headers as the
    /// handler set them.
    pub(crate) fn encode(self, format: Format, delegated: bool) -> RouteResult<http::Response<Vec<u8>>> {
        let body = match (self.body, format) {
            (ResponseBody::Bytes(_), Format::Json) if !delegated => {
                return Err(RouteError::InvalidResponse(
                    "Endpoint with json output must return a JSON value or string, not bytes".into(),
                ))
            }
            (ResponseBody::Bytes(bytes), _) => bytes,
            (ResponseBody::Json(value), Format::Json | Format::Raw) => serde_json::to_vec(&value)
                .map_err(|e| RouteError::InvalidResponse(format!("Unserializable body: {e}")))?,
            (ResponseBody::Text(text), Format::Json) => serde_json::to_vec(&text)
                .map_err(|e| RouteError::InvalidResponse(format!("Unserializable body: {e}")))?,
            (ResponseBody::Text(text), _) => text.into_bytes(),
            (ResponseBody::Json(_), other) => {
                return Err(RouteError::InvalidResponse(format!(
                    "Endpoint with {other} output must return a string body, not JSON"
                )))
            }
        };

        let mut headers = self.headers;
        if !delegated && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(format.content_type()));
        }
        Ok(finish(self.status, headers, body))
    }
}

impl From<Value> for Response {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl From<String> for Response {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for Response {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl<B: Into<ResponseBody>> From<(B, StatusCode)> for Response {
    fn from((body, status): (B, StatusCode)) -> Self {
        Self::new(body).with_status(status)
    }
}

impl<B: Into<ResponseBody>> From<(B, StatusCode, HeaderMap)> for Response {
    fn from((body, status, headers): (B, StatusCode, HeaderMap)) -> Self {
        Self {
            body: body.into(),
            status,
            headers,
        }
    }
}

/// Assemble the wire response; `Content-Length` always reflects `body`
pub(crate) fn finish(
    status: StatusCode,
    mut headers: HeaderMap,
    body: Vec<u8>,
) -> http::Response<Vec<u8>> {
    headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    let mut response = http::Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
