//! Body formats: how request bodies are decoded and responses encoded

use crate::error::{RouteError, RouteResult};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// URL-decoded `name → [values]` pairs (query strings and form bodies)
pub type FormData = HashMap<String, Vec<String>>;

/// Declared format of an endpoint's request or response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    /// `application/x-www-form-urlencoded`
    Form,
    /// Bytes passed through untouched; the handler owns the response
    Raw,
    Plain,
    Html,
    Js,
}

impl Format {
    /// `Content-Type` injected for responses in this format
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Form => "application/x-www-form-urlencoded",
            Self::Raw => "application/octet-stream",
            Self::Plain => "text/plain; charset=utf-8",
            Self::Html => "text/html; charset=utf-8",
            Self::Js => "application/javascript; charset=utf-8",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Form => "form",
            Self::Raw => "raw",
            Self::Plain => "plain",
            Self::Html => "html",
            Self::Js => "js",
        }
    }

    /// Decode a request body declared in this format
    pub fn decode(self, bytes: &[u8]) -> RouteResult<RequestBody> {
        match self {
            Self::Raw => Ok(RequestBody::Bytes(bytes.to_vec())),
            Self::Json => serde_json::from_slice(bytes)
                .map(RequestBody::Json)
                .map_err(|e| RouteError::BadInput(format!("Invalid JSON body: {e}"))),
            Self::Form => parse_form(utf8(bytes)?).map(RequestBody::Form),
            Self::Plain | Self::Html | Self::Js => Ok(RequestBody::Text(utf8(bytes)?.to_string())),
        }
    }
}

impl FromStr for Format {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "form" | "urlencoded" => Ok(Self::Form),
            "raw" => Ok(Self::Raw),
            "plain" | "text" => Ok(Self::Plain),
            "html" => Ok(Self::Html),
            "js" | "javascript" => Ok(Self::Js),
            other => Err(RouteError::Registration(format!("Unknown format: {other}"))),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Request body after decoding
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    /// Not decoded: idempotent method or no body sent
    #[default]
    Empty,
    Json(Value),
    Form(FormData),
    Text(String),
    Bytes(Vec<u8>),
}

impl RequestBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_form(&self) -> Option<&FormData> {
        match self {
            Self::Form(form) => Some(form),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

fn utf8(bytes: &[u8]) -> RouteResult<&str> {
    std::str::from_utf8(bytes)
        .map_err(|e| RouteError::BadInput(format!("Body is not valid UTF-8: {e}")))
}

/// Parse `a=1&b=two+words&a=3` into `{a: [1, 3], b: ["two words"]}`
pub fn parse_form(input: &str) -> RouteResult<FormData> {
    let mut form = FormData::new();
    for pair in input.split('&').filter(|p| !p.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        form.entry(decode_component(name)?)
            .or_default()
            .push(decode_component(value)?);
    }
    Ok(form)
}

fn decode_component(raw: &str) -> RouteResult<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| RouteError::BadInput(format!("Invalid percent-encoding in {raw:?}: {e}")))
}
