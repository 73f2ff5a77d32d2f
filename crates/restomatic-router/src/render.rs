//! Error rendering at the router boundary

use crate::error::RouteError;
use crate::format::Format;
use crate::response::finish;
use http::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use http::HeaderMap;
use serde_json::json;
use tracing::{error, warn};

const ERROR_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>{status} {reason}</title></head>
<body>
<h1>{status} {reason}</h1>
<p>{message}</p>
</body>
</html>
"#;

/// Escape HTML special characters before embedding text in markup
pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Render `error` as a response in `format`
pub fn render_error(error: &RouteError, format: Format) -> http::Response<Vec<u8>> {
    let status = error.status_code();
    let message = error.to_string();

    if status.is_server_error() {
        error!(status = status.as_u16(), %message, "Request failed");
    } else {
        warn!(status = status.as_u16(), %message, "Request rejected");
    }

    let reason = status.canonical_reason().unwrap_or("Error");
    let body = match format {
        Format::Html | Format::Js => ERROR_PAGE
            .replace("{status}", status.as_str())
            .replace("{reason}", reason)
            .replace("{message}", &escape_html(&message)),
        Format::Json => json!({ "message": message }).to_string(),
        Format::Plain | Format::Raw | Format::Form => escape_html(&message),
    };
    let content_type = match format {
        Format::Html | Format::Js => Format::Html.content_type(),
        Format::Json => Format::Json.content_type(),
        Format::Plain | Format::Raw | Format::Form => Format::Plain.content_type(),
    };

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let RouteError::MethodNotAllowed { allowed, .. } = error {
        let allow = allowed
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        if let Ok(value) = HeaderValue::from_str(&allow) {
            headers.insert(ALLOW, value);
        }
    }

    finish(status, headers, body.into_bytes())
}
