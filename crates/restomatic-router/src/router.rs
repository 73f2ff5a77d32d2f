//! Endpoint router: the `(request) → response` boundary
//!
//! [`EndpointRouter::handle`] is the single place where failures turn into
//! responses. Everything below it returns [`RouteResult`]; the router
//! renders any error in the resolved endpoint's output format (or the
//! configured fallback when no endpoint was resolved), so callers only
//! ever see a finished response.

use crate::endpoint::Endpoint;
use crate::error::{RouteError, RouteResult};
use crate::format::{Format, RequestBody};
use crate::render::render_error;
use crate::request::{carries_body, Request, TransportContext, Uri};
use crate::table::{Resolution, RouteTable};
use http::request::Parts;
use restomatic_config::RouterConfig;
use std::net::SocketAddr;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info};

/// Exact/prefix endpoint router
#[derive(Debug)]
pub struct EndpointRouter {
    table: RouteTable,
    config: RouterConfig,
    fallback_format: Format,
}

impl EndpointRouter {
    pub fn new(config: RouterConfig) -> RouteResult<Self> {
        let fallback_format = config.fallback_format.parse()?;
        Ok(Self {
            table: RouteTable::new(),
            config,
            fallback_format,
        })
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Add an endpoint; the same kind, location and method can only be
    /// registered once
    pub fn register(&mut self, endpoint: Endpoint) -> RouteResult<()> {
        info!(
            kind = ?endpoint.kind,
            location = %endpoint.location,
            method = %endpoint.method,
            in_format = %endpoint.in_format,
            out_format = %endpoint.out_format,
            "Registering endpoint"
        );
        self.table.insert(endpoint)
    }

    /// [`register`](Self::register) in builder style
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> RouteResult<Self> {
        self.register(endpoint)?;
        Ok(self)
    }

    pub fn resolve(&self, path: &str, method: &http::Method) -> Resolution {
        self.table.resolve(path, method)
    }

    /// Render an error raised outside [`handle`](Self::handle) (e.g. by a
    /// host adapter) in the fallback format
    pub fn render_error(&self, error: &RouteError) -> http::Response<Vec<u8>> {
        render_error(error, self.fallback_format)
    }

    /// Handle one request. Never fails: errors become rendered responses.
    pub fn handle(&self, request: http::Request<Vec<u8>>) -> http::Response<Vec<u8>> {
        let (format, result) = self.dispatch(request);
        match result {
            Ok(response) => {
                debug!(status = response.status().as_u16(), "Request handled");
                response
            }
            Err(error) => render_error(&error, format),
        }
    }

    /// Resolve and serve, reporting which format errors should render in
    fn dispatch(&self, request: http::Request<Vec<u8>>) -> (Format, RouteResult<http::Response<Vec<u8>>>) {
        let (parts, body) = request.into_parts();
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let uri = match Uri::parse(target) {
            Ok(uri) => uri,
            Err(error) => return (self.fallback_format, Err(error)),
        };

        let endpoint = match self.table.resolve(&uri.path, &parts.method) {
            Resolution::Endpoint(endpoint) => endpoint,
            Resolution::MethodNotAllowed(allowed) => {
                let error = RouteError::MethodNotAllowed {
                    method: parts.method,
                    allowed,
                };
                return (self.fallback_format, Err(error));
            }
            Resolution::NotFound => {
                return (self.fallback_format, Err(RouteError::NotFound { path: uri.path }));
            }
        };

        (endpoint.out_format, self.serve(&endpoint, uri, parts, body))
    }

    fn serve(
        &self,
        endpoint: &Arc<Endpoint>,
        uri: Uri,
        parts: Parts,
        body: Vec<u8>,
    ) -> RouteResult<http::Response<Vec<u8>>> {
        let limit = self.config.max_body_bytes;
        if body.len() > limit {
            return Err(RouteError::PayloadTooLarge {
                size: body.len(),
                limit,
            });
        }

        let body = if carries_body(&parts.method) && !body.is_empty() {
            endpoint.in_format.decode(&body)?
        } else {
            RequestBody::Empty
        };

        let request = Request {
            uri,
            method: parts.method,
            transport_context: TransportContext {
                remote_addr: parts.extensions.get::<SocketAddr>().copied(),
                headers: parts.headers,
            },
            body,
        };

        let response = catch_unwind(AssertUnwindSafe(|| endpoint.target.serve(&request)))
            .map_err(|payload| {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                RouteError::Handler(format!("Handler panicked: {message}"))
            })??;

        response.encode(endpoint.out_format, endpoint.delegates_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::EndpointTarget;
    use crate::response::Response;
    use http::header::{ALLOW, CONTENT_LENGTH, CONTENT_TYPE};
    use http::{Method, StatusCode};
    use serde_json::{json, Value};

    fn request(method: Method, target: &str, body: &[u8]) -> http::Request<Vec<u8>> {
        http::Request::builder()
            .method(method)
            .uri(target)
            .body(body.to_vec())
            .unwrap()
    }

    fn body_json(response: &http::Response<Vec<u8>>) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    fn router() -> EndpointRouter {
        EndpointRouter::new(RouterConfig::default())
            .unwrap()
            .with_endpoint(Endpoint::exact(
                "/a",
                Method::GET,
                EndpointTarget::handler(|_| Ok(json!({"route": "a"}).into())),
            ))
            .unwrap()
            .with_endpoint(Endpoint::prefix(
                "/",
                Method::GET,
                EndpointTarget::handler(|req| Ok(json!({"route": "root", "path": req.uri.path}).into())),
            ))
            .unwrap()
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    #[test]
    fn test_post_to_get_only_location_is_405() {
        let response = router().handle(request(Method::POST, "/a", b"{}"));

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET");
    }

    #[test]
    fn test_unmatched_exact_path_falls_through_to_prefix() {
        let response = router().handle(request(Method::GET, "/a/b", b""));

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(&response), json!({"route": "root", "path": "/a/b"}));
    }

    #[test]
    fn test_unknown_method_and_path_is_404() {
        let response = router().handle(request(Method::DELETE, "/z", b""));

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        // No endpoint resolved: rendered in the fallback format
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
    }

    #[test]
    fn test_fallback_format_from_config() {
        let config = RouterConfig {
            fallback_format: "json".to_string(),
            ..RouterConfig::default()
        };
        let response = EndpointRouter::new(config)
            .unwrap()
            .handle(request(Method::GET, "/nothing", b""));

        assert_eq!(body_json(&response), json!({"message": "No endpoint found for /nothing"}));
    }

    #[test]
    fn test_bad_fallback_format_rejected() {
        let config = RouterConfig {
            fallback_format: "yaml".to_string(),
            ..RouterConfig::default()
        };
        assert!(EndpointRouter::new(config).is_err());
    }

    // =========================================================================
    // Body decoding
    // =========================================================================

    fn echo_router(in_format: Format, method: Method) -> EndpointRouter {
        EndpointRouter::new(RouterConfig::default())
            .unwrap()
            .with_endpoint(
                Endpoint::exact(
                    "/echo",
                    method,
                    EndpointTarget::handler(|req| {
                        Ok(match &req.body {
                            RequestBody::Empty => json!(null),
                            RequestBody::Json(value) => value.clone(),
                            RequestBody::Form(form) => json!(form),
                            RequestBody::Text(text) => json!(text),
                            RequestBody::Bytes(bytes) => json!(bytes.len()),
                        }
                        .into())
                    }),
                )
                .in_format(in_format),
            )
            .unwrap()
    }

    #[test]
    fn test_json_body_decoded_for_post() {
        let response = echo_router(Format::Json, Method::POST)
            .handle(request(Method::POST, "/echo", br#"{"n": 1}"#));
        assert_eq!(body_json(&response), json!({"n": 1}));
    }

    #[test]
    fn test_malformed_json_is_400_in_endpoint_format() {
        let response = echo_router(Format::Json, Method::POST)
            .handle(request(Method::POST, "/echo", b"{oops"));

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let message = body_json(&response)["message"].as_str().unwrap().to_string();
        assert!(message.starts_with("Bad request body"));
    }

    #[test]
    fn test_form_body_decoded() {
        let response = echo_router(Format::Form, Method::PATCH)
            .handle(request(Method::PATCH, "/echo", b"a=1&a=2"));
        assert_eq!(body_json(&response), json!({"a": ["1", "2"]}));
    }

    #[test]
    fn test_body_ignored_for_idempotent_method() {
        let response = echo_router(Format::Json, Method::DELETE)
            .handle(request(Method::DELETE, "/echo", b"{not even json"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(&response), json!(null));
    }

    #[test]
    fn test_oversized_body_is_413() {
        let config = RouterConfig {
            max_body_bytes: 4,
            ..RouterConfig::default()
        };
        let router = EndpointRouter::new(config)
            .unwrap()
            .with_endpoint(Endpoint::exact(
                "/up",
                Method::POST,
                EndpointTarget::handler(|_| Ok(Response::empty(StatusCode::NO_CONTENT))),
            ))
            .unwrap();

        let response = router.handle(request(Method::POST, "/up", b"12345"));
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    // =========================================================================
    // Handler results and failures
    // =========================================================================

    #[test]
    fn test_status_and_headers_from_handler() {
        let router = EndpointRouter::new(RouterConfig::default())
            .unwrap()
            .with_endpoint(
                Endpoint::exact(
                    "/page",
                    Method::GET,
                    EndpointTarget::handler(|_| {
                        Response::text("<p>made</p>")
                            .with_status(StatusCode::CREATED)
                            .with_header("x-request-id", "42")
                    }),
                )
                .out_format(Format::Html),
            )
            .unwrap();

        let response = router.handle(request(Method::GET, "/page", b""));

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-request-id"], "42");
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(response.headers()[CONTENT_LENGTH], "11");
    }

    #[test]
    fn test_handler_error_rendered_with_its_status() {
        let router = EndpointRouter::new(RouterConfig::default())
            .unwrap()
            .with_endpoint(
                Endpoint::exact(
                    "/gone",
                    Method::GET,
                    EndpointTarget::handler(|_| Err(RouteError::status(StatusCode::GONE, "<b>moved</b>"))),
                )
                .out_format(Format::Plain),
            )
            .unwrap();

        let response = router.handle(request(Method::GET, "/gone", b""));

        assert_eq!(response.status(), StatusCode::GONE);
        assert_eq!(response.body(), b"&lt;b&gt;moved&lt;/b&gt;");
    }

    #[test]
    fn test_anyhow_failure_is_500() {
        let router = EndpointRouter::new(RouterConfig::default())
            .unwrap()
            .with_endpoint(Endpoint::exact(
                "/fail",
                Method::GET,
                EndpointTarget::handler(|_| {
                    let parsed: i64 = "x".parse().map_err(anyhow::Error::from)?;
                    Ok(json!(parsed).into())
                }),
            ))
            .unwrap();

        let response = router.handle(request(Method::GET, "/fail", b""));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_panicking_handler_is_500() {
        let router = EndpointRouter::new(RouterConfig::default())
            .unwrap()
            .with_endpoint(Endpoint::exact(
                "/panic",
                Method::GET,
                EndpointTarget::handler(|_| panic!("handler bug")),
            ))
            .unwrap();

        let response = router.handle(request(Method::GET, "/panic", b""));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(&response),
            json!({"message": "Handler failed: Handler panicked: handler bug"})
        );
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut router = router();
        let result = router.register(Endpoint::exact(
            "/a",
            Method::GET,
            EndpointTarget::static_data("x", "text/plain"),
        ));
        assert!(matches!(result, Err(RouteError::Registration(_))));
    }
}
