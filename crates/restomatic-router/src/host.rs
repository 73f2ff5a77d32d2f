//! `axum` host adapter
//!
//! Mounts an [`EndpointRouter`] as the fallback service of an
//! `axum::Router`. The host keeps ownership of the listener; handlers are
//! synchronous and run on the blocking pool.

use crate::error::RouteError;
use crate::router::EndpointRouter;
use axum::body::{to_bytes, Body};
use axum::extract::{ConnectInfo, Request};
use axum::response::Response;
use http_body_util::LengthLimitError;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::error;

/// Build an `axum::Router` that sends every request to `router`
pub fn axum_router(router: Arc<EndpointRouter>) -> axum::Router {
    axum::Router::new().fallback(move |request: Request| dispatch(Arc::clone(&router), request))
}

async fn dispatch(router: Arc<EndpointRouter>, request: Request) -> Response {
    let limit = router.config().max_body_bytes;
    let (mut parts, body) = request.into_parts();

    // One byte over the limit is enough for the router to report 413
    let bytes = match to_bytes(body, limit.saturating_add(1)).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "Failed to read request body");
            return router.render_error(&body_error(e, limit)).map(Body::from);
        }
    };

    if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>().cloned() {
        parts.extensions.insert(addr);
    }
    let request = http::Request::from_parts(parts, bytes.to_vec());

    let worker = Arc::clone(&router);
    match tokio::task::spawn_blocking(move || worker.handle(request)).await {
        Ok(response) => response.map(Body::from),
        Err(e) => {
            let error = RouteError::Handler(format!("Handler task failed: {e}"));
            router.render_error(&error).map(Body::from)
        }
    }
}

/// 413 when the length limit tripped, 400 for any other transport failure
fn body_error(error: axum::Error, limit: usize) -> RouteError {
    let inner = error.into_inner();
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(inner.as_ref());
    while let Some(current) = source {
        if current.is::<LengthLimitError>() {
            return RouteError::PayloadTooLarge {
                size: limit.saturating_add(1),
                limit,
            };
        }
        source = current.source();
    }
    RouteError::BadInput(format!("Failed to read request body: {inner}"))
}
