//! Tests for the axum host adapter

#![cfg(feature = "axum")]

use axum::body::{to_bytes, Body, Bytes};
use http::{Method, Request, StatusCode};
use restomatic_config::RouterConfig;
use restomatic_router::host::axum_router;
use restomatic_router::{Endpoint, EndpointRouter, EndpointTarget, Response};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app(max_body_bytes: usize) -> axum::Router {
    let config = RouterConfig {
        max_body_bytes,
        ..RouterConfig::default()
    };
    let router = EndpointRouter::new(config)
        .unwrap()
        .with_endpoint(Endpoint::exact(
            "/a",
            Method::GET,
            EndpointTarget::handler(|_| Ok(json!({"route": "a"}).into())),
        ))
        .unwrap()
        .with_endpoint(Endpoint::exact(
            "/echo",
            Method::POST,
            EndpointTarget::handler(|req| {
                Ok(Response::new(req.body.as_json().cloned().unwrap_or(Value::Null)))
            }),
        ))
        .unwrap();
    axum_router(Arc::new(router))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_get_through_axum() {
    let response = app(1024)
        .oneshot(Request::get("/a").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"route": "a"}));
}

#[tokio::test]
async fn test_post_body_through_axum() {
    let response = app(1024)
        .oneshot(
            Request::post("/echo")
                .body(Body::from(r#"{"x": [1, 2]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(body_json(response).await, json!({"x": [1, 2]}));
}

#[tokio::test]
async fn test_method_not_allowed_through_axum() {
    let response = app(1024)
        .oneshot(Request::post("/a").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["allow"], "GET");
}

#[tokio::test]
async fn test_oversized_body_through_axum() {
    let response = app(8)
        .oneshot(
            Request::post("/echo")
                .body(Body::from(vec![b' '; 64]))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_broken_body_stream_is_bad_request() {
    let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(Bytes::from_static(b"{")),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer went away")),
    ];
    let response = app(1024)
        .oneshot(
            Request::post("/echo")
                .body(Body::from_stream(futures::stream::iter(chunks)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
