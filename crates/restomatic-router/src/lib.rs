//! Endpoint router for restomatic
//!
//! Dispatches `(path, method, body)` to handlers registered on exact or
//! prefix locations, decodes request bodies and encodes responses per the
//! endpoint's declared formats, and renders every failure as a response.
//!
//! The router is a pure `http::Request<Vec<u8>> → http::Response<Vec<u8>>`
//! function. It owns no socket; mount it into a host server, for example
//! with [`host::axum_router`] (default `axum` feature).
//!
//! ## Usage
//!
//! ```rust
//! use http::{Method, StatusCode};
//! use restomatic_config::RouterConfig;
//! use restomatic_router::{Endpoint, EndpointRouter, EndpointTarget, Format, Response};
//!
//! let mut router = EndpointRouter::new(RouterConfig::default())?;
//! router.register(
//!     Endpoint::exact("/hello", Method::GET, EndpointTarget::handler(|_| Ok(Response::text("hi"))))
//!         .out_format(Format::Plain),
//! )?;
//!
//! let request = http::Request::get("/hello").body(Vec::new()).unwrap();
//! let response = router.handle(request);
//! assert_eq!(response.status(), StatusCode::OK);
//! assert_eq!(response.body(), b"hi");
//! # Ok::<(), restomatic_router::RouteError>(())
//! ```

#![warn(clippy::all)]

pub mod endpoint;
pub mod error;
pub mod format;
#[cfg(feature = "axum")]
pub mod host;
pub mod render;
pub mod request;
pub mod response;
pub mod router;
pub mod table;

// Re-exports
pub use endpoint::{Endpoint, EndpointTarget, Handler, MatchKind};
pub use error::{RouteError, RouteResult};
pub use format::{FormData, Format, RequestBody};
pub use render::escape_html;
pub use request::{Request, TransportContext, Uri};
pub use response::{Response, ResponseBody};
pub use router::EndpointRouter;
pub use table::{Resolution, RouteTable};
