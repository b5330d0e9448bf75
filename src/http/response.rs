//! Response handling and transformation.
//!
//! # Responsibilities
//! - Transform backend response for client
//! - Map routing and backend failures to HTTP status codes
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Hop-by-hop headers stripped automatically
//! - No match is 404, bad target URL is 500, unreachable backend is 502

use std::fmt::Display;

use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hyper::body::Incoming;

use crate::http::request::remove_hop_by_hop;

/// Relay a backend response to the client, body streamed as-is.
pub fn from_backend(response: Response<Incoming>) -> Response {
    let (mut parts, body) = response.into_parts();
    remove_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}

/// No route matched the request path.
pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 page not found\n").into_response()
}

/// The backend URL could not be built from the route.
pub fn bad_target() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Failed to parse target URL\n").into_response()
}

/// The backend could not be reached or the exchange failed midway.
pub fn proxy_error(error: impl Display) -> Response {
    (StatusCode::BAD_GATEWAY, format!("Proxy error: {error}\n")).into_response()
}

/// The backend WebSocket could not be dialed.
pub fn websocket_dial_failed() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to connect to target server\n",
    )
        .into_response()
}

/// The upgrade's `Origin` was refused.
pub fn origin_rejected() -> Response {
    (StatusCode::FORBIDDEN, "Origin not allowed\n").into_response()
}
