//! HTTP request forwarding.
//!
//! # Responsibilities
//! - Rewrite the inbound request for the matched backend
//! - Send it over the shared client, streaming the body both ways
//!
//! # Design Decisions
//! - The full original path is forwarded unless the route opts into
//!   `strip_prefix`; the query string is always forwarded verbatim
//! - The inbound `Host` header is kept; the backend origin only sets the URI
//! - No retries: a failed exchange fails this client call with 502

use std::net::SocketAddr;

use axum::{
    body::Body,
    http::{Request, Uri, Version},
    response::Response,
};
use hyper_util::client::legacy::{connect::HttpConnector, Client};

use crate::http::request::{remove_hop_by_hop, set_forwarded_headers};
use crate::http::response;
use crate::routing::Route;

/// Client used for all backend HTTP exchanges on a listener.
pub type BackendClient = Client<HttpConnector, Body>;

/// Build the backend client.
pub fn backend_client() -> BackendClient {
    Client::builder(hyper_util::rt::TokioExecutor::new()).build(HttpConnector::new())
}

/// Forward `request` to the backend of `route` and relay its response.
pub async fn forward(
    client: &BackendClient,
    route: &Route,
    client_addr: SocketAddr,
    request: Request<Body>,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let target = match route
        .http_target(parts.uri.path(), parts.uri.query())
        .map_err(|e| e.to_string())
        .and_then(|target| target.parse::<Uri>().map_err(|e| e.to_string()))
    {
        Ok(uri) => uri,
        Err(error) => {
            tracing::error!(
                host = %route.host(),
                port = route.port(),
                error = %error,
                "Failed to parse target URL"
            );
            return response::bad_target();
        }
    };

    tracing::debug!(target = %target, "Forwarding request");

    parts.uri = target;
    parts.version = Version::HTTP_11;
    remove_hop_by_hop(&mut parts.headers);
    set_forwarded_headers(&mut parts.headers, client_addr);

    match client.request(Request::from_parts(parts, body)).await {
        Ok(upstream) => response::from_backend(upstream),
        Err(e) => {
            tracing::error!(
                host = %route.host(),
                port = route.port(),
                error = %e,
                "Upstream error"
            );
            response::proxy_error(e)
        }
    }
}
