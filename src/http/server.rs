//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create one Axum Router per listener
//! - Wire up middleware (tracing, request ID)
//! - Classify each request (WebSocket upgrade or plain HTTP)
//! - Dispatch to the forwarder or the relay after route lookup
//! - Serve until the listener's shutdown signal, then drain

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{ListenerSpec, WebSocketConfig};
use crate::http::forward::{self, BackendClient};
use crate::http::request::{is_websocket_upgrade, MakeRequestUuidV4};
use crate::http::{response, websocket};
use crate::net::SessionTracker;
use crate::observability::metrics;
use crate::routing::RouteTable;

/// Per-listener state injected into the handler.
#[derive(Clone)]
pub struct ListenerState {
    pub listen_port: u16,
    pub routes: Arc<RouteTable>,
    pub client: BackendClient,
    pub websocket: WebSocketConfig,
    pub sessions: SessionTracker,
    pub shutdown: watch::Receiver<bool>,
}

/// HTTP server for one listener.
pub struct HttpServer {
    router: Router,
    listen_port: u16,
    shutdown: watch::Receiver<bool>,
}

impl HttpServer {
    /// Create the server for `spec`.
    ///
    /// `shutdown` flipping to `true` (or its sender dropping) stops the
    /// accept loop and every relay session of this listener.
    pub fn new(
        spec: &ListenerSpec,
        websocket: WebSocketConfig,
        sessions: SessionTracker,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let state = ListenerState {
            listen_port: spec.listen_port,
            routes: Arc::new(RouteTable::from_config(&spec.routes)),
            client: forward::backend_client(),
            websocket,
            sessions,
            shutdown: shutdown.clone(),
        };

        Self {
            router: Self::build_router(state),
            listen_port: spec.listen_port,
            shutdown,
        }
    }

    /// Build the Axum router: every method and path goes to `dispatch`.
    fn build_router(state: ListenerState) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The configured router, for serving or driving directly in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn listen_port(&self) -> u16 {
        self.listen_port
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let mut shutdown = self.shutdown;
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            })
            .await?;

        tracing::info!(address = %addr, "HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Classifies the request, looks up the route, and forwards or relays.
async fn dispatch(
    State(state): State<ListenerState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let upgrade = is_websocket_upgrade(request.headers());

    tracing::debug!(
        listener = state.listen_port,
        method = %method,
        path = %path,
        websocket = upgrade,
        "Received request"
    );

    let response = match state.routes.match_path(&path) {
        Some(route) => {
            tracing::debug!(
                prefix = %route.prefix(),
                host = %route.host(),
                port = route.port(),
                "Matched route"
            );
            if upgrade {
                websocket::relay(&state, route, request).await
            } else {
                forward::forward(&state.client, route, client_addr, request).await
            }
        }
        None => {
            tracing::warn!(listener = state.listen_port, path = %path, "No matching route found");
            response::not_found()
        }
    };

    metrics::record_request(state.listen_port, method.as_str(), response.status().as_u16(), start);
    response
}
