//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Dial the backend WebSocket before touching the client connection
//! - Complete upgrade handshake with client
//! - Bidirectional frame forwarding
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Proxy ←──── WebSocket frames ────→ Backend
//! ```
//!
//! # Design Decisions
//! - Backend dialed first: an unreachable backend gets a 500 and the client
//!   is never upgraded
//! - Frame-level forwarding, message type and payload untouched
//! - Close frames propagated in both directions and end that direction
//! - Both directions share one scope: when either ends the other is aborted.
//!   On shutdown the upstream side first gets a bounded window to close the backend
//! - Listener shutdown sends Going Away (1001) to both peers

use std::time::Duration;

use axum::{
    body::Body,
    extract::{
        ws::{self, close_code, WebSocket, WebSocketUpgrade},
        FromRequestParts,
    },
    http::{header, HeaderMap, Request},
    response::{IntoResponse, Response},
};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::{net::TcpStream, sync::watch};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, protocol::frame::coding::CloseCode},
    MaybeTlsStream, WebSocketStream,
};
use url::Url;

use crate::http::response;
use crate::http::server::ListenerState;
use crate::net::SessionGuard;
use crate::observability::metrics;
use crate::routing::Route;

type BackendSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type BackendSink = SplitSink<BackendSocket, tungstenite::Message>;
type BackendStream = SplitStream<BackendSocket>;
type ClientSink = SplitSink<WebSocket, ws::Message>;
type ClientStream = SplitStream<WebSocket>;

const GOING_AWAY_REASON: &str = "proxy shutting down";

/// Bound on delivering the backend's close frame once the client side is done.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Relay an upgrade request to the backend of `route`.
pub async fn relay(state: &ListenerState, route: &Route, request: Request<Body>) -> Response {
    let (mut parts, _body) = request.into_parts();

    if state.websocket.check_origin && !origin_allowed(&parts.headers) {
        tracing::warn!(
            origin = ?parts.headers.get(header::ORIGIN),
            host = ?parts.headers.get(header::HOST),
            "WebSocket origin rejected"
        );
        return response::origin_rejected();
    }

    let upgrade = match <WebSocketUpgrade as FromRequestParts<()>>::from_request_parts(&mut parts, &()).await {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Invalid WebSocket upgrade request");
            return rejection.into_response();
        }
    };

    let target = match route.websocket_target(parts.uri.path(), parts.uri.query()) {
        Ok(target) => target,
        Err(e) => {
            tracing::error!(host = %route.host(), port = route.port(), error = %e, "Failed to parse target URL");
            return response::bad_target();
        }
    };

    tracing::debug!(target = %target, "Attempting WebSocket connection");

    let backend = match connect_async(target.as_str()).await {
        Ok((backend, _)) => backend,
        Err(e) => {
            tracing::error!(target = %target, error = %e, "WebSocket server connection failed");
            return response::websocket_dial_failed();
        }
    };

    // Held from here so the listener's drain also covers a pending upgrade.
    let session = RelaySession {
        backend,
        guard: state.sessions.track(),
        listen_port: state.listen_port,
        shutdown: state.shutdown.clone(),
        target,
    };

    upgrade
        .on_failed_upgrade(|error| {
            tracing::warn!(error = %error, "Client WebSocket upgrade failed");
        })
        .on_upgrade(move |client| session.run(client))
}

/// Paired client and backend connections, owned exclusively by one relay.
struct RelaySession {
    backend: BackendSocket,
    guard: SessionGuard,
    listen_port: u16,
    shutdown: watch::Receiver<bool>,
    target: String,
}

impl RelaySession {
    async fn run(self, client: WebSocket) {
        let RelaySession {
            backend,
            guard,
            listen_port,
            mut shutdown,
            target,
        } = self;

        metrics::record_session_opened(listen_port);
        tracing::info!(session_id = %guard.id(), target = %target, "WebSocket relay established");

        let (mut client_tx, client_rx) = client.split();
        let (backend_tx, mut backend_rx) = backend.split();

        let mut upstream = tokio::spawn(client_to_backend(client_rx, backend_tx, shutdown.clone()));

        let upstream_done = tokio::select! {
            _ = backend_to_client(&mut backend_rx, &mut client_tx, &mut shutdown) => false,
            _ = &mut upstream => true,
        };
        if !upstream_done {
            // On shutdown the upstream task owes the backend its Going Away.
            if stopping(&shutdown) {
                let _ = tokio::time::timeout(CLOSE_TIMEOUT, &mut upstream).await;
            }
            upstream.abort();
        }
        let _ = client_tx.close().await;

        metrics::record_session_closed(listen_port);
        tracing::info!(session_id = %guard.id(), target = %target, "WebSocket relay closed");
    }
}

async fn client_to_backend(
    mut client_rx: ClientStream,
    mut backend_tx: BackendSink,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let message = tokio::select! {
            message = client_rx.next() => message,
            _ = stopped(&mut shutdown) => {
                let _ = backend_tx.send(tungstenite::Message::Close(Some(going_away()))).await;
                break;
            }
        };

        let message = match message {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                tracing::debug!(error = %e, "Read from client failed");
                break;
            }
            None => break,
        };

        let closing = matches!(message, ws::Message::Close(_));
        if let Err(e) = backend_tx.send(to_backend(message)).await {
            tracing::debug!(error = %e, "Write to backend failed");
            break;
        }
        if closing {
            break;
        }
    }
    let _ = backend_tx.close().await;
}

async fn backend_to_client(
    backend_rx: &mut BackendStream,
    client_tx: &mut ClientSink,
    shutdown: &mut watch::Receiver<bool>,
) {
    loop {
        let message = tokio::select! {
            message = backend_rx.next() => message,
            _ = stopped(shutdown) => {
                let frame = ws::CloseFrame {
                    code: close_code::AWAY,
                    reason: GOING_AWAY_REASON.to_owned().into(),
                };
                let _ = client_tx.send(ws::Message::Close(Some(frame))).await;
                break;
            }
        };

        let message = match message {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                tracing::debug!(error = %e, "Read from backend failed");
                break;
            }
            None => break,
        };

        let closing = message.is_close();
        let Some(message) = to_client(message) else {
            continue;
        };
        if let Err(e) = client_tx.send(message).await {
            tracing::debug!(error = %e, "Write to client failed");
            break;
        }
        if closing {
            break;
        }
    }
}

/// Resolves once the listener is shutting down (or gone).
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// True once the listener is shutting down or its trigger is gone.
fn stopping(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow() || shutdown.has_changed().is_err()
}

fn going_away() -> tungstenite::protocol::CloseFrame {
    tungstenite::protocol::CloseFrame {
        code: CloseCode::Away,
        reason: GOING_AWAY_REASON.to_owned().into(),
    }
}

fn to_backend(message: ws::Message) -> tungstenite::Message {
    match message {
        ws::Message::Text(text) => tungstenite::Message::Text(text.as_str().to_owned().into()),
        ws::Message::Binary(data) => tungstenite::Message::Binary(data),
        ws::Message::Ping(data) => tungstenite::Message::Ping(data),
        ws::Message::Pong(data) => tungstenite::Message::Pong(data),
        ws::Message::Close(frame) => {
            tungstenite::Message::Close(frame.map(|frame| tungstenite::protocol::CloseFrame {
                code: CloseCode::from(frame.code),
                reason: frame.reason.as_str().to_owned().into(),
            }))
        }
    }
}

/// Raw frames never surface from a read, so they map to `None`.
fn to_client(message: tungstenite::Message) -> Option<ws::Message> {
    Some(match message {
        tungstenite::Message::Text(text) => ws::Message::Text(text.as_str().to_owned().into()),
        tungstenite::Message::Binary(data) => ws::Message::Binary(data),
        tungstenite::Message::Ping(data) => ws::Message::Ping(data),
        tungstenite::Message::Pong(data) => ws::Message::Pong(data),
        tungstenite::Message::Close(frame) => ws::Message::Close(frame.map(|frame| ws::CloseFrame {
            code: u16::from(frame.code),
            reason: frame.reason.as_str().to_owned().into(),
        })),
        tungstenite::Message::Frame(_) => return None,
    })
}

/// Same-origin check: the `Origin` authority must equal `Host`.
///
/// Requests without an `Origin` header are not browser-initiated and pass.
fn origin_allowed(headers: &HeaderMap) -> bool {
    let Some(origin) = headers.get(header::ORIGIN) else {
        return true;
    };
    let Some(host) = headers.get(header::HOST).and_then(|h| h.to_str().ok()) else {
        return false;
    };
    let Some(origin) = origin.to_str().ok().and_then(|o| Url::parse(o).ok()) else {
        return false;
    };
    let Some(origin_host) = origin.host_str() else {
        return false;
    };

    let authority = match origin.port() {
        Some(port) => format!("{origin_host}:{port}"),
        None => origin_host.to_string(),
    };
    authority.eq_ignore_ascii_case(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::HeaderValue;

    #[test]
    fn stopping_follows_trigger_and_sender_drop() {
        let (tx, rx) = watch::channel(false);
        assert!(!stopping(&rx));
        tx.send_replace(true);
        assert!(stopping(&rx));

        let (tx, rx) = watch::channel(false);
        drop(tx);
        assert!(stopping(&rx));
    }

    fn headers(origin: Option<&str>, host: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(origin) = origin {
            map.insert(header::ORIGIN, HeaderValue::from_str(origin).unwrap());
        }
        if let Some(host) = host {
            map.insert(header::HOST, HeaderValue::from_str(host).unwrap());
        }
        map
    }

    #[test]
    fn origin_check() {
        assert!(origin_allowed(&headers(None, Some("proxy:8080"))));
        assert!(origin_allowed(&headers(Some("http://proxy:8080"), Some("proxy:8080"))));
        assert!(origin_allowed(&headers(Some("https://PROXY"), Some("proxy"))));
        assert!(!origin_allowed(&headers(Some("http://evil.example"), Some("proxy:8080"))));
        assert!(!origin_allowed(&headers(Some("http://proxy:9999"), Some("proxy:8080"))));
        assert!(!origin_allowed(&headers(Some("not a url"), Some("proxy"))));
        assert!(!origin_allowed(&headers(Some("http://proxy"), None)));
    }

    #[test]
    fn text_and_binary_pass_through_unchanged() {
        match to_backend(ws::Message::Text(String::from("héllo").into())) {
            tungstenite::Message::Text(text) => assert_eq!(text.as_str(), "héllo"),
            other => panic!("unexpected message: {other:?}"),
        }

        let payload = Bytes::from_static(&[0, 159, 146, 150]);
        match to_client(tungstenite::Message::Binary(payload.clone())) {
            Some(ws::Message::Binary(data)) => assert_eq!(data, payload),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn close_frames_keep_code_and_reason() {
        let frame = ws::CloseFrame {
            code: close_code::NORMAL,
            reason: String::from("bye").into(),
        };
        match to_backend(ws::Message::Close(Some(frame))) {
            tungstenite::Message::Close(Some(frame)) => {
                assert_eq!(frame.code, CloseCode::Normal);
                assert_eq!(frame.reason.as_str(), "bye");
            }
            other => panic!("unexpected message: {other:?}"),
        }

        match to_client(tungstenite::Message::Close(Some(going_away()))) {
            Some(ws::Message::Close(Some(frame))) => assert_eq!(frame.code, close_code::AWAY),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn control_frames_pass_through() {
        let payload = Bytes::from_static(b"ping");
        assert!(matches!(
            to_backend(ws::Message::Ping(payload.clone())),
            tungstenite::Message::Ping(data) if data == payload
        ));
        assert!(matches!(
            to_client(tungstenite::Message::Pong(payload.clone())),
            Some(ws::Message::Pong(data)) if data == payload
        ));
    }
}
