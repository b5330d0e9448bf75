//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use prefix_router::config::{ListenerSpec, RouteEntry, RouterConfig};
use prefix_router::ListenerSet;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message;

pub const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

async fn bind_loopback() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind((LOOPBACK, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// A port with nothing listening on it.
pub async fn unused_port() -> u16 {
    let (listener, addr) = bind_loopback().await;
    drop(listener);
    addr.port()
}

/// Read an HTTP/1.1 request head (through the blank line).
async fn read_head(socket: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

async fn write_response(socket: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nX-Backend: mock\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Start a simple mock backend that returns a fixed response.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    start_programmable_backend(move |_| async move { (200, response.to_string()) }).await
}

/// Start a backend that answers with the request head it received.
pub async fn start_echo_backend() -> SocketAddr {
    start_programmable_backend(|head| async move { (200, head) }).await
}

/// Start a programmable mock backend with async support.
///
/// The closure receives the raw request head.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let (listener, addr) = bind_loopback().await;
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                let (status, body) = f(head).await;
                let status_text = match status {
                    200 => "200 OK",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    502 => "502 Bad Gateway",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };
                write_response(&mut socket, status_text, &body).await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            });
        }
    });

    addr
}

/// Start a backend that accepts connections and never answers.
pub async fn start_hanging_backend() -> SocketAddr {
    let (listener, addr) = bind_loopback().await;

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    addr
}

/// Start a WebSocket backend that first sends `path:<request uri>`, then
/// echoes every text and binary message back.
pub async fn start_ws_echo_backend() -> SocketAddr {
    let (listener, addr) = bind_loopback().await;

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let uri = Arc::new(Mutex::new(String::new()));
                let seen = uri.clone();
                let callback = move |request: &Request, response: Response| {
                    *seen.lock().unwrap() = request.uri().to_string();
                    Ok(response)
                };

                let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                    return;
                };

                let greeting = format!("path:{}", uri.lock().unwrap());
                if ws.send(Message::Text(greeting.into())).await.is_err() {
                    return;
                }

                while let Some(Ok(message)) = ws.next().await {
                    if message.is_close() {
                        break;
                    }
                    if (message.is_text() || message.is_binary()) && ws.send(message).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    addr
}

/// Start a WebSocket backend that answers nothing and reports every message
/// it receives, close frames included.
pub async fn start_ws_recording_backend() -> (SocketAddr, mpsc::UnboundedReceiver<Message>) {
    let (listener, addr) = bind_loopback().await;
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(message)) = ws.next().await {
                    if tx.send(message).is_err() {
                        break;
                    }
                }
            });
        }
    });

    (addr, rx)
}

/// A route to a loopback backend.
pub fn route(prefix: &str, backend: SocketAddr) -> RouteEntry {
    RouteEntry::new(prefix, Some("127.0.0.1"), backend.port())
}

/// Config with one OS-assigned loopback listener per route list.
pub fn config(listeners: Vec<Vec<RouteEntry>>) -> RouterConfig {
    RouterConfig {
        listeners: listeners
            .into_iter()
            .map(|routes| ListenerSpec {
                listen_port: 0,
                routes,
            })
            .collect(),
        bind_address: LOOPBACK,
        ..Default::default()
    }
}

/// Start the router and return the set with each listener's address.
pub async fn start_router(config: &RouterConfig) -> (ListenerSet, Vec<SocketAddr>) {
    let set = ListenerSet::new();
    set.start(config).await.expect("router should start");
    let mut addrs = set.local_addrs().await;
    addrs.sort_by_key(|addr| addr.port());
    (set, addrs)
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
