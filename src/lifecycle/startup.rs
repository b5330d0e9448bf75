//! Startup orchestration.
//!
//! # Responsibilities
//! - Bind every configured listener
//! - Start one HTTP server per listener and track its handle
//! - Drive the whole run: start, wait for the stop signal, shut down
//!
//! # Design Decisions
//! - Fail fast: any bind error is fatal and nothing is served
//! - All binds complete before any server starts accepting
//! - The listener set is an owned, mutex-guarded collection, never global

use std::future::Future;
use std::net::SocketAddr;

use futures_util::future::{join_all, try_join_all};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::{ListenerSpec, RouterConfig, WebSocketConfig};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::{Shutdown, ShutdownOutcome};
use crate::net::{self, ListenerError, SessionTracker};

/// Fatal error while bringing listeners up.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// A running listener and the handle to its server task.
pub struct ActiveListener {
    pub(crate) spec: ListenerSpec,
    pub(crate) local_addr: SocketAddr,
    pub(crate) shutdown: Shutdown,
    pub(crate) sessions: SessionTracker,
    pub(crate) task: JoinHandle<Result<(), std::io::Error>>,
}

impl ActiveListener {
    pub fn spec(&self) -> &ListenerSpec {
        &self.spec
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Live WebSocket relay sessions on this listener.
    pub fn active_sessions(&self) -> u64 {
        self.sessions.active_count()
    }
}

/// The set of running listeners.
///
/// Dropping the set without calling [`ListenerSet::shutdown`] still signals
/// every server to stop, but does not wait for them.
#[derive(Default)]
pub struct ListenerSet {
    pub(crate) active: Mutex<Vec<ActiveListener>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind and start every listener in `config`.
    ///
    /// Binds run concurrently; if any fails, the already-bound sockets are
    /// dropped and no server is started.
    pub async fn start(&self, config: &RouterConfig) -> Result<(), StartupError> {
        let bound = try_join_all(config.listeners.iter().map(|spec| async move {
            let (listener, local_addr) = net::bind(config.bind_address, spec.listen_port).await?;
            Ok::<_, ListenerError>((spec, listener, local_addr))
        }))
        .await?;

        join_all(
            bound
                .into_iter()
                .map(|(spec, listener, local_addr)| self.launch(spec, listener, local_addr, &config.websocket)),
        )
        .await;

        Ok(())
    }

    async fn launch(
        &self,
        spec: &ListenerSpec,
        listener: TcpListener,
        local_addr: SocketAddr,
        websocket: &WebSocketConfig,
    ) {
        let shutdown = Shutdown::new();
        let sessions = SessionTracker::new();
        let server = HttpServer::new(spec, websocket.clone(), sessions.clone(), shutdown.subscribe());

        log_routes(spec, local_addr);
        let task = tokio::spawn(server.run(listener));

        self.active.lock().await.push(ActiveListener {
            spec: spec.clone(),
            local_addr,
            shutdown,
            sessions,
            task,
        });
    }

    /// Addresses of all running listeners.
    pub async fn local_addrs(&self) -> Vec<SocketAddr> {
        self.active
            .lock()
            .await
            .iter()
            .map(ActiveListener::local_addr)
            .collect()
    }

    /// Address of the running listener configured with `listen_port`.
    pub async fn local_addr_of(&self, listen_port: u16) -> Option<SocketAddr> {
        self.active
            .lock()
            .await
            .iter()
            .find(|listener| listener.spec.listen_port == listen_port)
            .map(ActiveListener::local_addr)
    }

    pub async fn len(&self) -> usize {
        self.active.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.active.lock().await.is_empty()
    }
}

fn log_routes(spec: &ListenerSpec, local_addr: SocketAddr) {
    tracing::info!(
        listen_port = spec.listen_port,
        address = %local_addr,
        routes = spec.routes.len(),
        "Server starting"
    );
    for route in &spec.routes {
        tracing::info!(
            listen_port = spec.listen_port,
            "\t{} -> {}:{}{}",
            route.path_prefix,
            route.resolved_host(),
            route.target_port,
            if route.strip_prefix { " (strip prefix)" } else { "" }
        );
    }
}

/// Start every listener, wait for `signal`, then shut down within the
/// configured grace period.
pub async fn run_until<F>(config: RouterConfig, signal: F) -> Result<ShutdownOutcome, StartupError>
where
    F: Future<Output = ()>,
{
    let listeners = ListenerSet::new();
    listeners.start(&config).await?;

    signal.await;
    tracing::info!("Received shutdown signal, gracefully shutting down");

    Ok(listeners.shutdown(config.shutdown.grace_period()).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteEntry;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    fn config(ports: &[u16]) -> RouterConfig {
        RouterConfig {
            listeners: ports
                .iter()
                .map(|port| ListenerSpec {
                    listen_port: *port,
                    routes: vec![RouteEntry::new("/", None, 9)],
                })
                .collect(),
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn starts_every_listener() {
        let set = ListenerSet::new();
        set.start(&config(&[0, 0, 0])).await.unwrap();

        let addrs = set.local_addrs().await;
        assert_eq!(addrs.len(), 3);
        assert!(addrs.iter().all(|addr| addr.port() != 0));

        set.shutdown(Duration::from_secs(5)).await;
        assert!(set.is_empty().await);
    }

    #[tokio::test]
    async fn port_conflict_starts_nothing() {
        let (_held, addr) = net::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await.unwrap();

        let set = ListenerSet::new();
        let err = set.start(&config(&[0, addr.port()])).await.unwrap_err();
        assert!(matches!(err, StartupError::Listener(ListenerError::Bind { .. })));
        assert!(set.is_empty().await);
    }

    #[tokio::test]
    async fn run_until_returns_after_signal() {
        let outcome = run_until(config(&[0]), async {}).await.unwrap();
        assert_eq!(outcome, ShutdownOutcome::Graceful);
    }
}
