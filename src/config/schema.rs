//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.
//!
//! ```yaml
//! router:
//!   - server: 8080
//!     redirect:
//!       - path: /api
//!         host: backend.internal
//!         port: 9000
//!       - path: /
//!         port: 3000
//! ```

use std::net::{AddrParseError, IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Host substituted when a route leaves `host` empty or absent.
pub const DEFAULT_TARGET_HOST: &str = "localhost";

/// Root configuration for the router.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterConfig {
    /// One entry per listening port.
    #[serde(rename = "router")]
    pub listeners: Vec<ListenerSpec>,

    /// Interface every listener binds to.
    pub bind_address: IpAddr,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,

    /// WebSocket upgrade policy.
    pub websocket: WebSocketConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            shutdown: ShutdownConfig::default(),
            websocket: WebSocketConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// A single listening port and its ordered routes.
///
/// Route order is significant: the first entry whose prefix matches wins.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ListenerSpec {
    /// Port to listen on. `0` asks the OS for a free port.
    #[serde(rename = "server")]
    pub listen_port: u16,

    /// Routes, checked in configured order.
    #[serde(rename = "redirect", default)]
    pub routes: Vec<RouteEntry>,
}

/// Maps a path prefix to a backend `host:port`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteEntry {
    /// Literal, case-sensitive path prefix.
    #[serde(rename = "path")]
    pub path_prefix: String,

    /// Backend host. Empty or absent means [`DEFAULT_TARGET_HOST`].
    #[serde(rename = "host", default, skip_serializing_if = "Option::is_none")]
    pub target_host: Option<String>,

    /// Backend port.
    #[serde(rename = "port")]
    pub target_port: u16,

    /// Remove the matched prefix before forwarding. Off by default: the
    /// backend sees the full original path.
    #[serde(default)]
    pub strip_prefix: bool,
}

impl RouteEntry {
    /// Create a route that preserves the original path.
    pub fn new(path_prefix: impl Into<String>, target_host: Option<&str>, target_port: u16) -> Self {
        Self {
            path_prefix: path_prefix.into(),
            target_host: target_host.map(str::to_string),
            target_port,
            strip_prefix: false,
        }
    }

    /// Backend host with the `localhost` default applied.
    pub fn resolved_host(&self) -> &str {
        match self.target_host.as_deref() {
            Some(host) if !host.is_empty() => host,
            _ => DEFAULT_TARGET_HOST,
        }
    }
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Time allowed for all listeners to drain, in seconds.
    pub grace_period_secs: u64,
}

impl ShutdownConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 10,
        }
    }
}

/// WebSocket upgrade policy.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Refuse upgrades whose `Origin` host differs from the `Host` header.
    /// Disabled by default, which accepts every origin.
    pub check_origin: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl ObservabilityConfig {
    /// The Prometheus exporter's listen address.
    pub fn metrics_socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.metrics_address.parse()
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
