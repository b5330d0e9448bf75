//! Multi-listener reverse-proxy router.
//!
//! Each configured port gets its own HTTP server. Requests are routed by the
//! first matching path prefix, in configured order, to a backend `host:port`;
//! plain HTTP is proxied and WebSocket upgrades are relayed frame by frame.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::RouterConfig;
pub use http::HttpServer;
pub use lifecycle::{ListenerSet, Shutdown, ShutdownOutcome};
