//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (one listener)
//!     → server.rs (Axum setup, request ID, classify upgrade vs plain)
//!     → [routing: first matching prefix, else 404]
//!     → forward.rs (plain HTTP: rewrite + proxy via hyper client)
//!       websocket.rs (upgrade: dial backend, upgrade client, relay frames)
//!     → response.rs (strip hop-by-hop, map failures to status codes)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::{is_websocket_upgrade, MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{HttpServer, ListenerState};
