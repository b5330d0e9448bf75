//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerSpec
//!     → listener.rs (bind ip:port, fail fast on conflict)
//!     → Hand off to HTTP layer (one server per listener)
//!
//! WebSocket upgrade
//!     → connection.rs (session guard held for the relay's lifetime)
//! ```

pub mod connection;
pub mod listener;

pub use connection::{SessionGuard, SessionId, SessionTracker};
pub use listener::{bind, ListenerError};
