//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Bind all listeners → Start one server each
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting everywhere → Drain requests and
//!     relay sessions → Exit (forced once the grace period elapses)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Listeners start together and stop together
//! - Shutdown fans out concurrently so the grace period is shared, not serial
//! - Shutdown has timeout: forced exit after deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownOutcome};
pub use signals::shutdown_signal;
pub use startup::{run_until, ActiveListener, ListenerSet, StartupError};
