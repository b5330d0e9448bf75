//! Logging and metrics.
//!
//! # Data Flow
//! ```text
//! dispatch / relay / lifecycle events
//!     → logging.rs (tracing subscriber, RUST_LOG or configured level)
//!     → metrics.rs (per-listener request counts, latency, live sessions)
//!
//! Exported to:
//!     → stdout
//!     → Prometheus scrape endpoint, only when metrics_enabled
//! ```
//!
//! # Design Decisions
//! - Every metric carries the listener port as a label
//! - The exporter is opt-in; recording without it is a no-op

pub mod logging;
pub mod metrics;
