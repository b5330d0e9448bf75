//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (ordered route scan)
//!     → matcher.rs (literal prefix test)
//!     → Return: matched Route or None (404)
//!
//! Route Compilation (at listener startup):
//!     RouteEntry[] (configured order)
//!     → resolve default host
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins, in configured order

pub mod matcher;
pub mod router;

pub use matcher::PathPrefixMatcher;
pub use router::{Route, RouteTable};
