//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate method and path pattern)
//!     → Return: matched route + path params, or no match
//!
//! Route Compilation (at startup and on reload):
//!     RouteConfig[]
//!     → Compile patterns (base_path + path)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled once per config, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same route
//! - First match wins (configuration order)

pub mod matcher;
pub mod router;

pub use router::{RouteMatch, RouteTable};
