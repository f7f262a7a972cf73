//! http2bus: an HTTP front end for a request/response message bus.
//!
//! Each HTTP request matching a configured route is published to the route's
//! bus namespace; the replies gathered under the route's wait policy become
//! the HTTP response.

// Core subsystems
pub mod bridge;
pub mod bus;
pub mod config;
pub mod http;
pub mod routing;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use bus::{Bus, MemoryBus};
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
