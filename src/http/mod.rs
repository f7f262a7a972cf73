//! HTTP front end.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, timeout, tracing, CORS)
//!     → route table lookup (404 when nothing matches)
//!     → bridge::Translation (one bus exchange)
//!     → HttpReply or GatewayError rendered to the client
//! ```

pub mod server;

pub use server::{AppState, HttpServer};
