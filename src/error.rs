//! Errors surfaced to the HTTP layer.
//!
//! Missing replies and multi-reply arbitration are resolved inside the
//! bridge; only request decoding, bus transport and unusable replies end up
//! here. Each variant renders as a plain-text error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::bridge::assembler::ReplyError;
use crate::bridge::codec::CodecError;
use crate::bus::BusError;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Request body declared as JSON but not parseable.
    #[error("malformed request body: {0}")]
    MalformedBody(#[source] CodecError),

    /// Request body could not be read or exceeded the size limit.
    #[error("failed to read request body: {0}")]
    BodyRead(#[from] axum::Error),

    /// Publish or await failed; forwarded as reported by the bus.
    #[error("bus exchange failed: {0}")]
    Bus(#[from] BusError),

    /// The reply of record cannot be expressed as HTTP.
    #[error("invalid reply: {0}")]
    InvalidReply(#[from] ReplyError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MalformedBody(_) | GatewayError::BodyRead(_) => StatusCode::BAD_REQUEST,
            GatewayError::Bus(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::InvalidReply(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let reason = status.canonical_reason().unwrap_or("Error");
        (status, reason).into_response()
    }
}
