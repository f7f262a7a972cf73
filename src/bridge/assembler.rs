//! HTTP response assembly.
//!
//! # Responsibilities
//! - Map the reply of record (or its absence) to status, headers and body
//! - Strip CORS headers set by responders
//! - Apply codec defaults where the reply left headers unset
//! - Rewrite absolute `location` headers below the base path
//! - Always expose the correlation id
//!
//! # Design Decisions
//! - Reply headers win over codec defaults
//! - The correlation header wins over reply headers
//! - Header entries that are not valid HTTP are dropped, not fatal

use axum::body::{Body, Bytes};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::bridge::codec::{decode_body, CodecError};
use crate::bridge::tags::CorrelationContext;
use crate::bus::ReplyMessage;
use crate::config::WaitPolicy;

/// Response header carrying the correlation id.
pub const CORRELATION_HEADER: &str = "x-msb-correlation-id";

/// CORS headers never forwarded from replies.
pub const STRIPPED_HEADERS: [&str; 4] = [
    "access-control-allow-origin",
    "access-control-allow-headers",
    "access-control-allow-methods",
    "access-control-allow-credentials",
];

/// The reply of record cannot be turned into an HTTP response.
#[derive(Debug, Error)]
pub enum ReplyError {
    #[error(transparent)]
    Body(#[from] CodecError),
    #[error("invalid status code {0}")]
    Status(u16),
}

/// A fully assembled HTTP response.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl IntoResponse for HttpReply {
    fn into_response(self) -> Response {
        (self.status, self.headers, Body::from(self.body)).into_response()
    }
}

/// Build the HTTP response for an exchange.
pub fn assemble(
    reply: Option<&ReplyMessage>,
    wait_policy: WaitPolicy,
    correlation: &CorrelationContext,
    base_path: Option<&str>,
) -> Result<HttpReply, ReplyError> {
    let mut assembled = match reply {
        Some(reply) => assemble_reply(reply, base_path)?,
        None => HttpReply {
            status: if wait_policy.requires_reply() {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::NO_CONTENT
            },
            headers: HeaderMap::new(),
            body: Bytes::new(),
        },
    };

    match HeaderValue::from_str(&correlation.id) {
        Ok(value) => {
            assembled
                .headers
                .insert(HeaderName::from_static(CORRELATION_HEADER), value);
        }
        Err(_) => tracing::warn!(correlation_id = %correlation.id, "Correlation id is not a valid header value"),
    }
    Ok(assembled)
}

fn assemble_reply(reply: &ReplyMessage, base_path: Option<&str>) -> Result<HttpReply, ReplyError> {
    let status = match reply.status_code {
        Some(code) if code < 200 => return Err(ReplyError::Status(code)),
        Some(code) => StatusCode::from_u16(code).map_err(|_| ReplyError::Status(code))?,
        None => StatusCode::OK,
    };
    let body = decode_body(&reply.payload)?;
    let mut headers = forwarded_headers(reply, base_path);

    if let Some(content_type) = body.default_content_type {
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
    }
    if body.is_empty() && !headers.contains_key(CONTENT_LENGTH) {
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
    }

    Ok(HttpReply {
        status,
        headers,
        body: body.bytes,
    })
}

fn forwarded_headers(reply: &ReplyMessage, base_path: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for (name, value) in &reply.headers {
        if STRIPPED_HEADERS.iter().any(|s| s.eq_ignore_ascii_case(name)) {
            continue;
        }
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            tracing::warn!(header = %name, "Dropping reply header with invalid name");
            continue;
        };

        let value = match base_path {
            Some(base) if name == LOCATION && value.starts_with('/') => format!("{}{}", base, value),
            _ => value.clone(),
        };
        match HeaderValue::try_from(value) {
            Ok(value) => {
                headers.insert(name, value);
            }
            Err(_) => tracing::warn!(header = %name, "Dropping reply header with invalid value"),
        }
    }

    headers
}
