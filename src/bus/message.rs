//! Messages exchanged with the bus.
//!
//! Request and reply payloads carry their body as exactly one of nothing,
//! text, structured JSON, or base64-encoded bytes. On the wire this is the
//! pair of optional `body` / `bodyBuffer` fields; in memory it is [`Payload`].

use std::collections::BTreeMap;
use std::fmt;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Header or query mapping. Keys are lowercase for headers.
pub type StringMap = BTreeMap<String, String>;

/// Standard alphabet, padded on encode, padding optional on decode.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Raw bytes carried as base64 text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Base64Body(String);

impl Base64Body {
    pub fn encode(bytes: &[u8]) -> Self {
        Self(BASE64.encode(bytes))
    }

    /// Wrap text that is already base64.
    pub fn from_encoded(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(self.0.trim())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Base64Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of a bus message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(into = "RawPayload", from = "RawPayload")]
pub enum Payload {
    #[default]
    Empty,
    Text(String),
    Json(Value),
    Buffer(Base64Body),
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }
}

/// Wire shape of [`Payload`].
#[derive(Serialize, Deserialize, Default)]
struct RawPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<Value>,
    #[serde(default, rename = "bodyBuffer", skip_serializing_if = "Option::is_none")]
    body_buffer: Option<String>,
}

impl From<Payload> for RawPayload {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::Empty => RawPayload::default(),
            Payload::Text(text) => RawPayload {
                body: Some(Value::String(text)),
                body_buffer: None,
            },
            Payload::Json(value) => RawPayload {
                body: Some(value),
                body_buffer: None,
            },
            Payload::Buffer(buffer) => RawPayload {
                body: None,
                body_buffer: Some(buffer.0),
            },
        }
    }
}

impl From<RawPayload> for Payload {
    fn from(raw: RawPayload) -> Self {
        match (raw.body_buffer, raw.body) {
            (Some(buffer), _) if !buffer.is_empty() => Payload::Buffer(Base64Body(buffer)),
            (_, None) | (_, Some(Value::Null)) => Payload::Empty,
            (_, Some(Value::String(text))) => Payload::Text(text),
            (_, Some(value)) => Payload::Json(value),
        }
    }
}

/// The HTTP request as published on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusRequest {
    /// Path and query, base path removed.
    pub url: String,
    pub method: String,
    pub headers: StringMap,
    pub params: StringMap,
    pub query: StringMap,
    #[serde(flatten)]
    pub payload: Payload,
}

/// Envelope for one published request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage {
    pub correlation_id: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub payload: BusRequest,
}

impl RequestMessage {
    /// Whether any of `tags` is attached to this message.
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        self.tags
            .as_ref()
            .is_some_and(|own| own.iter().any(|t| tags.contains(t)))
    }
}

/// A reply received for a published request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub headers: StringMap,
    #[serde(flatten)]
    pub payload: Payload,
}

impl ReplyMessage {
    /// A reply with the given status code and no headers or body.
    pub fn with_status(status_code: u16) -> Self {
        Self {
            status_code: Some(status_code),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }
}
