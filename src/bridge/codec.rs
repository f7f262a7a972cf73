//! Body codec.
//!
//! # Responsibilities
//! - Classify request content types as JSON, text or binary
//! - Encode HTTP request bodies into bus payloads
//! - Decode reply payloads into HTTP body bytes plus a default content type

use axum::body::Bytes;
use thiserror::Error;

use crate::bus::{Base64Body, Payload};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const OCTET_STREAM_CONTENT_TYPE: &str = "application/octet-stream";

/// Failure converting between HTTP bodies and bus payloads.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed JSON body: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("invalid base64 in bodyBuffer: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// How a declared content type is carried on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    Text,
    Binary,
}

impl ContentKind {
    /// Classify a `content-type` header value. Missing means binary.
    pub fn classify(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return ContentKind::Binary;
        };
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence.contains("json") {
            ContentKind::Json
        } else if essence.starts_with("text/")
            || essence.ends_with("xml")
            || essence.ends_with("javascript")
            || essence == "application/x-www-form-urlencoded"
        {
            ContentKind::Text
        } else {
            ContentKind::Binary
        }
    }
}

/// Convert an HTTP request body into a bus payload.
pub fn encode_body(content_type: Option<&str>, body: &[u8]) -> Result<Payload, CodecError> {
    if body.is_empty() {
        return Ok(Payload::Empty);
    }

    let payload = match ContentKind::classify(content_type) {
        ContentKind::Json => Payload::Json(serde_json::from_slice(body)?),
        ContentKind::Text => Payload::Text(String::from_utf8_lossy(body).into_owned()),
        ContentKind::Binary => Payload::Buffer(Base64Body::encode(body)),
    };
    Ok(payload)
}

/// HTTP body produced from a reply payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBody {
    pub bytes: Bytes,
    /// Content type to use when the reply did not set one.
    pub default_content_type: Option<&'static str>,
}

impl DecodedBody {
    fn new(bytes: impl Into<Bytes>, default_content_type: Option<&'static str>) -> Self {
        Self {
            bytes: bytes.into(),
            default_content_type,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Convert a reply payload into HTTP body bytes.
pub fn decode_body(payload: &Payload) -> Result<DecodedBody, CodecError> {
    let decoded = match payload {
        Payload::Buffer(buffer) => DecodedBody::new(buffer.decode()?, Some(OCTET_STREAM_CONTENT_TYPE)),
        Payload::Json(serde_json::Value::Null) | Payload::Empty => DecodedBody::new(Bytes::new(), None),
        Payload::Json(serde_json::Value::String(text)) | Payload::Text(text) => {
            DecodedBody::new(text.clone(), None)
        }
        Payload::Json(value) => DecodedBody::new(serde_json::to_vec(value)?, Some(JSON_CONTENT_TYPE)),
    };
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify() {
        assert_eq!(ContentKind::classify(Some("application/json")), ContentKind::Json);
        assert_eq!(
            ContentKind::classify(Some("application/vnd.api+json; charset=utf-8")),
            ContentKind::Json
        );
        assert_eq!(ContentKind::classify(Some("Text/Plain")), ContentKind::Text);
        assert_eq!(ContentKind::classify(Some("application/xml")), ContentKind::Text);
        assert_eq!(
            ContentKind::classify(Some("application/x-www-form-urlencoded")),
            ContentKind::Text
        );
        assert_eq!(ContentKind::classify(Some("image/png")), ContentKind::Binary);
        assert_eq!(ContentKind::classify(None), ContentKind::Binary);
    }

    #[test]
    fn test_encode_empty_body() {
        assert_eq!(encode_body(Some("application/json"), b"").unwrap(), Payload::Empty);
        assert_eq!(encode_body(None, b"").unwrap(), Payload::Empty);
    }

    #[test]
    fn test_encode_json_and_text() {
        let payload = encode_body(Some("application/json"), br#"{"a":[1,2]}"#).unwrap();
        assert_eq!(payload, Payload::Json(json!({ "a": [1, 2] })));

        let payload = encode_body(Some("text/plain"), "héllo".as_bytes()).unwrap();
        assert_eq!(payload, Payload::Text("héllo".into()));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let err = encode_body(Some("application/json"), b"{not json").unwrap_err();
        assert!(matches!(err, CodecError::MalformedJson(_)));
    }

    #[test]
    fn test_json_round_trip() {
        let text = br#"{"id":7,"nested":{"ok":true},"tags":["a","b"]}"#;
        let payload = encode_body(Some("application/json"), text).unwrap();
        let decoded = decode_body(&payload).unwrap();
        assert_eq!(decoded.bytes.as_ref(), text.as_slice());
        assert_eq!(decoded.default_content_type, Some(JSON_CONTENT_TYPE));
    }

    #[test]
    fn test_json_keeps_key_order() {
        let text = br#"{"name":"sprocket","id":7,"dims":{"w":2,"h":1}}"#;
        let payload = encode_body(Some("application/json"), text).unwrap();
        let decoded = decode_body(&payload).unwrap();
        assert_eq!(decoded.bytes.as_ref(), text.as_slice());
    }

    #[test]
    fn test_binary_round_trip() {
        let bytes: Vec<u8> = (0..=255).collect();
        let payload = encode_body(Some("image/png"), &bytes).unwrap();
        assert!(matches!(payload, Payload::Buffer(_)));

        let decoded = decode_body(&payload).unwrap();
        assert_eq!(decoded.bytes.as_ref(), bytes.as_slice());
        assert_eq!(decoded.default_content_type, Some(OCTET_STREAM_CONTENT_TYPE));
    }

    #[test]
    fn test_decode_strings_verbatim() {
        let decoded = decode_body(&Payload::Text("<p>hi</p>".into())).unwrap();
        assert_eq!(decoded.bytes.as_ref(), b"<p>hi</p>");
        assert_eq!(decoded.default_content_type, None);

        let decoded = decode_body(&Payload::Json(json!("quoted?"))).unwrap();
        assert_eq!(decoded.bytes.as_ref(), b"quoted?");
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode_body(&Payload::Empty).unwrap().is_empty());
        assert!(decode_body(&Payload::Json(json!(null))).unwrap().is_empty());
        assert!(decode_body(&Payload::Text(String::new())).unwrap().is_empty());
    }

    #[test]
    fn test_decode_invalid_base64() {
        let err = decode_body(&Payload::Buffer(Base64Body::from_encoded("@@@"))).unwrap_err();
        assert!(matches!(err, CodecError::InvalidBase64(_)));
    }
}
