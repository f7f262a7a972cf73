//! HTTP to bus translation subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → tags.rs (resolve bus config, mint correlation id)
//!     → codec.rs (encode body)
//!     → translation.rs (publish, collect replies)
//!     → selector.rs (reply of record)
//!     → assembler.rs (status, headers, body)
//!     → HttpReply
//! ```

pub mod assembler;
pub mod codec;
pub mod selector;
pub mod tags;
pub mod translation;

pub use assembler::{HttpReply, ReplyError, CORRELATION_HEADER};
pub use codec::CodecError;
pub use tags::{CorrelationContext, TAGS_HEADER, TAGS_QUERY_PARAM};
pub use translation::{ExchangeState, InboundRequest, Translation};
