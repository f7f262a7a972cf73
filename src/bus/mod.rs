//! Bus client interface.
//!
//! # Data Flow
//! ```text
//! RequestMessage + ReplyPolicy
//!     → Bus::publish
//!     → ExchangeHandle
//!         Reply, Reply, ... then exactly one of End | Error
//! ```
//!
//! # Design Decisions
//! - One handle per published request; nothing is shared between exchanges
//! - The bus owns the wait-policy timeout; consumers only see `End`
//! - Events are delivered in arrival order over an mpsc channel

pub mod memory;
pub mod message;

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::{BusConfig, WaitPolicy};

pub use memory::{EchoResponder, MemoryBus, ReplySink, Responder};
pub use message::{Base64Body, BusRequest, Payload, ReplyMessage, RequestMessage, StringMap};

/// Transport-level failure while publishing or awaiting replies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("failed to publish to {namespace}: {reason}")]
    Publish { namespace: String, reason: String },
    #[error("exchange failed: {0}")]
    Exchange(String),
    #[error("exchange closed before completion")]
    Closed,
}

/// When an exchange stops collecting replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyPolicy {
    pub response_timeout: Duration,
    pub wait_for_responses: WaitPolicy,
}

impl From<&BusConfig> for ReplyPolicy {
    fn from(config: &BusConfig) -> Self {
        Self {
            response_timeout: config.response_timeout(),
            wait_for_responses: config.wait_for_responses,
        }
    }
}

/// Something that happened on an exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeEvent {
    Reply(ReplyMessage),
    End,
    Error(BusError),
}

/// Receiving side of one exchange.
#[derive(Debug)]
pub struct ExchangeHandle {
    correlation_id: String,
    events: mpsc::UnboundedReceiver<ExchangeEvent>,
}

impl ExchangeHandle {
    pub fn new(
        correlation_id: impl Into<String>,
        events: mpsc::UnboundedReceiver<ExchangeEvent>,
    ) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            events,
        }
    }

    /// Correlation id the request was published under.
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Next event, or `None` once the bus side has gone away.
    pub async fn next_event(&mut self) -> Option<ExchangeEvent> {
        self.events.recv().await
    }
}

/// A request/response bus.
pub trait Bus: Send + Sync + 'static {
    /// Publish a request and start collecting its replies.
    fn publish(
        &self,
        message: RequestMessage,
        policy: ReplyPolicy,
    ) -> Result<ExchangeHandle, BusError>;
}
