//! In-process bus.
//!
//! # Responsibilities
//! - Keep namespace subscriptions, optionally filtered by tag
//! - Deliver each published request to every matching responder
//! - Enforce the reply policy: count threshold, timeout, immediate return
//!
//! # Design Decisions
//! - Responders reply through a [`ReplySink`]; they may reply zero, one or
//!   many times, synchronously or from spawned tasks
//! - A per-exchange collector task owns the deadline, so the exchange
//!   consumer only ever waits for `End`
//! - Subscriptions are read under a short dashmap guard and never held while
//!   a responder runs

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::bus::message::{Payload, ReplyMessage, RequestMessage};
use crate::bus::{Bus, BusError, ExchangeEvent, ExchangeHandle, ReplyPolicy};
use crate::config::WaitPolicy;

/// Handles requests published to a namespace.
pub trait Responder: Send + Sync + 'static {
    fn respond(&self, request: &RequestMessage, replies: ReplySink);
}

impl<F> Responder for F
where
    F: Fn(&RequestMessage, ReplySink) + Send + Sync + 'static,
{
    fn respond(&self, request: &RequestMessage, replies: ReplySink) {
        self(request, replies)
    }
}

/// Where a responder sends its replies.
#[derive(Debug, Clone)]
pub struct ReplySink {
    tx: mpsc::UnboundedSender<ReplyMessage>,
}

impl ReplySink {
    /// Send a reply. Returns false once the exchange no longer listens.
    pub fn send(&self, reply: ReplyMessage) -> bool {
        self.tx.send(reply).is_ok()
    }
}

struct Subscription {
    tags: Option<Vec<String>>,
    responder: Arc<dyn Responder>,
}

impl Subscription {
    fn accepts(&self, message: &RequestMessage) -> bool {
        match &self.tags {
            Some(tags) => message.has_any_tag(tags),
            None => true,
        }
    }
}

/// A bus living inside the gateway process.
#[derive(Default)]
pub struct MemoryBus {
    subscriptions: DashMap<String, Vec<Subscription>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every request published to `namespace`.
    pub fn subscribe(&self, namespace: impl Into<String>, responder: impl Responder) {
        self.add(namespace.into(), None, Arc::new(responder));
    }

    /// Receive requests published to `namespace` that carry one of `tags`.
    pub fn subscribe_tagged(
        &self,
        namespace: impl Into<String>,
        tags: Vec<String>,
        responder: impl Responder,
    ) {
        self.add(namespace.into(), Some(tags), Arc::new(responder));
    }

    /// Closure form of [`MemoryBus::subscribe`].
    pub fn subscribe_fn<F>(&self, namespace: impl Into<String>, responder: F)
    where
        F: Fn(&RequestMessage, ReplySink) + Send + Sync + 'static,
    {
        self.subscribe(namespace, responder);
    }

    pub fn subscriber_count(&self, namespace: &str) -> usize {
        self.subscriptions.get(namespace).map_or(0, |subs| subs.len())
    }

    fn add(&self, namespace: String, tags: Option<Vec<String>>, responder: Arc<dyn Responder>) {
        tracing::debug!(namespace = %namespace, tags = ?tags, "Responder subscribed");
        self.subscriptions
            .entry(namespace)
            .or_default()
            .push(Subscription { tags, responder });
    }

    fn matching(&self, message: &RequestMessage) -> Vec<Arc<dyn Responder>> {
        self.subscriptions
            .get(&message.namespace)
            .map(|subs| {
                subs.iter()
                    .filter(|sub| sub.accepts(message))
                    .map(|sub| sub.responder.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Bus for MemoryBus {
    fn publish(
        &self,
        message: RequestMessage,
        policy: ReplyPolicy,
    ) -> Result<ExchangeHandle, BusError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| BusError::Publish {
            namespace: message.namespace.clone(),
            reason: e.to_string(),
        })?;

        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let handle = ExchangeHandle::new(message.correlation_id.clone(), event_rx);

        let responders = self.matching(&message);
        tracing::debug!(
            correlation_id = %message.correlation_id,
            namespace = %message.namespace,
            responders = responders.len(),
            "Publishing request"
        );

        let sink = ReplySink { tx: reply_tx };
        for responder in responders {
            responder.respond(&message, sink.clone());
        }
        drop(sink);

        runtime.spawn(collect_replies(reply_rx, event_tx, policy));
        Ok(handle)
    }
}

/// Forward replies until the policy ends the exchange, then emit `End`.
async fn collect_replies(
    mut replies: mpsc::UnboundedReceiver<ReplyMessage>,
    events: mpsc::UnboundedSender<ExchangeEvent>,
    policy: ReplyPolicy,
) {
    if policy.wait_for_responses == WaitPolicy::Immediate {
        while let Ok(reply) = replies.try_recv() {
            if events.send(ExchangeEvent::Reply(reply)).is_err() {
                return;
            }
        }
        let _ = events.send(ExchangeEvent::End);
        return;
    }

    let threshold = policy.wait_for_responses.threshold();
    let deadline = tokio::time::sleep_until(Instant::now() + policy.response_timeout);
    tokio::pin!(deadline);

    let mut received = 0usize;
    loop {
        tokio::select! {
            reply = replies.recv() => match reply {
                Some(reply) => {
                    received += 1;
                    if events.send(ExchangeEvent::Reply(reply)).is_err() {
                        return;
                    }
                    if threshold.is_some_and(|n| received >= n) {
                        break;
                    }
                }
                // Every responder is done; more replies cannot arrive but
                // the exchange still lasts until the deadline.
                None => {
                    (&mut deadline).await;
                    break;
                }
            },
            _ = &mut deadline => break,
        }
    }

    let _ = events.send(ExchangeEvent::End);
}

/// Replies with the received request message as a JSON body.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoResponder;

impl Responder for EchoResponder {
    fn respond(&self, request: &RequestMessage, replies: ReplySink) {
        let reply = match serde_json::to_value(request) {
            Ok(value) => ReplyMessage::with_status(200)
                .header("content-type", "application/json")
                .payload(Payload::Json(value)),
            Err(e) => {
                tracing::warn!(error = %e, "Echo responder could not serialize request");
                ReplyMessage::with_status(500)
            }
        };
        replies.send(reply);
    }
}
