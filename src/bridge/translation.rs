//! Translation of one HTTP exchange into one bus exchange.
//!
//! # State Machine
//! ```text
//! Building → Publishing → Awaiting → Completed
//!     │           │           │
//!     └───────────┴───────────┴────→ Failed
//! ```
//!
//! # Responsibilities
//! - Build the bus request and correlation context from the HTTP request
//! - Publish and collect replies until the bus ends the exchange
//! - Select the reply of record and assemble the HTTP response
//!
//! # Design Decisions
//! - One `Translation` per request; it borrows the route and bus read-only
//! - Bus timeouts are enforced by the bus, the unit only reacts to `End`
//! - A failed exchange returns the error without building a response

use std::collections::BTreeMap;
use std::time::Instant;

use axum::body::Bytes;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method, Uri};

use crate::bridge::assembler::{assemble, HttpReply};
use crate::bridge::codec::encode_body;
use crate::bridge::selector::select_reply;
use crate::bridge::tags::{resolve_bus_config, CorrelationContext, TAGS_HEADER, TAGS_QUERY_PARAM};
use crate::bus::{
    Bus, BusError, BusRequest, ExchangeEvent, ExchangeHandle, ReplyMessage, ReplyPolicy,
    RequestMessage, StringMap,
};
use crate::config::RouteConfig;
use crate::error::GatewayError;
use crate::observability::metrics;

/// The parts of an HTTP request the bridge needs.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Path parameters captured by the route.
    pub params: BTreeMap<String, String>,
    pub body: Bytes,
}

/// Where an exchange is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Building,
    Publishing,
    Awaiting,
    Completed,
    Failed,
}

/// Replies collected before the bus ended the exchange, in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeOutcome {
    pub replies: Vec<ReplyMessage>,
}

/// Drives one HTTP request through the bus.
pub struct Translation<'a> {
    route: &'a RouteConfig,
    bus: &'a dyn Bus,
    state: ExchangeState,
}

impl<'a> Translation<'a> {
    pub fn new(route: &'a RouteConfig, bus: &'a dyn Bus) -> Self {
        Self {
            route,
            bus,
            state: ExchangeState::Building,
        }
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Run the exchange to a terminal state.
    pub async fn run(mut self, request: InboundRequest) -> Result<HttpReply, GatewayError> {
        let started = Instant::now();

        let (message, correlation) = match self.build(request) {
            Ok(built) => built,
            Err((correlation_id, e)) => {
                self.transition(ExchangeState::Failed, &correlation_id);
                tracing::warn!(
                    route = %self.route.name,
                    correlation_id = %correlation_id,
                    error = %e,
                    "Rejected request"
                );
                metrics::record_exchange(&self.route.name, "invalid_request", 0, started);
                return Err(e);
            }
        };

        let outcome = match self.exchange(message, &correlation.id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.transition(ExchangeState::Failed, &correlation.id);
                tracing::error!(
                    route = %self.route.name,
                    correlation_id = %correlation.id,
                    error = %e,
                    "Bus exchange failed"
                );
                metrics::record_exchange(&self.route.name, "failed", 0, started);
                return Err(GatewayError::Bus(e));
            }
        };

        self.transition(ExchangeState::Completed, &correlation.id);
        let received = outcome.replies.len();
        let assembled = assemble(
            select_reply(&outcome.replies),
            self.route.bus.wait_for_responses,
            &correlation,
            self.route.http.base_path.as_deref(),
        );

        match assembled {
            Ok(reply) => {
                tracing::info!(
                    route = %self.route.name,
                    correlation_id = %correlation.id,
                    replies = received,
                    status = reply.status.as_u16(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Exchange completed"
                );
                let outcome = if received == 0 { "no_reply" } else { "replied" };
                metrics::record_exchange(&self.route.name, outcome, received, started);
                Ok(reply)
            }
            Err(e) => {
                tracing::warn!(
                    route = %self.route.name,
                    correlation_id = %correlation.id,
                    error = %e,
                    "Reply of record is not a valid HTTP response"
                );
                metrics::record_exchange(&self.route.name, "invalid_reply", received, started);
                Err(GatewayError::InvalidReply(e))
            }
        }
    }

    /// Building: assemble the bus request and its correlation context.
    ///
    /// On failure the correlation id generated so far is returned for logging.
    fn build(
        &mut self,
        request: InboundRequest,
    ) -> Result<(RequestMessage, CorrelationContext), (String, GatewayError)> {
        let query = parse_query(request.uri.query());
        let header_tags = joined_header(&request.headers, TAGS_HEADER, ",");
        let bus_config = resolve_bus_config(
            header_tags.as_deref(),
            query.get(TAGS_QUERY_PARAM).map(String::as_str),
            &self.route.bus,
        );
        let correlation = CorrelationContext::new(&bus_config);
        self.transition(ExchangeState::Building, &correlation.id);

        let content_type = request
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let payload = encode_body(content_type, &request.body)
            .map_err(|e| (correlation.id.clone(), GatewayError::MalformedBody(e)))?;

        let url = request
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let message = RequestMessage {
            correlation_id: correlation.id.clone(),
            namespace: bus_config.namespace.clone(),
            tags: correlation.tags.clone(),
            payload: BusRequest {
                url: strip_base_path(url, self.route.http.base_path.as_deref()),
                method: request.method.as_str().to_string(),
                headers: header_map(&request.headers),
                params: request.params,
                query,
                payload,
            },
        };
        Ok((message, correlation))
    }

    /// Publishing and Awaiting.
    async fn exchange(
        &mut self,
        message: RequestMessage,
        correlation_id: &str,
    ) -> Result<ExchangeOutcome, BusError> {
        self.transition(ExchangeState::Publishing, correlation_id);
        let mut handle = self
            .bus
            .publish(message, ReplyPolicy::from(&self.route.bus))?;

        self.transition(ExchangeState::Awaiting, correlation_id);
        collect_replies(&mut handle).await
    }

    fn transition(&mut self, next: ExchangeState, correlation_id: &str) {
        tracing::trace!(
            correlation_id = %correlation_id,
            from = ?self.state,
            to = ?next,
            "Exchange state"
        );
        self.state = next;
    }
}

/// Gather replies until the bus signals the end of the exchange.
async fn collect_replies(handle: &mut ExchangeHandle) -> Result<ExchangeOutcome, BusError> {
    let mut outcome = ExchangeOutcome::default();
    loop {
        match handle.next_event().await {
            Some(ExchangeEvent::Reply(reply)) => {
                tracing::debug!(
                    correlation_id = %handle.correlation_id(),
                    index = outcome.replies.len(),
                    status = ?reply.status_code,
                    "Reply received"
                );
                outcome.replies.push(reply);
            }
            Some(ExchangeEvent::End) => return Ok(outcome),
            Some(ExchangeEvent::Error(e)) => return Err(e),
            None => return Err(BusError::Closed),
        }
    }
}

/// Remove `base_path` from the front of `url`, keeping a leading slash.
pub fn strip_base_path(url: &str, base_path: Option<&str>) -> String {
    let Some(base) = base_path else {
        return url.to_string();
    };
    let stripped = url.strip_prefix(base).unwrap_or(url);
    if stripped.starts_with('/') {
        stripped.to_string()
    } else {
        format!("/{}", stripped)
    }
}

/// Decode a query string. Repeated keys are joined with commas.
pub fn parse_query(query: Option<&str>) -> StringMap {
    let mut params = StringMap::new();
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        params
            .entry(key.into_owned())
            .and_modify(|existing: &mut String| {
                existing.push(',');
                existing.push_str(&value);
            })
            .or_insert_with(|| value.to_string());
    }
    params
}

fn joined_header(headers: &HeaderMap, name: &str, separator: &str) -> Option<String> {
    let values: Vec<String> = headers
        .get_all(name)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(separator))
    }
}

/// Flatten headers to lowercase names; repeated headers are joined.
fn header_map(headers: &HeaderMap) -> StringMap {
    headers
        .keys()
        .filter_map(|name| {
            joined_header(headers, name.as_str(), ", ").map(|v| (name.as_str().to_string(), v))
        })
        .collect()
}
