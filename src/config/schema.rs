//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, limits).
    pub listener: ListenerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// In-process bus settings.
    pub bus: BusSettings,

    /// Route definitions mapping HTTP requests to bus namespaces.
    pub routes: Vec<RouteConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Upper bound on the time spent on a single HTTP request, in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body size in bytes.
    pub max_body_size: usize,

    /// Answer CORS preflights and add permissive CORS headers.
    pub cors: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_size: 2 * 1024 * 1024, // 2MB
            cors: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Settings for the in-process bus.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BusSettings {
    /// Namespaces answered by the built-in echo responder.
    pub echo_namespaces: Vec<String>,
}

/// A route: which HTTP requests it accepts and where they are published.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// HTTP side of the route.
    pub http: HttpRouteConfig,

    /// Bus side of the route.
    pub bus: BusConfig,
}

/// HTTP matching options for a route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpRouteConfig {
    /// Path pattern below the base path, e.g. `/widgets/:id`.
    pub path: String,

    /// Accepted methods. Empty accepts any method.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Prefix stripped from published URLs and prepended to relative
    /// `location` headers, e.g. `/api`.
    #[serde(default)]
    pub base_path: Option<String>,
}

impl HttpRouteConfig {
    /// The pattern matched against incoming paths: base path plus path.
    pub fn full_path(&self) -> String {
        match &self.base_path {
            Some(base) => format!("{}{}", base, self.path),
            None => self.path.clone(),
        }
    }
}

/// Bus options for a route.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BusConfig {
    /// Namespace requests are published to.
    pub namespace: String,

    /// How long to wait for replies, in milliseconds.
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,

    /// How many replies to wait for.
    #[serde(default)]
    pub wait_for_responses: WaitPolicy,

    /// Static tags attached to every request on this route.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

fn default_response_timeout_ms() -> u64 {
    3000
}

impl BusConfig {
    /// Create a bus config with default timeout and wait policy.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            response_timeout_ms: default_response_timeout_ms(),
            wait_for_responses: WaitPolicy::default(),
            tags: None,
        }
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

/// How many replies an exchange waits for before it ends.
///
/// Configured as an integer: `-1` (or any negative) waits until the
/// response timeout, `0` returns immediately, `n` waits for `n` replies
/// or the timeout, whichever comes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(from = "i64", into = "i64")]
pub enum WaitPolicy {
    #[default]
    UntilTimeout,
    Immediate,
    Count(u32),
}

impl WaitPolicy {
    /// Whether the policy expects at least one reply.
    pub fn requires_reply(&self) -> bool {
        !matches!(self, WaitPolicy::Immediate)
    }

    /// Reply count that ends the exchange early, if any.
    pub fn threshold(&self) -> Option<usize> {
        match self {
            WaitPolicy::Count(n) => Some(*n as usize),
            _ => None,
        }
    }
}

impl From<i64> for WaitPolicy {
    fn from(value: i64) -> Self {
        match value {
            v if v < 0 => WaitPolicy::UntilTimeout,
            0 => WaitPolicy::Immediate,
            v => WaitPolicy::Count(u32::try_from(v).unwrap_or(u32::MAX)),
        }
    }
}

impl From<WaitPolicy> for i64 {
    fn from(value: WaitPolicy) -> Self {
        match value {
            WaitPolicy::UntilTimeout => -1,
            WaitPolicy::Immediate => 0,
            WaitPolicy::Count(n) => n as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_defaults() {
        let route: RouteConfig = toml::from_str(
            r#"
            name = "widgets"
            [http]
            path = "/widgets"
            [bus]
            namespace = "widgets:api"
            "#,
        )
        .unwrap();

        assert_eq!(route.bus.response_timeout_ms, 3000);
        assert_eq!(route.bus.wait_for_responses, WaitPolicy::UntilTimeout);
        assert!(route.bus.tags.is_none());
        assert!(route.http.methods.is_empty());
        assert_eq!(route.http.full_path(), "/widgets");
    }

    #[test]
    fn test_wait_policy_from_integer() {
        assert_eq!(WaitPolicy::from(-1), WaitPolicy::UntilTimeout);
        assert_eq!(WaitPolicy::from(-7), WaitPolicy::UntilTimeout);
        assert_eq!(WaitPolicy::from(0), WaitPolicy::Immediate);
        assert_eq!(WaitPolicy::from(3), WaitPolicy::Count(3));

        assert!(WaitPolicy::UntilTimeout.requires_reply());
        assert!(WaitPolicy::Count(1).requires_reply());
        assert!(!WaitPolicy::Immediate.requires_reply());
        assert_eq!(WaitPolicy::Count(2).threshold(), Some(2));
    }

    #[test]
    fn test_full_path_with_base() {
        let http = HttpRouteConfig {
            path: "/widgets/:id".into(),
            methods: vec![],
            base_path: Some("/api".into()),
        };
        assert_eq!(http.full_path(), "/api/widgets/:id");
    }
}
