//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check route shape (paths, base paths, methods, namespaces)
//! - Detect duplicate route names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{GatewayConfig, RouteConfig};

const KNOWN_METHODS: &[&str] = &[
    "GET", "HEAD", "POST", "PUT", "DELETE", "PATCH", "OPTIONS", "TRACE", "CONNECT",
];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address {0:?}")]
    BindAddress(String),
    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),
    #[error("route #{0} has an empty name")]
    EmptyRouteName(usize),
    #[error("duplicate route name {0:?}")]
    DuplicateRoute(String),
    #[error("route {route:?}: path {path:?} must start with '/'")]
    RelativePath { route: String, path: String },
    #[error("route {route:?}: base path {base_path:?} must start and must not end with '/'")]
    BasePath { route: String, base_path: String },
    #[error("route {0:?}: bus namespace is empty")]
    EmptyNamespace(String),
    #[error("request timeout must be greater than zero")]
    ZeroRequestTimeout,
    #[error("route {0:?}: response timeout must be greater than zero")]
    ZeroTimeout(String),
    #[error("route {route:?}: response timeout {response_timeout_ms}ms must be shorter than the {request_timeout_secs}s request timeout")]
    TimeoutExceedsRequest {
        route: String,
        response_timeout_ms: u64,
        request_timeout_secs: u64,
    },
    #[error("route {route:?}: unknown HTTP method {method:?}")]
    UnknownMethod { route: String, method: String },
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    let mut names = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        if route.name.is_empty() {
            errors.push(ValidationError::EmptyRouteName(index));
        } else if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }
        validate_route(route, &mut errors);

        let request_timeout_ms = config.listener.request_timeout_secs.saturating_mul(1000);
        if request_timeout_ms > 0 && route.bus.response_timeout_ms >= request_timeout_ms {
            errors.push(ValidationError::TimeoutExceedsRequest {
                route: route.name.clone(),
                response_timeout_ms: route.bus.response_timeout_ms,
                request_timeout_secs: config.listener.request_timeout_secs,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_route(route: &RouteConfig, errors: &mut Vec<ValidationError>) {
    if !route.http.path.starts_with('/') {
        errors.push(ValidationError::RelativePath {
            route: route.name.clone(),
            path: route.http.path.clone(),
        });
    }

    if let Some(base_path) = &route.http.base_path {
        if !base_path.starts_with('/') || base_path.ends_with('/') {
            errors.push(ValidationError::BasePath {
                route: route.name.clone(),
                base_path: base_path.clone(),
            });
        }
    }

    for method in &route.http.methods {
        let upper = method.to_ascii_uppercase();
        if !KNOWN_METHODS.contains(&upper.as_str()) {
            errors.push(ValidationError::UnknownMethod {
                route: route.name.clone(),
                method: method.clone(),
            });
        }
    }

    if route.bus.namespace.trim().is_empty() {
        errors.push(ValidationError::EmptyNamespace(route.name.clone()));
    }
    if route.bus.response_timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout(route.name.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{BusConfig, HttpRouteConfig};

    fn route(name: &str, path: &str) -> RouteConfig {
        RouteConfig {
            name: name.into(),
            http: HttpRouteConfig {
                path: path.into(),
                methods: vec![],
                base_path: None,
            },
            bus: BusConfig::new("ns"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "not an address".into();

        let mut bad = route("widgets", "widgets");
        bad.http.base_path = Some("/api/".into());
        bad.http.methods = vec!["get".into(), "FETCH".into()];
        bad.bus.namespace = " ".into();
        bad.bus.response_timeout_ms = 0;
        config.routes.push(bad);
        config.routes.push(route("widgets", "/other"));
        config.routes.push(route("", "/x"));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 8);
        assert!(errors.contains(&ValidationError::BindAddress("not an address".into())));
        assert!(errors.contains(&ValidationError::DuplicateRoute("widgets".into())));
        assert!(errors.contains(&ValidationError::EmptyRouteName(2)));
        assert!(errors.contains(&ValidationError::UnknownMethod {
            route: "widgets".into(),
            method: "FETCH".into(),
        }));
        assert!(errors.contains(&ValidationError::ZeroTimeout("widgets".into())));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = GatewayConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::MetricsAddress("nope".into())]
        );
    }

    #[test]
    fn test_request_timeout_must_outlast_bus_wait() {
        let mut config = GatewayConfig::default();
        config.listener.request_timeout_secs = 0;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::ZeroRequestTimeout]
        );

        config.listener.request_timeout_secs = 1;
        let mut slow = route("slow", "/slow");
        slow.bus.response_timeout_ms = 5_000;
        config.routes.push(slow);
        let mut exact = route("exact", "/exact");
        exact.bus.response_timeout_ms = 1_000;
        config.routes.push(exact);
        config.routes.push(route("fast", "/fast"));
        config.routes.last_mut().unwrap().bus.response_timeout_ms = 999;

        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![
                ValidationError::TimeoutExceedsRequest {
                    route: "slow".into(),
                    response_timeout_ms: 5_000,
                    request_timeout_secs: 1,
                },
                ValidationError::TimeoutExceedsRequest {
                    route: "exact".into(),
                    response_timeout_ms: 1_000,
                    request_timeout_secs: 1,
                },
            ]
        );
    }
}
