//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up matching route for a method and path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in configuration order (acceptable for typical route counts)
//! - First match wins
//! - Explicit `None` rather than silent default

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::Method;

use crate::config::RouteConfig;
use crate::routing::matcher::{MethodMatcher, PathPattern};

#[derive(Debug)]
struct CompiledRoute {
    config: Arc<RouteConfig>,
    pattern: PathPattern,
    methods: MethodMatcher,
}

/// A route that matched a request.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<RouteConfig>,
    pub params: BTreeMap<String, String>,
}

/// Compiled, immutable route table.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    pub fn from_config(routes: Vec<RouteConfig>) -> Self {
        let routes = routes
            .into_iter()
            .map(|config| CompiledRoute {
                pattern: PathPattern::parse(&config.http.full_path()),
                methods: MethodMatcher::new(&config.http.methods),
                config: Arc::new(config),
            })
            .collect();
        Self { routes }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the first route accepting `method` on `path`.
    pub fn match_request(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.routes.iter().find_map(|compiled| {
            if !compiled.methods.matches(method) {
                return None;
            }
            compiled.pattern.matches(path).map(|params| RouteMatch {
                route: compiled.config.clone(),
                params,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BusConfig, HttpRouteConfig};

    fn route(name: &str, path: &str, methods: &[&str], base_path: Option<&str>) -> RouteConfig {
        RouteConfig {
            name: name.into(),
            http: HttpRouteConfig {
                path: path.into(),
                methods: methods.iter().map(|m| m.to_string()).collect(),
                base_path: base_path.map(String::from),
            },
            bus: BusConfig::new(name),
        }
    }

    #[test]
    fn test_first_match_wins() {
        let table = RouteTable::from_config(vec![
            route("read", "/widgets/:id", &["GET"], Some("/api")),
            route("write", "/widgets/:id", &[], Some("/api")),
            route("catch-all", "/*", &[], None),
        ]);
        assert_eq!(table.len(), 3);

        let m = table.match_request(&Method::GET, "/api/widgets/7").unwrap();
        assert_eq!(m.route.name, "read");
        assert_eq!(m.params["id"], "7");

        let m = table.match_request(&Method::PUT, "/api/widgets/7").unwrap();
        assert_eq!(m.route.name, "write");

        let m = table.match_request(&Method::GET, "/elsewhere").unwrap();
        assert_eq!(m.route.name, "catch-all");
    }

    #[test]
    fn test_no_match() {
        let table = RouteTable::from_config(vec![route("read", "/widgets", &["GET"], None)]);
        assert!(table.match_request(&Method::POST, "/widgets").is_none());
        assert!(table.match_request(&Method::GET, "/gadgets").is_none());
        assert!(RouteTable::default().is_empty());
    }
}
