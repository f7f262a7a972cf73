//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single gateway handler
//! - Wire up middleware (tracing, request timeout, optional CORS)
//! - Match requests against the current route table
//! - Hand matched requests to the bridge
//! - Swap the route table when a new configuration arrives
//! - Shut down gracefully on the broadcast signal

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::bridge::{InboundRequest, Translation};
use crate::bus::Bus;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::routing::RouteTable;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<ArcSwap<RouteTable>>,
    pub bus: Arc<dyn Bus>,
    pub max_body_size: usize,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    routes: Arc<ArcSwap<RouteTable>>,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new HTTP server publishing to `bus`.
    pub fn new(config: GatewayConfig, bus: Arc<dyn Bus>) -> Self {
        let routes = Arc::new(ArcSwap::from_pointee(RouteTable::from_config(
            config.routes.clone(),
        )));

        let state = AppState {
            routes: routes.clone(),
            bus,
            max_body_size: config.listener.max_body_size,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            routes,
            config,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .fallback(gateway_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http());

        if config.listener.cors {
            router = router.layer(CorsLayer::permissive());
        }
        router
    }

    /// The router, for serving or driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Handle to the live route table.
    pub fn routes(&self) -> Arc<ArcSwap<RouteTable>> {
        self.routes.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Routes are replaced whenever a configuration arrives on
    /// `config_updates`. Listener settings only apply at startup.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.routes.load().len(),
            "HTTP server starting"
        );

        let routes = self.routes.clone();
        let listener_config = self.config.listener.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                let current = &listener_config;
                let next = &config.listener;
                if current.bind_address != next.bind_address
                    || current.request_timeout_secs != next.request_timeout_secs
                    || current.max_body_size != next.max_body_size
                    || current.cors != next.cors
                {
                    tracing::warn!("Listener settings changed; restart to apply them");
                }
                reload_routes(&routes, config);
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Replace the live route table with the routes of `config`.
pub fn reload_routes(routes: &ArcSwap<RouteTable>, config: GatewayConfig) {
    let table = RouteTable::from_config(config.routes);
    tracing::info!(routes = table.len(), "Route table reloaded");
    routes.store(Arc::new(table));
}

/// Match the request to a route and run it through the bus.
async fn gateway_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    let (parts, body) = request.into_parts();

    let matched = state.routes.load().match_request(&parts.method, parts.uri.path());
    let Some(matched) = matched else {
        tracing::warn!(method = %parts.method, path = %parts.uri.path(), "No route matched");
        return Ok((StatusCode::NOT_FOUND, "No matching route found").into_response());
    };

    tracing::debug!(
        route = %matched.route.name,
        method = %parts.method,
        path = %parts.uri.path(),
        "Route matched"
    );

    let body = axum::body::to_bytes(body, state.max_body_size).await?;
    let inbound = InboundRequest {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        params: matched.params,
        body,
    };

    let reply = Translation::new(&matched.route, state.bus.as_ref())
        .run(inbound)
        .await?;
    Ok(reply.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{MemoryBus, Payload, ReplyMessage, ReplySink, RequestMessage};
    use crate::config::{BusConfig, HttpRouteConfig, RouteConfig, WaitPolicy};
    use tower::ServiceExt;

    fn route(name: &str, path: &str, namespace: &str) -> RouteConfig {
        RouteConfig {
            name: name.into(),
            http: HttpRouteConfig {
                path: path.into(),
                methods: vec![],
                base_path: None,
            },
            bus: BusConfig {
                wait_for_responses: WaitPolicy::Count(1),
                ..BusConfig::new(namespace)
            },
        }
    }

    fn server(routes: Vec<RouteConfig>) -> HttpServer {
        let bus = MemoryBus::new();
        bus.subscribe_fn("items", |req: &RequestMessage, sink: ReplySink| {
            let id = req.payload.params.get("id").cloned().unwrap_or_default();
            sink.send(ReplyMessage::with_status(200).payload(Payload::Text(id)));
        });

        let mut config = GatewayConfig::default();
        config.routes = routes;
        HttpServer::new(config, Arc::new(bus))
    }

    async fn get(router: Router, uri: &str) -> Response {
        router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_routes_to_bus() {
        let server = server(vec![route("items", "/items/:id", "items")]);
        let response = get(server.router(), "/items/42").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "42");
    }

    #[tokio::test]
    async fn test_unmatched_is_not_found() {
        let server = server(vec![route("items", "/items/:id", "items")]);
        let response = get(server.router(), "/nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_reload_replaces_routes() {
        let server = server(vec![]);
        assert_eq!(
            get(server.router(), "/things/1").await.status(),
            StatusCode::NOT_FOUND
        );

        let mut config = GatewayConfig::default();
        config.routes = vec![route("things", "/things/:id", "items")];
        reload_routes(&server.routes(), config);

        let response = get(server.router(), "/things/1").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "1");
    }

    #[tokio::test]
    async fn test_body_limit() {
        let mut config = GatewayConfig::default();
        config.listener.max_body_size = 4;
        config.routes = vec![route("items", "/items/:id", "items")];
        let server = HttpServer::new(config, Arc::new(MemoryBus::new()));

        let response = server
            .router()
            .oneshot(
                Request::post("/items/1")
                    .header("content-type", "text/plain")
                    .body(Body::from("far too long"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
