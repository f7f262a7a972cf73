//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http2bus::bus::MemoryBus;
use http2bus::config::{BusConfig, GatewayConfig, HttpRouteConfig, RouteConfig, WaitPolicy};
use http2bus::http::HttpServer;
use http2bus::lifecycle::Shutdown;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A gateway serving on an ephemeral local port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub updates: mpsc::UnboundedSender<GatewayConfig>,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a gateway for `routes`, publishing to `bus`.
pub async fn start_gateway(routes: Vec<RouteConfig>, bus: MemoryBus) -> TestGateway {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.routes = routes;

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config, Arc::new(bus));
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    TestGateway {
        addr,
        client: reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap(),
        updates,
        shutdown,
    }
}

/// A route answering every method on `path`.
pub fn route(name: &str, path: &str, namespace: &str, wait: WaitPolicy) -> RouteConfig {
    RouteConfig {
        name: name.into(),
        http: HttpRouteConfig {
            path: path.into(),
            methods: vec![],
            base_path: None,
        },
        bus: BusConfig {
            wait_for_responses: wait,
            response_timeout_ms: 500,
            ..BusConfig::new(namespace)
        },
    }
}
