//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use smocks::config::{parse_config, MockConfig};
use smocks::engine::Engine;
use smocks::lifecycle::build_engine;
use smocks::plugins::{InputField, PluginSpec};
use smocks::routing::{Predicate, RouteSpec, Variant};
use smocks::{HttpServer, Shutdown};

/// `r1` with a default `v1` and a `v2` guarded by route state `flag == true`,
/// plus plugin `p1` with input `x` defaulting to `"A"`.
#[allow(dead_code)]
pub fn sample_engine() -> Engine {
    let mut builder = Engine::builder();
    builder
        .route(RouteSpec::new("/r1").id("r1"))
        .unwrap()
        .variant(Variant::new("v1").as_default().json(json!({ "variant": "v1" })))
        .variant(
            Variant::new("v2")
                .status(503)
                .when(Predicate::StateEquals {
                    key: "flag".into(),
                    value: json!(true),
                }),
        );
    builder
        .route(RouteSpec::new("/r2").id("r2"))
        .unwrap()
        .input("delay", InputField::number(0))
        .variant(Variant::new("fast"))
        .variant(Variant::new("slow"));
    builder
        .plugin(PluginSpec::new("p1").input("x", InputField::text("A")))
        .unwrap();
    builder.build().unwrap()
}

/// Parse `toml`, build the engine and serve it on an ephemeral port.
#[allow(dead_code)]
pub async fn spawn_server(toml: &str) -> (SocketAddr, Arc<Engine>, Shutdown) {
    let mut config: MockConfig = parse_config(toml).unwrap();
    config.listener.bind_address = "127.0.0.1:0".into();

    let engine = build_engine(&config).unwrap();
    let server = HttpServer::new(engine.clone(), &config);
    let listener = tokio::net::TcpListener::bind(&config.listener.bind_address)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, engine, shutdown)
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
