//! End-to-end tests over a real listener.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use smocks::config::parse_config;
use smocks::engine::Engine;
use smocks::routing::{MockResponse, RouteSpec, Variant};
use smocks::HttpServer;
use std::sync::Arc;
use tower::ServiceExt;

mod common;

const CONFIG: &str = r#"
[state]
backend = "cookie"
cookie_name = "sid"

[admin]
api_key = "secret"

[[routes]]
id = "item"
path = "/api/items/{id}"
method = "GET"

[[routes.variants]]
id = "ok"
default = true
body = { name = "widget" }

[[routes.variants]]
id = "down"
status = 503
text = "maintenance"
when = { input = "mode", equals = "down" }

[routes.input.mode]
kind = "select"
default = "up"
options = ["up", "down"]

[[routes]]
id = "create"
path = "/api/items"
method = "POST"

[[routes.variants]]
id = "created"
status = 201
headers = { location = "/api/items/1" }

[[plugins]]
id = "feature"
[plugins.input.mode]
default = "A"

[profiles.outage]
item = { variant = "down" }
"#;

fn session_cookie(response: &reqwest::Response) -> String {
    let header = response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap();
    header.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn test_mock_requests_and_sessions() {
    let (addr, _engine, shutdown) = common::spawn_server(CONFIG).await;
    let client = common::client();
    let base = format!("http://{}", addr);

    let res = client.get(format!("{base}/api/items/7")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let cookie = session_cookie(&res);
    assert!(cookie.starts_with("sid="));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "name": "widget" }));

    // Known session: no new cookie.
    let res = client
        .get(format!("{base}/api/items/7"))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert!(res.headers().get("set-cookie").is_none());

    let res = client.post(format!("{base}/api/items")).send().await.unwrap();
    assert_eq!(res.status(), 201);
    assert_eq!(res.headers()["location"], "/api/items/1");

    let res = client.delete(format!("{base}/api/items/7")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    shutdown.trigger();
}

#[tokio::test]
async fn test_admin_changes_only_the_callers_session() {
    let (addr, engine, shutdown) = common::spawn_server(CONFIG).await;
    let client = common::client();
    let base = format!("http://{}", addr);

    let res = client.get(format!("{base}/api/items/1")).send().await.unwrap();
    let cookie = session_cookie(&res);

    let res = client
        .post(format!("{base}/_admin/route/item"))
        .json(&json!({ "variant": "down" }))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(format!("{base}/_admin/route/item"))
        .bearer_auth("secret")
        .header("cookie", &cookie)
        .json(&json!({ "variant": "down" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let snapshot: Value = res.json().await.unwrap();
    let item = snapshot["routes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"] == "item")
        .unwrap();
    assert_eq!(item["active_variant"], "down");

    let res = client
        .get(format!("{base}/api/items/1"))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);
    assert_eq!(res.text().await.unwrap(), "maintenance");

    let res = client.get(format!("{base}/api/items/1")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let res = client
        .post(format!("{base}/_admin/profile/unknown"))
        .bearer_auth("secret")
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    let res = client
        .post(format!("{base}/_admin/reset"))
        .bearer_auth("secret")
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let res = client
        .get(format!("{base}/api/items/1"))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = client
        .post(format!("{base}/_admin/route/item"))
        .bearer_auth("secret")
        .header("cookie", &cookie)
        .json(&json!({ "input": { "mode": "down" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let res = client
        .get(format!("{base}/api/items/1"))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);

    assert!(engine.state().len() >= 2);
    shutdown.trigger();
}

#[tokio::test]
async fn test_admin_profiles_plugins_and_har() {
    let (addr, _engine, shutdown) = common::spawn_server(CONFIG).await;
    let client = common::client();
    let base = format!("http://{}", addr);
    let admin = |path: &str| {
        client
            .post(format!("{base}/_admin/{path}"))
            .bearer_auth("secret")
            .header("cookie", "sid=tester")
    };

    let res = admin("profile/outage").send().await.unwrap();
    assert_eq!(res.status(), 200);
    let res = client
        .get(format!("{base}/api/items/1"))
        .header("cookie", "sid=tester")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);

    let res = admin("global/input/feature")
        .json(&json!({ "id": "mode", "value": "B" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let snapshot: Value = res.json().await.unwrap();
    let feature = snapshot["plugins"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == "feature")
        .unwrap();
    assert_eq!(feature["input"]["mode"]["value"], "B");
    assert!(feature["input"].get("id").is_none());
    assert!(feature["input"].get("value").is_none());

    let res = admin("global/input/feature").json(&json!({ "mode": "C" })).send().await.unwrap();
    let snapshot: Value = res.json().await.unwrap();
    let feature = snapshot["plugins"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == "feature")
        .unwrap();
    assert_eq!(feature["input"]["mode"]["value"], "C");

    let res = admin("global/input/feature")
        .json(&json!({ "id": "colour", "value": "red" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let res = admin("global/input/nope").json(&json!({ "mode": "B" })).send().await.unwrap();
    assert_eq!(res.status(), 404);

    let archive = json!({ "calls": [
        { "id": "c1", "response": { "status": 418, "content": { "text": "{\"tea\":true}" } } }
    ]});
    let res = admin("action/har-load").json(&archive).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let res = client
        .get(format!("{base}/_admin/har/c1"))
        .bearer_auth("secret")
        .header("cookie", "sid=tester")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 418);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({ "tea": true }));

    let res = client
        .get(format!("{base}/_admin/har/c2"))
        .bearer_auth("secret")
        .header("cookie", "sid=tester")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    let res = admin("action/har-load").json(&json!({ "bogus": 1 })).send().await.unwrap();
    assert_eq!(res.status(), 500);

    let res = client
        .get(format!("{base}/_admin/status"))
        .bearer_auth("secret")
        .send()
        .await
        .unwrap();
    let status: Value = res.json().await.unwrap();
    assert_eq!(status["routes"], 2);

    shutdown.trigger();
}

#[tokio::test]
async fn test_response_builder_sees_request() {
    let mut builder = Engine::builder();
    builder
        .route(RouteSpec::new("/hello/{name}").id("hello"))
        .unwrap()
        .variant(Variant::new("greet").respond_with(|ctx, request| {
            let count = ctx.state("count").and_then(|v| v.as_u64()).unwrap_or(0) + 1;
            ctx.set_state("count", count);
            Ok(MockResponse::json(
                200,
                json!({
                    "hello": request.param("name"),
                    "lang": request.query.get("lang"),
                    "count": count,
                }),
            ))
        }));
    let engine = Arc::new(builder.build().unwrap());
    let config = parse_config("").unwrap();
    let app = HttpServer::new(engine, &config).router();

    for expected in 1..=2 {
        let response = app
            .clone()
            .oneshot(
                Request::get("/hello/ada?lang=en")
                    .header("cookie", "smocks-session=fixed")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({ "hello": "ada", "lang": "en", "count": expected }));
    }
}

#[tokio::test]
async fn test_unmatched_requests_create_no_sessions() {
    let config = parse_config(CONFIG).unwrap();
    let engine = smocks::lifecycle::build_engine(&config).unwrap();
    let app = HttpServer::new(engine.clone(), &config).router();

    for _ in 0..1000 {
        let response = app
            .clone()
            .oneshot(Request::get("/no-such-route").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get("set-cookie").is_none());
    }
    assert_eq!(engine.state().len(), 0);

    let response = app
        .oneshot(Request::get("/api/items/1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("set-cookie").is_some());
    assert_eq!(engine.state().len(), 1);
}

#[tokio::test]
async fn test_proxy_target_forwards_matched_routes() {
    use axum::extract::{Path, RawQuery};
    use axum::routing::get;

    let upstream = axum::Router::new().route(
        "/v2/api/items/{id}",
        get(|Path(id): Path<String>, RawQuery(query): RawQuery| async move {
            axum::Json(json!({ "upstream": id, "query": query }))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream_addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, upstream).await;
    });

    let config = format!(
        r#"
        [state]
        backend = "cookie"
        cookie_name = "sid"

        [proxy.targets]
        staging = "http://{upstream_addr}/v2"
        dead = "http://127.0.0.1:1"

        [[routes]]
        id = "item"
        path = "/api/items/{{id}}"
        [[routes.variants]]
        id = "ok"
        body = {{ name = "widget" }}
        "#
    );
    let (addr, _engine, shutdown) = common::spawn_server(&config).await;
    let client = common::client();
    let base = format!("http://{}", addr);
    let select = |target: Value| {
        client
            .post(format!("{base}/_admin/global/input/proxy"))
            .header("cookie", "sid=tester")
            .json(&json!({ "id": "target", "value": target }))
            .send()
    };
    let item = || {
        client
            .get(format!("{base}/api/items/9?x=1"))
            .header("cookie", "sid=tester")
            .send()
    };

    assert_eq!(item().await.unwrap().json::<Value>().await.unwrap(), json!({ "name": "widget" }));

    assert_eq!(select(json!("staging")).await.unwrap().status(), 200);
    let res = item().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(
        res.json::<Value>().await.unwrap(),
        json!({ "upstream": "9", "query": "x=1" })
    );

    let other = client.get(format!("{base}/api/items/9")).send().await.unwrap();
    assert_eq!(other.json::<Value>().await.unwrap(), json!({ "name": "widget" }));

    assert_eq!(select(json!("dead")).await.unwrap().status(), 200);
    assert_eq!(item().await.unwrap().status(), 502);

    assert_eq!(select(Value::Null).await.unwrap().status(), 200);
    assert_eq!(item().await.unwrap().json::<Value>().await.unwrap(), json!({ "name": "widget" }));

    shutdown.trigger();
}
