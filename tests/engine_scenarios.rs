//! Session-state and resolution scenarios against the engine API.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::http::Method;
use metrics::{Counter, CounterFn, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use serde_json::{json, Value};
use smocks::actions::Action;
use smocks::engine::{ConfigError, Engine, ValidationError};
use smocks::plugins::{InputField, PluginSpec};
use smocks::profiles::{Profile, RouteInstruction};
use smocks::routing::{MockResponse, Predicate, RequestData, RouteSpec, Variant};
use smocks::state::{SessionId, StateScope};

mod common;

fn active(engine: &Engine, route: &str, session: &SessionId) -> String {
    engine
        .routes()
        .active_variant(route, session)
        .unwrap()
        .map(|v| v.id().to_string())
        .unwrap()
}

#[test]
fn test_duplicate_route_id_fails_validation() {
    let mut builder = Engine::builder();
    builder
        .route(RouteSpec::new("/a").id("same"))
        .unwrap()
        .variant(Variant::new("v1"));
    builder
        .route(RouteSpec::new("/b").id("same"))
        .unwrap()
        .variant(Variant::new("v1"));

    let ConfigError::Validation(errors) = builder.build().unwrap_err() else {
        panic!("expected validation errors");
    };
    assert_eq!(errors, vec![ValidationError::DuplicateRoute("same".into())]);
}

#[test]
fn test_missing_path_is_a_config_error() {
    let mut builder = Engine::builder();
    let err = builder.route(RouteSpec::default()).err().unwrap();
    assert!(matches!(err, ConfigError::MissingPath));
}

#[test]
fn test_method_on_multi_variant_route_forks() {
    let mut builder = Engine::builder();
    builder
        .route(RouteSpec::new("/items"))
        .unwrap()
        .method(Method::GET)
        .variant(Variant::new("list"))
        .variant(Variant::new("empty"))
        .method(Method::POST)
        .variant(Variant::new("created").status(201));
    let engine = builder.build().unwrap();

    let routes = engine.routes().all();
    assert_eq!(routes.len(), 2);
    assert_eq!(routes[0].path(), routes[1].path());
    assert_eq!(routes[0].id(), "GET /items");
    assert_eq!(routes[0].variants().len(), 2);
    assert_eq!(routes[1].id(), "POST /items");
    assert_eq!(routes[1].variants()[0].id(), "created");
}

#[test]
fn test_flag_predicate_scenario() {
    let engine = common::sample_engine();
    let session = SessionId::from("s1");

    assert_eq!(active(&engine, "r1", &session), "v1");

    engine
        .route_context(&session, "r1")
        .unwrap()
        .set_state("flag", true);
    assert_eq!(active(&engine, "r1", &session), "v2");

    let other = SessionId::from("s2");
    assert_eq!(active(&engine, "r1", &other), "v1");
}

#[test]
fn test_route_bound_action_flips_predicate() {
    let mut builder = Engine::builder();
    builder
        .route(RouteSpec::new("/r1").id("r1"))
        .unwrap()
        .variant(Variant::new("v1").as_default())
        .variant(Variant::new("v2").when(Predicate::StateEquals {
            key: "flag".into(),
            value: json!(true),
        }));
    builder.action(
        Action::new("raise-flag", |ctx, _| {
            ctx.set_state("flag", true);
            Ok(())
        })
        .for_route("r1"),
    );
    let engine = builder.build().unwrap();
    let session = SessionId::from("s1");

    assert_eq!(active(&engine, "r1", &session), "v1");
    assert!(engine.actions().execute("raise-flag", Value::Null, &session).unwrap());
    assert_eq!(active(&engine, "r1", &session), "v2");
    assert_eq!(active(&engine, "r1", &SessionId::from("s2")), "v1");
}

#[test]
fn test_response_builder_flips_predicate() {
    let mut builder = Engine::builder();
    builder
        .route(RouteSpec::new("/once").id("once"))
        .unwrap()
        .variant(Variant::new("first").as_default().respond_with(|ctx, _| {
            ctx.set_state("served", true);
            ctx.set_variant_state("hits", 1);
            Ok(MockResponse::json(200, json!({ "first": true })))
        }))
        .variant(
            Variant::new("again")
                .status(409)
                .when(Predicate::StateEquals {
                    key: "served".into(),
                    value: json!(true),
                }),
        );
    let engine = builder.build().unwrap();
    let session = SessionId::from("s1");
    let request = RequestData::new("GET", "/once");
    let route = engine.routes().get("once").unwrap();

    let first = engine.respond(&session, route, &request).unwrap().unwrap();
    assert_eq!(first.status, 200);
    let second = engine.respond(&session, route, &request).unwrap().unwrap();
    assert_eq!(second.status, 409);

    assert_eq!(
        engine.state().user_value(&session, &StateScope::variant("once", "first"), "hits"),
        Some(json!(1))
    );
    assert_eq!(engine.route_context(&session, "once").unwrap().state("hits"), None);
}

#[test]
fn test_pinned_variant_beats_predicate() {
    let engine = common::sample_engine();
    let session = SessionId::from("s1");
    engine
        .route_context(&session, "r1")
        .unwrap()
        .set_state("flag", true);

    assert!(engine.routes().select_variant("r1", "v1", &session));
    assert_eq!(active(&engine, "r1", &session), "v1");

    assert!(!engine.routes().select_variant("r1", "ghost", &session));
    assert!(!engine.routes().select_variant("ghost", "v1", &session));

    assert!(engine.routes().clear_selection("r1", &session));
    assert_eq!(active(&engine, "r1", &session), "v2");
}

#[test]
fn test_plugin_input_scenario() {
    let engine = common::sample_engine();
    let plugins = engine.plugins();
    let a = SessionId::from("a");
    let b = SessionId::from("b");

    assert_eq!(plugins.get_input_value("p1", "x", &a), None);

    plugins.reset_input(&a);
    plugins.reset_input(&b);
    assert_eq!(plugins.get_input_value("p1", "x", &a), Some(json!("A")));

    plugins.update_input("p1", "x", json!("B"), &a);
    assert_eq!(plugins.get_input_value("p1", "x", &a), Some(json!("B")));
    assert_eq!(plugins.get_input_value("p1", "x", &b), Some(json!("A")));
}

#[test]
fn test_update_input_is_idempotent() {
    let engine = common::sample_engine();
    let session = SessionId::from("s");

    engine.plugins().update_input("p1", "x", json!("B"), &session);
    let once = engine.plugins().get_input(&session);
    engine.plugins().update_input("p1", "x", json!("B"), &session);
    assert_eq!(engine.plugins().get_input(&session), once);

    engine.plugins().update_input("new-plugin", "y", json!(1), &session);
    assert_eq!(engine.plugins().get_input_value("new-plugin", "y", &session), Some(json!(1)));
    assert_eq!(engine.plugins().get_input_value("new-plugin", "missing", &session), None);
}

#[test]
fn test_reset_then_reseed_restores_defaults() {
    let engine = common::sample_engine();
    let session = SessionId::from("s");
    engine.plugins().update_input("p1", "x", json!("changed"), &session);
    engine.plugins().update_input("p1", "extra", json!(42), &session);
    engine.routes().select_variant("r2", "slow", &session);

    engine.state().reset_route_state(&session);
    assert_eq!(engine.plugins().get_input_value("p1", "x", &session), Some(json!("changed")));
    assert_eq!(active(&engine, "r2", &session), "fast");

    engine.plugins().reset_input(&session);
    assert_eq!(engine.plugins().get_input_value("p1", "x", &session), Some(json!("A")));
    assert_eq!(engine.plugins().get_input_value("p1", "extra", &session), None);
}

#[test]
fn test_profile_application() {
    let mut builder = Engine::builder();
    builder
        .route(RouteSpec::new("/r1").id("r1"))
        .unwrap()
        .variant(Variant::new("v1"))
        .variant(Variant::new("v2"));
    builder
        .route(RouteSpec::new("/r2").id("r2"))
        .unwrap()
        .input("delay", InputField::number(0))
        .variant(Variant::new("fast"))
        .variant(Variant::new("slow"));
    builder
        .plugin(PluginSpec::new("p1").input("x", InputField::text("A")))
        .unwrap();
    builder.profile(
        "outage",
        Profile::new()
            .route("r1", RouteInstruction::variant("v2"))
            .route("r2", RouteInstruction::default().with_input("delay", 500)),
    );
    let engine = builder.build().unwrap();
    let session = SessionId::from("s");

    engine.routes().select_variant("r2", "slow", &session);
    engine.plugins().update_input("p1", "x", json!("B"), &session);

    assert!(engine.profiles().apply("outage", &session));
    assert_eq!(active(&engine, "r1", &session), "v2");
    assert_eq!(active(&engine, "r2", &session), "fast");
    assert_eq!(engine.routes().input_value("r2", "delay", &session), Some(json!(500)));
    assert_eq!(engine.plugins().get_input_value("p1", "x", &session), Some(json!("A")));

    let inline = Profile::new().route("r2", RouteInstruction::variant("slow"));
    assert!(engine.profiles().apply(&inline, &session));
    assert_eq!(active(&engine, "r1", &session), "v1");
    assert_eq!(active(&engine, "r2", &session), "slow");
    assert_eq!(engine.routes().input_value("r2", "delay", &session), Some(json!(0)));
}

#[test]
fn test_unknown_profile_leaves_session_untouched() {
    let engine = common::sample_engine();
    let session = SessionId::from("s");
    engine.routes().select_variant("r2", "slow", &session);
    engine.plugins().update_input("p1", "x", json!("B"), &session);

    // Resolution happens before any reset, so nothing changes.
    assert!(!engine.profiles().apply("nope", &session));
    assert_eq!(active(&engine, "r2", &session), "slow");
    assert_eq!(engine.plugins().get_input_value("p1", "x", &session), Some(json!("B")));
}

#[test]
fn test_sessions_never_share_state() {
    let engine = common::sample_engine();
    let a = SessionId::from("a");
    let b = SessionId::from("b");

    engine.context(&a).set_state("token", "secret");
    engine.route_context(&a, "r1").unwrap().set_state("flag", true);
    engine.routes().update_input("r2", "delay", json!(100), &a);

    assert_eq!(engine.context(&b).state("token"), None);
    assert_eq!(engine.route_context(&b, "r1").unwrap().state("flag"), None);
    assert_eq!(engine.routes().input_value("r2", "delay", &b), Some(json!(0)));
    assert_eq!(engine.context(&a).state("token"), Some(json!("secret")));
}

#[test]
fn test_session_wide_state_survives_route_reset() {
    let engine = common::sample_engine();
    let session = SessionId::from("s");
    engine.context(&session).set_state("__har", json!({ "calls": [] }));
    engine.route_context(&session, "r1").unwrap().set_state("flag", true);

    engine.state().reset_route_state(&session);

    assert!(engine.context(&session).state("__har").is_some());
    assert_eq!(engine.route_context(&session, "r1").unwrap().state("flag"), None);
}

#[test]
fn test_context_input_without_plugin_reads_route_input() {
    let mut builder = Engine::builder();
    builder
        .route(RouteSpec::new("/r").id("r"))
        .unwrap()
        .input("x", InputField::text("route-default"))
        .variant(Variant::new("v"));
    builder
        .plugin(PluginSpec::new("p1").input("x", InputField::text("plugin-default")))
        .unwrap();
    builder
        .action(Action::new("route-bound", |ctx, input| {
            *input = ctx.input("x").unwrap_or(Value::Null);
            ctx.set_state("seen", input.clone());
            Ok(())
        })
        .for_route("r"))
        .action(Action::new("plugin-bound", |ctx, _| {
            ctx.set_state("seen", ctx.input("x").unwrap_or(Value::Null));
            Ok(())
        })
        .for_plugin("p1"));
    let engine = builder.build().unwrap();
    let session = SessionId::from("s");
    engine.initialize_session(&session);

    assert!(engine.actions().execute("route-bound", Value::Null, &session).unwrap());
    assert_eq!(
        engine.state().user_value(&session, &StateScope::Route("r".into()), "seen"),
        Some(json!("route-default"))
    );

    assert!(engine.actions().execute("plugin-bound", Value::Null, &session).unwrap());
    assert_eq!(engine.context(&session).state("seen"), Some(json!("plugin-default")));
}

#[test]
fn test_action_outcomes() {
    let mut builder = Engine::builder();
    builder
        .route(RouteSpec::new("/r").id("r"))
        .unwrap()
        .variant(Variant::new("v"));
    builder.action(Action::new("explode", |_, _| Err("boom".into())));
    let engine = builder.build().unwrap();
    let session = SessionId::from("s");

    assert!(!engine.actions().execute("missing", Value::Null, &session).unwrap());
    let err = engine.actions().execute("explode", Value::Null, &session).unwrap_err();
    assert_eq!(err.to_string(), "boom");
}

#[test]
fn test_predicate_error_propagates() {
    let mut builder = Engine::builder();
    builder
        .route(RouteSpec::new("/r").id("r"))
        .unwrap()
        .variant(Variant::new("broken").when_fn(|_| Err("predicate failed".into())))
        .variant(Variant::new("fallback"));
    let engine = builder.build().unwrap();

    let err = engine
        .routes()
        .active_variant("r", &SessionId::from("s"))
        .unwrap_err();
    assert_eq!(err.to_string(), "predicate failed");
}

#[test]
fn test_har_archive_round_trip() {
    let config = smocks::config::parse_config(
        r#"
        [[routes]]
        path = "/ping"
        [[routes.variants]]
        id = "pong"
        "#,
    )
    .unwrap();
    let engine = smocks::lifecycle::build_engine(&config).unwrap();
    let session = SessionId::from("s");

    let archive = json!({ "log": { "entries": [
        { "request": { "method": "GET", "url": "http://x/a" },
          "response": { "status": 202, "content": { "text": "{\"ok\":true}" } } }
    ]}});
    assert!(engine.actions().execute("har-load", archive, &session).unwrap());

    let call = smocks::plugins::har::find_call(&engine.context(&session), "0");
    assert_eq!(call, Some((202, json!({ "ok": true }))));
    assert_eq!(smocks::plugins::har::find_call(&engine.context(&SessionId::from("other")), "0"), None);
}

#[test]
fn test_snapshot_reports_resolution() {
    let engine = common::sample_engine();
    let session = SessionId::from("s");
    engine.initialize_session(&session);
    engine.routes().select_variant("r2", "slow", &session);

    let snapshot = engine.snapshot(&session).unwrap();
    let r2 = snapshot.routes.iter().find(|r| r.id == "r2").unwrap();
    assert_eq!(r2.active_variant.as_deref(), Some("slow"));
    assert_eq!(r2.input["delay"].value, Some(json!(0)));
    assert_eq!(snapshot.plugins[0].input["x"].value, Some(json!("A")));
}

#[derive(Default)]
struct CountingRecorder {
    counts: Arc<Mutex<BTreeMap<String, u64>>>,
}

struct Tally {
    name: String,
    counts: Arc<Mutex<BTreeMap<String, u64>>>,
}

impl CounterFn for Tally {
    fn increment(&self, value: u64) {
        *self.counts.lock().unwrap().entry(self.name.clone()).or_default() += value;
    }

    fn absolute(&self, _value: u64) {}
}

impl Recorder for CountingRecorder {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
        let labels: Vec<String> = key
            .labels()
            .map(|label| format!("{}={}", label.key(), label.value()))
            .collect();
        Counter::from_arc(Arc::new(Tally {
            name: format!("{}{{{}}}", key.name(), labels.join(",")),
            counts: self.counts.clone(),
        }))
    }

    fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

#[test]
fn test_metrics_count_serving_only() {
    let engine = common::sample_engine();
    let session = SessionId::from("s");
    engine.initialize_session(&session);
    let recorder = CountingRecorder::default();

    metrics::with_local_recorder(&recorder, || {
        engine.snapshot(&session).unwrap();
        assert!(!engine.profiles().apply("caller-chosen-id", &session));
        engine.routes().active_variant("r1", &session).unwrap();
    });

    let counts = recorder.counts.lock().unwrap();
    assert_eq!(counts.get("smocks_resolutions_total{route=r1,variant=v1}"), Some(&1));
    assert!(!counts.keys().any(|name| name.contains("route=r2")));
    assert_eq!(
        counts.get("smocks_profile_applications_total{profile=unknown,outcome=error}"),
        Some(&1)
    );
    assert!(!counts.keys().any(|name| name.contains("caller-chosen-id")));
}
