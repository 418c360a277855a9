//! End-to-end tests for discovery and its SSE event stream.

use std::time::Duration;

use axum::{http::header, routing::get, Router};
use serde_json::{json, Value};

mod common;

use common::{summarize, SseReader};

fn pair(kind: &str, message: &str) -> (String, String) {
    (kind.to_string(), message.to_string())
}

async fn start(server: &common::TestServer, target: &str) -> reqwest::Response {
    common::client()
        .post(server.url("/api/discover/start"))
        .json(&json!({ "target": target }))
        .send()
        .await
        .unwrap()
}

async fn stop(server: &common::TestServer) -> Value {
    let res = common::client()
        .post(server.url("/api/discover/stop"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    res.json().await.unwrap()
}

#[tokio::test]
async fn test_connect_greeting() {
    let server = common::start_server(|_| {}).await;
    let mut events = SseReader::open(&common::client(), &server.url("/api/discover/events")).await;

    let content_type = events.response().headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));

    let greeting = events.next_event().await.unwrap();
    assert_eq!(greeting["kind"], "info");
    assert_eq!(greeting["message"], "connected");
    assert!(greeting.get("meta").is_none());
    assert!(greeting["time"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn test_stream_without_heartbeats() {
    let server = common::start_server(|config| config.events.keep_alive_secs = 0).await;
    let mut events = SseReader::open(&common::client(), &server.url("/api/discover/events")).await;
    assert_eq!(events.next_event().await.unwrap()["message"], "connected");

    start(&server, "openai.com").await;
    let run = summarize(&events.until_finished().await);
    assert_eq!(run.len(), 3);
    assert_eq!(run[1].0, "suggestion");
}

#[tokio::test]
async fn test_known_domain_yields_suggestion_without_probing() {
    let server = common::start_server(|_| {}).await;
    let mut events = SseReader::open(&common::client(), &server.url("/api/discover/events")).await;
    events.next_event().await.unwrap();

    let res = start(&server, "https://www.openai.com/docs").await;
    assert_eq!(res.status(), 200);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({ "status": "started" }));

    let run = events.until_finished().await;
    assert_eq!(
        summarize(&run),
        vec![
            pair("info", "Discovering: openai.com"),
            pair("suggestion", "Known domain: openai.com"),
            pair("info", "discover_finished"),
        ]
    );
    let meta = &run[1]["meta"];
    assert_eq!(meta["docs_url"], "https://platform.openai.com/docs/api-reference/introduction");
    assert_eq!(meta["api_base"], "https://api.openai.com/v1");
    assert_eq!(meta["auth"], "bearer");
    assert_eq!(meta["openapi_source"], "github_repo:openai/openai-openapi");
}

#[tokio::test]
async fn test_openapi_document_is_found() {
    let upstream = common::start_upstream(Router::new().route(
        "/openapi.json",
        get(|| async { ([(header::CONTENT_TYPE, "application/json")], r#"{"openapi":"3.0.0"}"#) }),
    ))
    .await;
    let server = common::start_server(|_| {}).await;
    let mut events = SseReader::open(&common::client(), &server.url("/api/discover/events")).await;
    events.next_event().await.unwrap();

    assert_eq!(start(&server, &format!("http://{upstream}/anything")).await.status(), 200);

    let run = events.until_finished().await;
    let url = format!("http://{upstream}/openapi.json");
    assert_eq!(
        summarize(&run),
        vec![
            pair("info", &format!("Discovering: {upstream}")),
            pair("probe", &format!("GET {url}")),
            pair("probe_result", "200 application/json"),
            pair("finding", "Looks like OpenAPI"),
            pair("info", "discover_finished"),
        ]
    );
    assert_eq!(run[3]["meta"]["openapi_url"], url);
}

#[tokio::test]
async fn test_every_path_is_probed_when_nothing_matches() {
    let upstream = common::start_upstream(Router::new()).await;
    let server = common::start_server(|_| {}).await;
    let mut events = SseReader::open(&common::client(), &server.url("/api/discover/events")).await;
    events.next_event().await.unwrap();

    start(&server, &upstream.to_string()).await;

    let run = summarize(&events.until_finished().await);
    let probes: Vec<_> = run.iter().filter(|(kind, _)| kind == "probe").map(|(_, m)| m.clone()).collect();
    assert_eq!(
        probes,
        vec![
            format!("GET http://{upstream}/openapi.json"),
            format!("GET http://{upstream}/swagger.json"),
            format!("GET http://{upstream}/docs"),
        ]
    );
    let results = run.iter().filter(|(kind, _)| kind == "probe_result").count();
    assert_eq!(results, 3);
    assert!(run.iter().all(|(kind, _)| kind != "finding"));
    assert_eq!(run.last().unwrap(), &pair("info", "discover_finished"));
}

#[tokio::test]
async fn test_unreachable_host_reports_failures() {
    let addr = common::closed_port().await;
    let server = common::start_server(|_| {}).await;
    let mut events = SseReader::open(&common::client(), &server.url("/api/discover/events")).await;
    events.next_event().await.unwrap();

    start(&server, &addr.to_string()).await;

    let run = summarize(&events.until_finished().await);
    let failures = run
        .iter()
        .filter(|(kind, message)| kind == "warning" && message.starts_with("fail: "))
        .count();
    assert_eq!(failures, 3);
    assert_eq!(run.last().unwrap(), &pair("info", "discover_finished"));
}

#[tokio::test]
async fn test_stop_cancels_in_flight_probe() {
    let upstream = common::start_hanging_upstream().await;
    let server = common::start_server(|config| config.discovery.probe_timeout_secs = 60).await;
    let mut events = SseReader::open(&common::client(), &server.url("/api/discover/events")).await;
    events.next_event().await.unwrap();

    start(&server, &upstream.to_string()).await;
    assert_eq!(events.next_event().await.unwrap()["message"], format!("Discovering: {upstream}"));
    assert_eq!(events.next_event().await.unwrap()["kind"], "probe");

    assert_eq!(stop(&server).await, json!({ "status": "stopping" }));

    let rest = summarize(&events.until_finished().await);
    assert_eq!(
        rest,
        vec![
            pair("warning", "fail: request cancelled"),
            pair("warning", "discover_cancelled"),
            pair("info", "discover_finished"),
        ]
    );
    assert!(events.is_quiet_for(Duration::from_millis(300)).await);

    // The slot is free again once the run has finished.
    assert_eq!(start(&server, "openai.com").await.status(), 200);
    let again = summarize(&events.until_finished().await);
    assert_eq!(again.last().unwrap(), &pair("info", "discover_finished"));
}

#[tokio::test]
async fn test_only_one_concurrent_start_wins() {
    let upstream = common::start_hanging_upstream().await;
    let server = common::start_server(|config| config.discovery.probe_timeout_secs = 60).await;
    let mut events = SseReader::open(&common::client(), &server.url("/api/discover/events")).await;
    events.next_event().await.unwrap();

    let target = upstream.to_string();
    let attempts = (0..8).map(|_| start(&server, &target));
    let responses = futures_util::future::join_all(attempts).await;

    let mut started = 0;
    let mut conflicts = 0;
    for res in responses {
        match res.status().as_u16() {
            200 => started += 1,
            409 => {
                assert_eq!(res.text().await.unwrap(), "already running");
                conflicts += 1;
            }
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(started, 1);
    assert_eq!(conflicts, 7);

    stop(&server).await;
    let run = summarize(&events.until_finished().await);
    let discovering = run.iter().filter(|(_, m)| m.starts_with("Discovering: ")).count();
    assert_eq!(discovering, 1);
    let finished = run.iter().filter(|(_, m)| m == "discover_finished").count();
    assert_eq!(finished, 1);
    assert!(events.is_quiet_for(Duration::from_millis(500)).await);
}

#[tokio::test]
async fn test_every_subscriber_sees_the_same_run() {
    let server = common::start_server(|_| {}).await;
    let client = common::client();
    let mut first = SseReader::open(&client, &server.url("/api/discover/events")).await;
    let mut second = SseReader::open(&client, &server.url("/api/discover/events")).await;
    first.next_event().await.unwrap();
    second.next_event().await.unwrap();

    start(&server, "openai.com").await;

    let a = summarize(&first.until_finished().await);
    let b = summarize(&second.until_finished().await);
    assert_eq!(a, b);
    assert_eq!(a.len(), 3);
}

#[tokio::test]
async fn test_bad_start_requests() {
    let server = common::start_server(|_| {}).await;

    let res = start(&server, "   ").await;
    assert_eq!(res.status(), 400);
    assert_eq!(res.text().await.unwrap(), "bad request");

    let res = common::client()
        .post(server.url("/api/discover/start"))
        .body("target=x")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    assert_eq!(res.text().await.unwrap(), "bad request");

    let res = common::client().get(server.url("/api/discover/start")).send().await.unwrap();
    assert_eq!(res.status(), 405);
}

#[tokio::test]
async fn test_stop_when_idle_is_harmless() {
    let server = common::start_server(|_| {}).await;
    assert_eq!(stop(&server).await, json!({ "status": "stopping" }));
}

#[tokio::test]
async fn test_shutdown_ends_open_streams() {
    let server = common::start_server(|_| {}).await;
    let mut events = SseReader::open(&common::client(), &server.url("/api/discover/events")).await;
    events.next_event().await.unwrap();

    server.shutdown.trigger();

    assert!(events.next_event().await.is_none());
    tokio::time::timeout(Duration::from_secs(10), server.handle)
        .await
        .expect("server did not drain")
        .unwrap();
}
