//! Functional tests for the HTTP agent client.
//!
//! These tests run an in-process agent and exercise the wire contract:
//! - Requests are JSON `{"prompt": ...}` posted to the agent URL.
//! - Replies are read from `response`/`text` or taken as plain text.
//! - Non-success statuses and slow agents become typed errors.

use faultbench::{AgentClient, AgentError, HttpAgentClient};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use warp::http::StatusCode;
use warp::Filter;

fn spawn_agent() -> SocketAddr {
    let json = warp::post()
        .and(warp::path("json"))
        .and(warp::body::json())
        .map(|body: serde_json::Value| {
            let prompt = body["prompt"].as_str().unwrap_or_default().to_string();
            warp::reply::json(&serde_json::json!({ "response": format!("echo: {prompt}") }))
        });
    let text_field = warp::post()
        .and(warp::path("text"))
        .map(|| warp::reply::json(&serde_json::json!({ "text": "lock contention on orders" })));
    let plain = warp::post()
        .and(warp::path("plain"))
        .map(|| "replica lag is 40s");
    let busy = warp::post()
        .and(warp::path("busy"))
        .map(|| warp::reply::with_status("overloaded", StatusCode::SERVICE_UNAVAILABLE));
    let slow = warp::post().and(warp::path("slow")).and_then(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok::<_, Infallible>("too late")
    });

    let routes = json
        .or(text_field)
        .or(plain)
        .or(busy)
        .or(slow);
    let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    addr
}

const TIMEOUT: Duration = Duration::from_secs(10);

/// Tenet: the prompt travels as JSON and the `response` field is the answer.
#[tokio::test]
async fn json_response_field_is_the_answer() {
    let addr = spawn_agent();
    let client = HttpAgentClient::new();

    let answer = assert_ok!(
        client
            .send(&format!("http://{addr}/json"), "why is it slow?", TIMEOUT)
            .await
    );
    assert_eq!(answer, "echo: why is it slow?");
}

/// Tenet: a `text` field or a plain body are accepted too.
#[tokio::test]
async fn text_field_and_plain_bodies_are_accepted() {
    let addr = spawn_agent();
    let client = HttpAgentClient::new();

    let answer = client
        .send(&format!("http://{addr}/text"), "p", TIMEOUT)
        .await
        .unwrap();
    assert_eq!(answer, "lock contention on orders");

    let answer = client
        .send(&format!("http://{addr}/plain"), "p", TIMEOUT)
        .await
        .unwrap();
    assert_eq!(answer, "replica lag is 40s");
}

/// Tenet: a non-success status carries the status and body.
#[tokio::test]
async fn error_status_is_reported() {
    let addr = spawn_agent();
    let err = assert_err!(
        HttpAgentClient::new()
            .send(&format!("http://{addr}/busy"), "p", TIMEOUT)
            .await
    );
    match err {
        AgentError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("expected Status, got {other:?}"),
    }
}

/// Tenet: the request timeout surfaces as a timeout, not a transport error.
#[tokio::test]
async fn slow_agent_times_out() {
    let addr = spawn_agent();
    let timeout = Duration::from_millis(200);
    let err = HttpAgentClient::new()
        .send(&format!("http://{addr}/slow"), "p", timeout)
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Timeout(t) if t == timeout), "{err:?}");
}

/// Tenet: an unreachable agent is a transport error.
#[tokio::test]
async fn unreachable_agent_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = HttpAgentClient::new()
        .send(&format!("http://{addr}/json"), "p", TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Transport(_)), "{err:?}");
}
