#[allow(dead_code)]
mod common;

use std::time::Duration;

use arcadia_server::config::{LimitsConfig, ServerConfig};

use common::{TestServer, open_stream};

#[tokio::test]
async fn stream_starts_with_current_frame() {
    let server = TestServer::new().await;
    let id = server.create_session().await;

    let mut frames = open_stream(&server, &id).await;
    assert_eq!(frames.next().await.unwrap()["kind"], "blank");

    let view = server.play(&id, "remote-classic").await;
    let frame = frames.next().await.unwrap();
    assert_eq!(frame["kind"], "navigate");
    assert_eq!(frame["src"], view["src"]);

    // A late subscriber is brought up to date
    let mut late = open_stream(&server, &id).await;
    let frame = late.next().await.unwrap();
    assert_eq!(frame["kind"], "navigate");
    assert_eq!(frame["src"], "https://games.example.com/classic");
}

#[tokio::test]
async fn settings_arrive_in_order() {
    let server = TestServer::new().await;
    let id = server.create_session().await;
    server.play(&id, "neon-strike").await;

    let mut frames = open_stream(&server, &id).await;
    assert_eq!(frames.next().await.unwrap()["kind"], "navigate");

    server
        .post_config(&id, "neonIntensity", serde_json::json!(0.2))
        .await;
    server
        .post_config(&id, "neonIntensity", serde_json::json!(0.8))
        .await;

    let first = frames.next().await.unwrap();
    let second = frames.next().await.unwrap();
    assert_eq!(first["kind"], "message");
    assert_eq!(
        first["data"],
        serde_json::json!({ "type": "SETTING_CHANGE", "key": "neonIntensity", "value": 0.2 })
    );
    assert_eq!(second["data"]["value"], 0.8);
}

#[tokio::test]
async fn boolean_settings_are_forwarded() {
    let server = TestServer::new().await;
    let id = server.create_session().await;
    let mut frames = open_stream(&server, &id).await;
    frames.next().await.unwrap();

    server
        .post_config(&id, "invertY", serde_json::json!(true))
        .await;
    let frame = frames.next().await.unwrap();
    assert_eq!(frame["data"]["key"], "invertY");
    assert_eq!(frame["data"]["value"], true);
}

#[tokio::test]
async fn settings_before_stream_attach_are_dropped() {
    let server = TestServer::new().await;
    let id = server.create_session().await;
    server.play(&id, "neon-strike").await;

    server
        .post_config(&id, "sensitivity", serde_json::json!(1.5))
        .await;

    let mut frames = open_stream(&server, &id).await;
    assert_eq!(frames.next().await.unwrap()["kind"], "navigate");
    server
        .post_config(&id, "sensitivity", serde_json::json!(2.0))
        .await;
    let frame = frames.next().await.unwrap();
    assert_eq!(frame["data"]["value"], 2.0);
}

#[tokio::test]
async fn stream_blanks_and_ends_on_close() {
    let server = TestServer::new().await;
    let id = server.create_session().await;
    server.play(&id, "neon-strike").await;

    let mut frames = open_stream(&server, &id).await;
    frames.next().await.unwrap();

    reqwest::Client::new()
        .delete(server.session_url(&id, ""))
        .send()
        .await
        .unwrap();

    assert_eq!(frames.next().await.unwrap()["kind"], "blank");
    assert!(frames.next().await.is_none());
}

#[tokio::test]
async fn stream_for_unknown_session_is_404() {
    let server = TestServer::new().await;
    let resp = reqwest::get(server.session_url("missing", "/stream"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn stream_returns_503_when_at_capacity() {
    let config = ServerConfig {
        limits: LimitsConfig {
            max_stream_subscribers: 1,
            ..LimitsConfig::default()
        },
        ..ServerConfig::default()
    };
    let server = TestServer::from_config(config).await;
    let id = server.create_session().await;

    let _first = open_stream(&server, &id).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let resp = reqwest::get(server.session_url(&id, "/stream"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
}
