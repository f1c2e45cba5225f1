// Integration tests for the WebSocket event feed and the HTTP API served
// on a real listener.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use futures::StreamExt;
use serde_json::{json, Value};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tower::ServiceExt;

use botfsm_backend::api::{self, AppState};
use botfsm_backend::engine::{BotRegistry, ManualClock};
use botfsm_backend::events::EventHub;

fn test_state() -> AppState {
    let registry = BotRegistry::new(Arc::new(ManualClock::new()), 99);
    AppState::new(Arc::new(registry), EventHub::new(64))
}

/// Serve the router on an ephemeral port and return its address.
async fn spawn_server(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = api::router(state, None);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr.to_string()
}

async fn next_json<S>(ws: &mut S) -> Value
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("Timed out waiting for event")
            .expect("Stream closed")
            .expect("WebSocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn post(app: &axum::Router, uri: &str, body: Value) -> StatusCode {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn test_new_subscriber_gets_bot_list_first() {
    let state = test_state();
    state.create_bot(100).unwrap();
    state.create_bot(80).unwrap();
    let addr = spawn_server(state).await;

    let (mut ws, _) = connect_async(format!("ws://{addr}/ws/bots")).await.unwrap();
    let first = next_json(&mut ws).await;
    assert_eq!(first["type"], "bots_list");
    let bots = first["bots"].as_array().unwrap();
    assert_eq!(bots.len(), 2);
    assert_eq!(bots[0]["bot_id"], "bot_1");
    assert_eq!(bots[1]["max_health"], 80);
}

#[tokio::test]
async fn test_feed_follows_mutations() {
    let state = test_state();
    let addr = spawn_server(state.clone()).await;
    let app = api::router(state.clone(), None);

    let (mut ws, _) = connect_async(format!("ws://{addr}/ws/bots")).await.unwrap();
    let first = next_json(&mut ws).await;
    assert_eq!(first["type"], "bots_list");
    assert_eq!(first["bots"].as_array().unwrap().len(), 0);

    // The handler subscribes before sending the list, so once the list
    // arrives every later event is delivered.
    assert_eq!(post(&app, "/api/bots", json!({})).await, StatusCode::CREATED);
    let event = next_json(&mut ws).await;
    assert_eq!(event["type"], "bot_created");
    assert_eq!(event["state"]["bot_id"], "bot_1");

    let seen = json!({ "player_visible": true, "player_distance": 5.0 });
    assert_eq!(post(&app, "/api/bots/bot_1/update", seen).await, StatusCode::OK);
    let event = next_json(&mut ws).await;
    assert_eq!(event["type"], "bot_transition");
    assert_eq!(event["bot_id"], "bot_1");
    assert_eq!(event["from"], "idle");
    assert_eq!(event["to"], "chase");
    assert_eq!(event["reason"], "Player detected nearby");

    assert_eq!(
        post(&app, "/api/bots/bot_1/damage", json!({ "damage": 40 })).await,
        StatusCode::OK
    );
    let event = next_json(&mut ws).await;
    assert_eq!(event["type"], "bot_updated");
    assert_eq!(event["state"]["health"], 60);

    assert_eq!(post(&app, "/api/bots/reset", json!({})).await, StatusCode::OK);
    let event = next_json(&mut ws).await;
    assert_eq!(event["type"], "bots_reset");
    assert_eq!(event["bot_count"], 1);
}

#[tokio::test]
async fn test_concurrent_http_clients() {
    let state = test_state();
    let app = api::router(state.clone(), None);

    let creates: Vec<_> = (0..20)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move { post(&app, "/api/bots", json!({})).await })
        })
        .collect();
    for handle in creates {
        assert_eq!(handle.await.unwrap(), StatusCode::CREATED);
    }
    assert_eq!(state.registry.len(), 20);

    let hits: Vec<_> = (0..50)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move {
                post(&app, "/api/bots/bot_7/damage", json!({ "damage": 1 })).await
            })
        })
        .collect();
    for handle in hits {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }
    let health = state.registry.with_bot("bot_7", |bot| bot.health()).unwrap();
    assert_eq!(health, 50);
}
