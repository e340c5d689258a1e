use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use twilight_model::id::Id;

use linkdrop::allocator::DrawPolicy;
use linkdrop::discord::interactions::{run_draw, Requester};
use linkdrop::storage::memory::MemoryStore;

#[path = "../common/common.rs"]
mod common;

use common::MockDiscord;

const HOUR: u64 = 3600;

fn policy(max_links: u32, cooldown_secs: u64) -> DrawPolicy {
    DrawPolicy {
        max_links,
        cooldown: Duration::from_secs(cooldown_secs),
    }
}

fn requester() -> Requester {
    Requester {
        id: Id::new(555),
        tag: "tester".into(),
    }
}

async fn json_body(res: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_draw_delivers_link_by_dm() {
    let discord = Arc::new(MockDiscord::default());
    let store = Arc::new(MemoryStore::new());
    let state = common::create_state(&["https://one"], policy(4, 2 * HOUR), discord.clone(), store.clone());

    let reply = run_draw(&state, &requester(), 0).await;

    assert_eq!(
        reply,
        "✅ Check your DMs! You have 3 links remaining for the next 2 hours."
    );
    let dms = discord.dms();
    assert_eq!(dms.len(), 1);
    assert_eq!(dms[0].0, Id::new(555));
    assert!(dms[0].1.contains("(https://one)"));

    let saved = store.current().await.unwrap();
    assert_eq!(saved.get("555").unwrap().history, vec!["https://one"]);
}

#[tokio::test]
async fn test_fifth_draw_hits_cooldown() {
    let discord = Arc::new(MockDiscord::default());
    let state = common::create_state(
        &["a", "b", "c", "d", "e", "f"],
        policy(4, 2 * HOUR),
        discord.clone(),
        Arc::new(MemoryStore::new()),
    );

    for i in 0..4 {
        let reply = run_draw(&state, &requester(), i * 1000).await;
        assert!(reply.starts_with("✅"), "draw {} failed: {}", i, reply);
    }

    // 45 minutes in
    let reply = run_draw(&state, &requester(), 45 * 60 * 1000).await;
    assert_eq!(
        reply,
        "❌ You have already received 4 links in the last 2 hours. Please try again in 1 hours and 15 minutes."
    );

    let mut links: Vec<String> = discord.dms().into_iter().map(|(_, m)| m).collect();
    links.sort();
    links.dedup();
    assert_eq!(links.len(), 4);
}

#[tokio::test]
async fn test_exhausted_catalog() {
    let discord = Arc::new(MockDiscord::default());
    let state = common::create_state(&["only"], policy(4, HOUR), discord.clone(), Arc::new(MemoryStore::new()));

    run_draw(&state, &requester(), 0).await;
    let reply = run_draw(&state, &requester(), 1).await;

    assert_eq!(
        reply,
        "❌ You have already received all available links. Please check back later."
    );
    assert_eq!(discord.dms().len(), 1);
}

#[tokio::test]
async fn test_blocked_dms_still_consume_a_draw() {
    let discord = Arc::new(MockDiscord::blocking_dms());
    let store = Arc::new(MemoryStore::new());
    let state = common::create_state(&["a", "b"], policy(1, HOUR), discord.clone(), store.clone());

    let reply = run_draw(&state, &requester(), 0).await;
    assert!(reply.starts_with("⚠️ I couldn't send you a DM"));

    let record = store.current().await.unwrap().get("555").cloned().unwrap();
    assert_eq!(record.current_period_count, 1);
    assert_eq!(record.history.len(), 1);

    let reply = run_draw(&state, &requester(), 10).await;
    assert!(reply.contains("Please try again in 0 hours and 59 minutes"));
}

#[tokio::test]
async fn test_ping_is_ponged() {
    let state = common::create_state(&["a"], policy(4, HOUR), Arc::new(MockDiscord::default()), Arc::new(MemoryStore::new()));
    let app = linkdrop::create_app(state);

    let req = common::signed_request(&serde_json::json!({
        "type": 1,
        "token": "t",
        "id": "1"
    }));
    let res = app.oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await, serde_json::json!({ "type": 1 }));
}

#[tokio::test]
async fn test_bad_signature_rejected() {
    let state = common::create_state(&["a"], policy(4, HOUR), Arc::new(MockDiscord::default()), Arc::new(MemoryStore::new()));
    let app = linkdrop::create_app(state);

    let req = Request::builder()
        .method("POST")
        .uri("/webhooks/discord")
        .header("x-signature-ed25519", "00".repeat(64))
        .header("x-signature-timestamp", common::TIMESTAMP)
        .body(Body::from(r#"{"type":1,"token":"t","id":"1"}"#))
        .unwrap();
    let res = app.oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_send_link_embed_requires_admin() {
    let state = common::create_state(&["a"], policy(4, 2 * HOUR), Arc::new(MockDiscord::default()), Arc::new(MemoryStore::new()));
    let app = linkdrop::create_app(state);

    let interaction = |permissions: &str| {
        serde_json::json!({
            "type": 2,
            "token": "t",
            "id": "1",
            "guild_id": "99",
            "data": { "name": "sendlinkembed" },
            "member": { "user": { "id": "555", "username": "mod" }, "permissions": permissions }
        })
    };

    let res = app
        .clone()
        .oneshot(common::signed_request(&interaction("0")))
        .await
        .unwrap();
    let body = json_body(res).await;
    assert_eq!(body["type"], 4);
    assert_eq!(body["data"]["flags"], 64);

    let res = app
        .oneshot(common::signed_request(&interaction("8")))
        .await
        .unwrap();
    let body = json_body(res).await;
    assert_eq!(body["type"], 4);
    assert!(body["data"].get("flags").is_none());
    assert_eq!(body["data"]["embeds"][0]["title"], "Link Generator");
    assert_eq!(body["data"]["embeds"][0]["color"], 0x5865F2);
    assert_eq!(
        body["data"]["components"][0]["components"][0]["custom_id"],
        "link_button"
    );
}

#[tokio::test]
async fn test_button_defers_then_edits_reply() {
    let discord = Arc::new(MockDiscord::default());
    let state = common::create_state(&["https://x"], policy(4, HOUR), discord.clone(), Arc::new(MemoryStore::new()));
    let app = linkdrop::create_app(state);

    let req = common::signed_request(&serde_json::json!({
        "type": 3,
        "token": "interaction-token",
        "id": "1",
        "guild_id": "99",
        "data": { "custom_id": "link_button", "component_type": 2 },
        "member": { "user": { "id": "555", "username": "tester" }, "permissions": "0" }
    }));
    let res = app.oneshot(req).await.unwrap();
    let body = json_body(res).await;
    assert_eq!(body, serde_json::json!({ "type": 5, "data": { "flags": 64 } }));

    // The draw runs on a spawned task
    let mut edits = Vec::new();
    for _ in 0..100 {
        edits = discord.edits();
        if !edits.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].0, "interaction-token");
    assert!(edits[0].1.starts_with("✅ Check your DMs!"));
    assert_eq!(discord.dms().len(), 1);
}
