use linkdrop::allocator::{AllocatorState, UserRecord};
use linkdrop::storage::jsonbin::JsonBinStore;
use linkdrop::storage::{load_state, persist_state, StateStore};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sample_state() -> AllocatorState {
    let mut state = AllocatorState::new();
    state.insert(
        "1001",
        UserRecord {
            history: vec!["https://a".into(), "https://b".into()],
            current_period_count: 2,
            window_start: 1_715_000_000_000,
        },
    );
    state
}

#[tokio::test]
async fn test_load_unwraps_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/b/bin123/latest"))
        .and(header("X-Master-Key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "record": {
                "1001": {
                    "history": ["https://a", "https://b"],
                    "currentPeriodCount": 2,
                    "lastPeriodStartTime": 1_715_000_000_000i64
                }
            },
            "metadata": { "id": "bin123", "private": true }
        })))
        .mount(&server)
        .await;

    let store = JsonBinStore::with_base_url(&server.uri(), "bin123", "secret").unwrap();
    let loaded = store.load().await.unwrap();

    assert_eq!(loaded, Some(sample_state()));
}

#[tokio::test]
async fn test_load_not_found_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/b/bin123/latest"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "message": "Bin not found"
        })))
        .mount(&server)
        .await;

    let store = JsonBinStore::with_base_url(&server.uri(), "bin123", "secret").unwrap();
    assert_eq!(store.load().await.unwrap(), None);
    assert!(load_state(&store).await.is_empty());
}

#[tokio::test]
async fn test_malformed_record_degrades_to_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/b/bin123/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "record": { "1001": { "history": "not-a-list" } }
        })))
        .mount(&server)
        .await;

    let store = JsonBinStore::with_base_url(&server.uri(), "bin123", "secret").unwrap();
    assert!(store.load().await.is_err());
    assert!(load_state(&store).await.is_empty());
}

#[tokio::test]
async fn test_server_error_on_load() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = JsonBinStore::with_base_url(&server.uri(), "bin123", "secret").unwrap();
    let err = store.load().await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_save_puts_whole_blob() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v3/b/bin123"))
        .and(header("X-Master-Key", "secret"))
        .and(body_json(serde_json::to_value(sample_state()).unwrap()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = JsonBinStore::with_base_url(&server.uri(), "bin123", "secret").unwrap();
    assert!(persist_state(&store, &sample_state(), Duration::from_secs(2)).await);
}

#[tokio::test]
async fn test_save_failure_reported() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let store = JsonBinStore::with_base_url(&server.uri(), "bin123", "wrong").unwrap();
    assert!(!persist_state(&store, &sample_state(), Duration::from_secs(2)).await);
}
