//! Integration tests for the slotvoice-web server.
//!
//! These tests start a real axum server on a random port with a stub
//! completer and exercise both endpoints over HTTP.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use slotvoice::service::SlotService;
use slotvoice::store::{ExchangeStore, MemoryStore};
use slotvoice::{Completer, CompletionFuture, Message, MessageRole};
use slotvoice_web::{WebConfig, spawn_web};

const KEY: &str = "test-secret";

/// Completer that returns a fixed reply, counts calls and keeps the last
/// message list it was given.
struct StubCompleter {
    reply: Result<String, String>,
    calls: AtomicUsize,
    last_messages: Mutex<Vec<Message>>,
}

impl StubCompleter {
    fn new(reply: Result<&str, &str>) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.map(str::to_string).map_err(str::to_string),
            calls: AtomicUsize::new(0),
            last_messages: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Completer for StubCompleter {
    fn complete<'a>(&'a self, messages: &'a [Message], _max_tokens: u32) -> CompletionFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock().unwrap() = messages.to_vec();
        let reply = self.reply.clone();
        Box::pin(async move { reply })
    }
}

/// Helper: spawn a test server on port 0 (random available port).
async fn spawn_test_server(
    completer: Arc<StubCompleter>,
    store: Option<Arc<MemoryStore>>,
) -> String {
    let mut service = SlotService::new(completer).with_max_tokens(100);
    if let Some(store) = store {
        service = service.with_store(store);
    }

    let config = WebConfig {
        bind_addr: ([127, 0, 0, 1], 0).into(),
        access_key: Some(KEY.to_string()),
    };
    let addr = spawn_web(Arc::new(service), config).await.unwrap();
    format!("http://{addr}")
}

async fn get(url: &str, query: &[(&str, &str)]) -> reqwest::Response {
    let url = reqwest::Url::parse_with_params(url, query).unwrap();
    reqwest::get(url).await.unwrap()
}

fn full_query(key: &str) -> Vec<(&str, &str)> {
    vec![
        ("key", key),
        ("userId", "u1"),
        ("timestamp", "1000"),
        ("games", "3"),
        ("wins", "1"),
        ("losses", "0"),
        ("reels", "🍒🍒🍒"),
        ("payout", "40"),
        ("bankroll", "140"),
    ]
}

fn partial_query(speech: &str) -> Vec<(&str, &str)> {
    vec![
        ("key", KEY),
        ("userId", "u1"),
        ("timestamp", "1000"),
        ("games", "5"),
        ("wins", "2"),
        ("losses", "0"),
        ("status", "win"),
        ("speech", speech),
    ]
}

// ── Auth ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn wrong_key_is_rejected_before_anything_runs() {
    let stub = StubCompleter::new(Ok("unused"));
    let base = spawn_test_server(stub.clone(), None).await;

    let resp = get(&format!("{base}/api/generateresponse"), &full_query("nope")).await;
    assert_eq!(resp.status(), 401);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json, serde_json::json!({"error": "Unauthorized"}));

    // Missing key, otherwise garbage parameters: still 401, not 400.
    let resp = get(&format!("{base}/api/slotsresponse"), &[("games", "x")]).await;
    assert_eq!(resp.status(), 401);

    assert_eq!(stub.calls(), 0);
}

// ── Validation ───────────────────────────────────────────────────────

#[tokio::test]
async fn missing_payout_fails_without_completion_call() {
    let stub = StubCompleter::new(Ok("unused"));
    let base = spawn_test_server(stub.clone(), None).await;

    let query: Vec<_> = full_query(KEY)
        .into_iter()
        .filter(|(k, _)| *k != "payout")
        .collect();
    let resp = get(&format!("{base}/api/generateresponse"), &query).await;
    assert_eq!(resp.status(), 400);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "Invalid parameters");
    assert!(json["elapsedMs"].is_u64());
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn non_numeric_counter_is_rejected() {
    let stub = StubCompleter::new(Ok("unused"));
    let base = spawn_test_server(stub.clone(), None).await;

    let mut query = partial_query("Here we go.");
    query.retain(|(k, _)| *k != "games");
    query.push(("games", "five"));
    let resp = get(&format!("{base}/api/slotsresponse"), &query).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(stub.calls(), 0);
}

// ── Success ──────────────────────────────────────────────────────────

#[tokio::test]
async fn full_mode_prefixes_reels_and_pause() {
    let stub = StubCompleter::new(Ok("<speak>Nice!</speak>"));
    let base = spawn_test_server(stub.clone(), None).await;

    let resp = get(&format!("{base}/api/generateresponse"), &full_query(KEY)).await;
    assert_eq!(resp.status(), 200);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["response"], "🍒🍒🍒<pause:200ms>Nice!");
    assert!(json["elapsedMs"].is_u64());
    assert!(json.get("details").is_none());
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn partial_mode_passes_reply_through_with_details() {
    let stub = StubCompleter::new(Ok("Another win! Keep going?"));
    let base = spawn_test_server(stub.clone(), None).await;

    let mut query = partial_query("Spinning now.");
    query.push(("getDetails", "1"));
    let resp = get(&format!("{base}/api/slotsresponse"), &query).await;
    assert_eq!(resp.status(), 200);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["response"], "Another win! Keep going?");
    assert_eq!(json["details"]["maxTokens"], 100);

    let messages = json["details"]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[3]["content"], "The player is on a winning streak of 3 games.");
    assert_eq!(messages[4]["role"], "assistant");
    assert_eq!(messages[4]["content"], "Spinning now.");

    // The details echo exactly what the completer saw.
    let sent = stub.last_messages.lock().unwrap().clone();
    assert_eq!(sent.len(), messages.len());
    assert_eq!(sent[4].role, MessageRole::Assistant);
}

#[tokio::test]
async fn trailing_question_in_prior_speech_is_not_replayed() {
    let stub = StubCompleter::new(Ok("ok"));
    let base = spawn_test_server(stub.clone(), None).await;

    let resp = get(
        &format!("{base}/api/slotsresponse"),
        &partial_query("<speak>Feeling lucky?</speak>"),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let sent = stub.last_messages.lock().unwrap().clone();
    assert_eq!(sent.len(), 4);
    assert!(sent.iter().all(|m| m.role == MessageRole::System));
}

#[tokio::test]
async fn malformed_timestamp_falls_back_to_now_and_is_logged() {
    let stub = StubCompleter::new(Ok("ok"));
    let store = Arc::new(MemoryStore::new());
    let base = spawn_test_server(stub.clone(), Some(store.clone())).await;

    let mut query = partial_query("Go.");
    query.retain(|(k, _)| *k != "timestamp");
    query.push(("timestamp", "abc"));
    let resp = get(&format!("{base}/api/slotsresponse"), &query).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(stub.calls(), 1);

    let keys = store.list().await.unwrap();
    let body = store.get(&keys[0]).await.unwrap();
    let record: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(record["timestamp"].as_i64().is_some_and(|ts| ts > 0));
}

#[tokio::test]
async fn empty_get_details_omits_details() {
    let stub = StubCompleter::new(Ok("ok"));
    let base = spawn_test_server(stub, None).await;

    let mut query = partial_query("Go.");
    query.push(("getDetails", ""));
    let resp = get(&format!("{base}/api/slotsresponse"), &query).await;
    let json: serde_json::Value = resp.json().await.unwrap();
    assert!(json.get("details").is_none());
}

// ── Failures and logging ─────────────────────────────────────────────

#[tokio::test]
async fn upstream_failure_returns_500_without_detail() {
    let stub = StubCompleter::new(Err("HTTP 503: deployment overloaded"));
    let base = spawn_test_server(stub.clone(), None).await;

    let resp = get(&format!("{base}/api/generateresponse"), &full_query(KEY)).await;
    assert_eq!(resp.status(), 500);

    let body = resp.text().await.unwrap();
    assert!(!body.contains("overloaded"));
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"], "Internal server error");
    assert!(json["elapsedMs"].is_u64());
}

#[tokio::test]
async fn successful_exchange_is_logged() {
    let stub = StubCompleter::new(Ok("<speak>Jackpot!</speak>"));
    let store = Arc::new(MemoryStore::new());
    let base = spawn_test_server(stub, Some(store.clone())).await;

    let resp = get(&format!("{base}/api/generateresponse"), &full_query(KEY)).await;
    assert_eq!(resp.status(), 200);

    let keys = store.list().await.unwrap();
    assert_eq!(keys.len(), 1);
    assert!(keys[0].contains("/u1/win"));

    let body = store.get(&keys[0]).await.unwrap();
    let record: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(record["response"], "🍒🍒🍒<pause:200ms>Jackpot!");
    assert_eq!(record["payout"], 40);
}
