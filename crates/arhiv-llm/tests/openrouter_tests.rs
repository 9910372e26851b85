//! OpenRouter provider against a local stand-in server

use arhiv_llm::{ChatRequest, ChunkStream, LlmError, OpenRouterProvider, StreamingProvider};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted upstream behaviour
#[derive(Clone)]
struct Upstream {
    /// Status for each call; the last one repeats
    statuses: Arc<Vec<StatusCode>>,
    body: Arc<String>,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
}

impl Upstream {
    fn new(statuses: Vec<StatusCode>, body: impl Into<String>) -> Self {
        Self {
            statuses: Arc::new(statuses),
            body: Arc::new(body.into()),
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

async fn completions(
    State(upstream): State<Upstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let call = upstream.calls.fetch_add(1, Ordering::SeqCst);
    upstream.seen.lock().unwrap().push((headers, body));

    let status = upstream.statuses[call.min(upstream.statuses.len() - 1)];
    let body = if status.is_success() {
        upstream.body.to_string()
    } else {
        "upstream says no".to_string()
    };
    (status, [(header::CONTENT_TYPE, "text/event-stream")], body)
}

/// Serve `upstream` on an ephemeral port and return its base URL
async fn spawn_upstream(upstream: Upstream) -> String {
    let app = Router::new()
        .route("/api/v1/chat/completions", post(completions))
        .with_state(upstream);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/v1", addr)
}

fn provider(base_url: &str) -> OpenRouterProvider {
    OpenRouterProvider::new("test-key")
        .unwrap()
        .with_base_url(base_url)
        .with_retry_base(Duration::from_millis(10))
}

fn sse(fragments: &[&str]) -> String {
    let mut body = String::from(": OPENROUTER PROCESSING\n\n");
    body.push_str("data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n");
    for fragment in fragments {
        let chunk = serde_json::json!({"choices": [{"delta": {"content": fragment}}]});
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

async fn collect(mut rx: ChunkStream) -> Vec<Result<String, LlmError>> {
    let mut items = Vec::new();
    while let Some(item) = rx.recv().await {
        items.push(item);
    }
    items
}

#[tokio::test]
async fn test_streams_content_fragments() {
    let upstream = Upstream::new(vec![StatusCode::OK], sse(&["{\"records\":[", "{\"a\":\"1\"}", "]}"]));
    let base = spawn_upstream(upstream.clone()).await;

    let rx = provider(&base)
        .stream_chat(&ChatRequest::new("be precise", "document text"))
        .await
        .unwrap();
    let text: String = collect(rx).await.into_iter().map(Result::unwrap).collect();
    assert_eq!(text, "{\"records\":[{\"a\":\"1\"}]}");

    let seen = upstream.seen.lock().unwrap();
    let (headers, body) = &seen[0];
    assert_eq!(headers["authorization"], "Bearer test-key");
    assert_eq!(headers["x-title"], "Arhiv Parser");
    assert!(headers.contains_key("http-referer"));
    assert_eq!(body["stream"], true);
    assert_eq!(body["model"], "google/gemini-2.5-flash-lite");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "document text");
}

#[tokio::test]
async fn test_retries_server_errors() {
    let upstream = Upstream::new(
        vec![StatusCode::BAD_GATEWAY, StatusCode::OK],
        sse(&["ok"]),
    );
    let base = spawn_upstream(upstream.clone()).await;

    let rx = provider(&base).stream_chat(&ChatRequest::new("s", "u")).await.unwrap();
    assert_eq!(collect(rx).await, vec![Ok("ok".to_string())]);
    assert_eq!(upstream.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let upstream = Upstream::new(vec![StatusCode::SERVICE_UNAVAILABLE], "");
    let base = spawn_upstream(upstream.clone()).await;

    let result = provider(&base)
        .with_max_retries(2)
        .stream_chat(&ChatRequest::new("s", "u"))
        .await;
    assert!(matches!(result, Err(LlmError::Communication(_))));
    assert_eq!(upstream.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    for (status, check) in [
        (StatusCode::UNAUTHORIZED, "unauthorized"),
        (StatusCode::NOT_FOUND, "model"),
        (StatusCode::TOO_MANY_REQUESTS, "rate"),
    ] {
        let upstream = Upstream::new(vec![status], "");
        let base = spawn_upstream(upstream.clone()).await;

        let error = provider(&base)
            .stream_chat(&ChatRequest::new("s", "u"))
            .await
            .unwrap_err();
        let matched = match check {
            "unauthorized" => matches!(error, LlmError::Unauthorized(_)),
            "model" => matches!(error, LlmError::ModelNotAvailable(_)),
            _ => matches!(error, LlmError::RateLimitExceeded),
        };
        assert!(matched, "{} mapped to {:?}", status, error);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn test_midstream_error_ends_the_stream() {
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"{\\\"rec\"}}]}\n\n\
                data: {\"error\":{\"message\":\"provider overloaded\"}}\n\n";
    let upstream = Upstream::new(vec![StatusCode::OK], body);
    let base = spawn_upstream(upstream).await;

    let items = collect(provider(&base).stream_chat(&ChatRequest::new("s", "u")).await.unwrap()).await;
    assert_eq!(
        items,
        vec![
            Ok("{\"rec".to_string()),
            Err(LlmError::Communication("provider overloaded".to_string())),
        ]
    );
}

#[tokio::test]
async fn test_body_without_done_marker_still_closes() {
    let upstream = Upstream::new(
        vec![StatusCode::OK],
        "data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}",
    );
    let base = spawn_upstream(upstream).await;

    let items = collect(provider(&base).stream_chat(&ChatRequest::new("s", "u")).await.unwrap()).await;
    assert_eq!(items, vec![Ok("tail".to_string())]);
}
