//! Integration tests for the parse service

use arhiv_extractor::{Extractor, ExtractorConfig, FileTextReader};
use arhiv_llm::{LlmError, MockProvider};
use arhiv_server::{
    config::Framing,
    handlers::{create_router, AppState, ErrorResponse, PARSE_FAILED_MESSAGE},
};
use arhiv_stream::{Envelope, ErrorStage, SseDecoder};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tower::ServiceExt; // for oneshot

const DOCUMENT_TEXT: &str = "HR-DAVŽ-69 Obitelj Drašković, fond, 1850-1945. \
    Serija 1: Korespondencija, 19 knjiga, kut. br. 2.";

const RESPONSE: &str = r#"{"records":[{"identifikator":"HR-DAVŽ-69","naslov":"Obitelj Drašković"},{"identifikator":"HR-DAVŽ-69/1","naslov":"Korespondencija"}]}"#;

fn app(llm: MockProvider, framing: Framing) -> axum::Router {
    let extractor = Extractor::new(llm, FileTextReader, ExtractorConfig::default()).unwrap();
    create_router(AppState::new(extractor).with_framing(framing))
}

fn parse_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/parse-document")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn text_upload(text: &str) -> serde_json::Value {
    serde_json::json!({
        "file": {
            "data": format!("data:text/plain;base64,{}", STANDARD.encode(text)),
            "mediaType": "text/plain",
            "filename": "popis.txt"
        }
    })
}

async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn read_envelopes(response: Response) -> Vec<Envelope> {
    let body = read_body(response).await;
    let mut decoder = SseDecoder::new();
    decoder
        .push(&body)
        .unwrap()
        .iter()
        .map(|payload| Envelope::parse(payload).unwrap())
        .collect()
}

async fn read_error(response: Response) -> ErrorResponse {
    serde_json::from_slice(&read_body(response).await).unwrap()
}

#[tokio::test]
async fn test_stream_of_snapshots_then_records() {
    let llm = MockProvider::from_text(RESPONSE, 30);
    let chunk_count = llm.chunks().len();

    let response = app(llm.clone(), Framing::Snapshot)
        .oneshot(parse_request(text_upload(DOCUMENT_TEXT)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

    let envelopes = read_envelopes(response).await;
    assert_eq!(envelopes.len(), chunk_count + 1);

    // Snapshots grow until they hold the whole response
    let mut previous = 0;
    for envelope in &envelopes[..chunk_count] {
        match envelope {
            Envelope::Content { content, done } => {
                assert!(!done);
                assert!(content.len() > previous);
                assert!(RESPONSE.starts_with(content.as_str()));
                previous = content.len();
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }
    assert_eq!(previous, RESPONSE.len());

    match envelopes.last().unwrap() {
        Envelope::Complete { records, done } => {
            assert!(done);
            assert_eq!(records.len(), 2);
            assert_eq!(records[1]["naslov"], "Korespondencija");
        }
        other => panic!("unexpected final frame: {:?}", other),
    }
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_delta_framing() {
    let llm = MockProvider::from_text(RESPONSE, 50);

    let response = app(llm.clone(), Framing::Delta)
        .oneshot(parse_request(text_upload(DOCUMENT_TEXT)))
        .await
        .unwrap();
    let envelopes = read_envelopes(response).await;

    let joined: String = envelopes
        .iter()
        .filter_map(|envelope| match envelope {
            Envelope::Delta { delta, .. } => Some(delta.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(joined, RESPONSE);
    assert!(matches!(envelopes.last(), Some(Envelope::Complete { .. })));
}

#[tokio::test]
async fn test_unparseable_response_ends_with_parse_error() {
    let llm = MockProvider::from_text(&RESPONSE[..RESPONSE.len() - 5], 40);

    let response = app(llm, Framing::Snapshot)
        .oneshot(parse_request(text_upload(DOCUMENT_TEXT)))
        .await
        .unwrap();
    let envelopes = read_envelopes(response).await;

    assert_eq!(
        envelopes.last(),
        Some(&Envelope::Error {
            error: PARSE_FAILED_MESSAGE.to_string(),
            done: true,
            stage: Some(ErrorStage::Parse),
        })
    );
}

#[tokio::test]
async fn test_midstream_failure_ends_with_transport_error() {
    let llm = MockProvider::from_text(RESPONSE, 20)
        .with_failure_after(2, LlmError::Communication("connection reset".to_string()));

    let response = app(llm, Framing::Snapshot)
        .oneshot(parse_request(text_upload(DOCUMENT_TEXT)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let envelopes = read_envelopes(response).await;
    assert_eq!(envelopes.len(), 3);
    match envelopes.last().unwrap() {
        Envelope::Error { error, stage, .. } => {
            assert!(error.contains("connection reset"));
            assert_ne!(*stage, Some(ErrorStage::Parse));
        }
        other => panic!("unexpected final frame: {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_file_is_rejected() {
    let llm = MockProvider::default();

    let response = app(llm.clone(), Framing::Snapshot)
        .oneshot(parse_request(serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_error(response).await.error, "No file provided");
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_short_document_is_rejected() {
    let llm = MockProvider::default();

    let response = app(llm.clone(), Framing::Snapshot)
        .oneshot(parse_request(text_upload("  kratko  ")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = read_error(response).await;
    assert_eq!(error.error, "Document appears empty or too short.");
    assert!(error.details.is_none());
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_unsupported_document_is_rejected() {
    let body = serde_json::json!({
        "file": {
            "data": STANDARD.encode([0x89, b'P', b'N', b'G']),
            "mediaType": "image/png",
            "filename": "scan.png"
        }
    });

    let response = app(MockProvider::default(), Framing::Snapshot)
        .oneshot(parse_request(body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_error(response).await.error, "Unsupported file type: image/png");
}

#[tokio::test]
async fn test_model_request_failure_is_server_error() {
    let llm = MockProvider::default().with_request_error(LlmError::RateLimitExceeded);

    let response = app(llm, Framing::Snapshot)
        .oneshot(parse_request(text_upload(DOCUMENT_TEXT)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = read_error(response).await;
    assert_eq!(error.error, "Failed to parse document");
    assert!(error.details.is_some());
}

#[tokio::test]
async fn test_malformed_json_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/parse-document")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app(MockProvider::default(), Framing::Snapshot)
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route() {
    let request = Request::builder()
        .uri("/api/unknown")
        .body(Body::empty())
        .unwrap();

    let response = app(MockProvider::default(), Framing::Snapshot)
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
