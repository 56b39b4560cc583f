//! Integration tests for the sillok HTTP/SSE surface (§6.1, §8 scenarios).

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use sillok_core::index::bm25::{Bm25Params, Bm25Store};
use sillok_core::index::dense::{DenseIndex, EmbedCache};
use sillok_core::providers::stub::{ScriptedLlm, StubEmbedder};
use sillok_core::store::{Doc, Store};
use sillok_server::{chat, health_check, AppState};

fn fixture_store() -> Store {
    let metas = vec![
        Doc {
            title: "태조실록".into(),
            link: "https://sillok.example/taejo".into(),
            text: "태조 즉위년 기록 본문".into(),
            ..Default::default()
        },
        Doc {
            title: "세종실록".into(),
            link: "https://sillok.example/sejong".into(),
            text: "세종 즉위년 기록 본문".into(),
            ..Default::default()
        },
    ];
    let bodies: Vec<String> = metas.iter().map(|d| d.text.clone()).collect();
    let titles: Vec<String> = metas.iter().map(|d| d.title.clone()).collect();
    let bm25 = Bm25Store::build(&bodies, Bm25Params::default());
    let bm25_title = Bm25Store::build(&titles, Bm25Params::default());

    Store {
        metas,
        index_full: DenseIndex::new(vec![vec![1.0, 0.0], vec![0.0, 1.0]]),
        index_summary: None,
        index_title: Some(DenseIndex::new(vec![vec![1.0, 0.0], vec![0.0, 1.0]])),
        bm25: Some(bm25),
        bm25_title: Some(bm25_title),
    }
}

fn test_app(llm_responses: Vec<String>) -> Router {
    let state = Arc::new(AppState {
        store: fixture_store(),
        cache: EmbedCache::new(),
        embedder: Box::new(StubEmbedder::new(2)),
        llm: Box::new(ScriptedLlm::new(llm_responses)),
        top_k_retrieve: 10,
        pre_rerank_top_k: 10,
        rerank_enabled: false,
    });

    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/health", get(health_check))
        .with_state(state)
}

async fn sse_events(app: Router, body: Value) -> Vec<Value> {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let text = String::from_utf8(bytes.to_vec()).expect("utf8 body");

    text.split("\n\n")
        .filter_map(|frame| frame.strip_prefix("data: "))
        .filter(|payload| !payload.is_empty())
        .map(|payload| serde_json::from_str(payload).expect("valid event json"))
        .collect()
}

#[tokio::test]
async fn health_check_reports_ok() {
    let app = test_app(vec![]);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json: Value = serde_json::from_slice(&bytes).expect("valid json");
    assert_eq!(json["status"], "ok");
    assert!(json["timestamp"].as_u64().is_some());
}

#[tokio::test]
async fn relax_context_answer_stops_after_one_round() {
    let app = test_app(vec![
        "{\"action\":\"answer\",\"answer\":\"세종은 조선의 4대 왕입니다[1]\"}".to_string(),
    ]);
    let events = sse_events(
        app,
        serde_json::json!({"query": "세종은 누구인가", "relax_context": true}),
    )
    .await;

    let docs_events = events.iter().filter(|e| e["type"] == "docs").count();
    assert_eq!(docs_events, 1, "relax_context must stop after the first round");

    let done = events.last().expect("at least one event");
    assert_eq!(done["type"], "done");
    assert!(done["full_answer"]
        .as_str()
        .unwrap()
        .contains("세종은 조선의 4대 왕입니다"));
}

#[tokio::test]
async fn meta_only_query_surfaces_title_match_at_index_one() {
    let app = test_app(vec![
        "{\"action\":\"answer\",\"answer\":\"태조실록에 따르면...[1]\"}".to_string(),
    ]);
    let events = sse_events(
        app,
        serde_json::json!({
            "query": "~실록 title:태조",
            "relax_context": true,
        }),
    )
    .await;

    let docs_event = events
        .iter()
        .find(|e| e["type"] == "docs")
        .expect("a docs event");
    let documents = docs_event["documents"].as_array().expect("documents array");
    assert!(!documents.is_empty());
    assert_eq!(documents[0]["index"], 1);
    assert_eq!(documents[0]["title"], "태조실록");
}

#[tokio::test]
async fn unknown_topic_falls_back_to_not_found_message() {
    let not_found = sillok_core::constants::NOT_FOUND_MSG;
    let app = test_app(vec![format!(
        "{{\"action\":\"answer\",\"answer\":\"{not_found}\"}}"
    )]);
    let events = sse_events(
        app,
        serde_json::json!({"query": "화성에서의 삶", "relax_context": true}),
    )
    .await;

    let done = events.last().expect("at least one event");
    assert_eq!(done["full_answer"], not_found);
}
