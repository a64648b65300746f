//! In-process router tests: endpoint shapes, validation, and SSE lines.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use medlit_model::{ChatModel, ChatRequest, EmbeddingProvider};
use medlit_rag::{Article, ArticleStore, PipelineConfig, QueryPipeline, SimilarityIndex};
use medlit_server::server::{AppState, app_router};
use serde_json::Value;
use tower::ServiceExt;

// ── mocks and fixtures ─────────────────────────────────────────────

struct KeywordEmbedder;

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> medlit_model::Result<Vec<f32>> {
        if text.to_lowercase().contains("diabetes") {
            Ok(vec![1.0, 0.0])
        } else {
            Ok(vec![0.0, 1.0])
        }
    }

    fn dimensions(&self) -> usize {
        2
    }
}

struct ScriptedChat;

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, request: ChatRequest) -> medlit_model::Result<String> {
        if request.user.contains("translation expert") {
            return Ok(
                r#"{"source_language": "Simplified Chinese", "translated_text": "diabetes treatment"}"#
                    .to_string(),
            );
        }
        if request.user.contains("query analyst") {
            return Ok(r#"["insulin therapy"]"#.to_string());
        }
        Ok("Metformin is first-line (Smith et al., 2023; PMID: 1001).".to_string())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn article(pmid: &str) -> Article {
    Article {
        pmid: pmid.into(),
        title: format!("Study {pmid}"),
        abstract_text: "Abstract text.".into(),
        authors: vec!["Smith J".into()],
        journal: "J Clin Test".into(),
        pub_date: "2023-05-01".into(),
        doi: None,
    }
}

fn test_router() -> Router {
    let pmids: Vec<String> = vec!["1001".into(), "1002".into(), "1003".into()];
    let vectors = vec![vec![1.0, 0.0], vec![0.9, 0.1], vec![0.0, 1.0]];
    let index = Arc::new(SimilarityIndex::new(pmids.clone(), vectors).unwrap());
    let store = Arc::new(ArticleStore::new(pmids.iter().map(|p| article(p)).collect()));

    let pipeline = QueryPipeline::builder()
        .config(PipelineConfig::default())
        .chat_model(Arc::new(ScriptedChat))
        .embedding_provider(Arc::new(KeywordEmbedder))
        .index(index)
        .store(store)
        .build()
        .unwrap();

    app_router(AppState {
        pipeline: Arc::new(pipeline),
        embedding_model: "all-MiniLM-L6-v2".into(),
    })
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// ── plain endpoints ────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_healthy() {
    let response = test_router()
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn stats_reflects_the_loaded_corpus() {
    let response = test_router()
        .oneshot(Request::builder().uri("/api/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total_articles"], 3);
    assert_eq!(body["index_size"], 3);
    assert_eq!(body["model_name"], "all-MiniLM-L6-v2");
    assert_eq!(body["rag_support"], true);
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let response = test_router()
        .oneshot(post_json("/api/search", r#"{"query": "diabetes treatment", "top_k": 2}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total_results"], 2);
    assert_eq!(body["original_query"], "diabetes treatment");
    assert_eq!(body["translated_query"], "diabetes treatment");
    assert_eq!(body["results"][0]["pmid"], "1001");
    assert_eq!(body["results"][0]["rank"], 1);
    assert!(body["results"][0]["abstract"].is_string());
}

#[tokio::test]
async fn empty_query_is_a_400_with_error_body() {
    let response = test_router()
        .oneshot(post_json("/api/search", r#"{"query": ""}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Query is required");
}

#[tokio::test]
async fn out_of_bounds_top_k_is_a_400() {
    let response = test_router()
        .oneshot(post_json("/api/search", r#"{"query": "diabetes", "top_k": 999}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rag_qa_returns_answer_and_used_articles() {
    let response = test_router()
        .oneshot(post_json("/api/rag_qa", r#"{"question": "What treats diabetes?"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["answer"].as_str().unwrap().contains("PMID: 1001"));
    assert_eq!(
        body["articles_used"].as_u64().unwrap(),
        body["relevant_articles"].as_array().unwrap().len() as u64
    );
}

#[tokio::test]
async fn translate_passes_english_through() {
    let response = test_router()
        .oneshot(post_json("/api/translate", r#"{"query": "diabetes"}"#))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["original"], "diabetes");
    assert_eq!(body["translated"], "diabetes");
    assert_eq!(body["is_pure_english"], true);
}

#[tokio::test]
async fn translate_converts_mixed_language_queries() {
    let response = test_router()
        .oneshot(post_json("/api/translate", r#"{"query": "糖尿病"}"#))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["translated"], "diabetes treatment");
    assert_eq!(body["is_pure_english"], false);
}

// ── streaming endpoints ────────────────────────────────────────────

fn data_payloads(body: &str) -> Vec<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|json| serde_json::from_str(json).unwrap())
        .collect()
}

#[tokio::test]
async fn streaming_search_emits_progress_then_complete() {
    let response = test_router()
        .oneshot(post_json(
            "/api/search_with_progress",
            r#"{"query": "diabetes treatment", "top_k": 3}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    let events = data_payloads(&body);

    assert!(events.len() >= 2);
    assert_eq!(events[0]["step"], "Detecting non-English characters in query...");
    assert_eq!(events[0]["progress"], 10);

    // Progress never decreases across the stream.
    let mut last = 0i64;
    for event in &events {
        if let Some(progress) = event["progress"].as_i64() {
            assert!(progress >= last);
            last = progress;
        }
    }

    let terminal = events.last().unwrap();
    assert_eq!(terminal["complete"], true);
    assert_eq!(terminal["total_results"], 3);
}

#[tokio::test]
async fn streaming_search_with_translation_carries_details() {
    let response = test_router()
        .oneshot(post_json(
            "/api/search_with_progress",
            r#"{"query": "糖尿病 diabetes", "top_k": 3}"#,
        ))
        .await
        .unwrap();
    let body = body_string(response).await;
    let events = data_payloads(&body);

    assert!(events.iter().any(|e| e
        .get("translation_info")
        .and_then(Value::as_str)
        .is_some_and(|v| v.starts_with("Original: "))));
    assert!(events.iter().any(|e| e
        .get("translation_result")
        .and_then(Value::as_str)
        .is_some_and(|v| v == "Translated: diabetes treatment")));

    let terminal = events.last().unwrap();
    assert_eq!(terminal["translated_query"], "diabetes treatment");
}

#[tokio::test]
async fn streaming_rag_ends_with_answer_payload() {
    let response = test_router()
        .oneshot(post_json(
            "/api/rag_qa_with_progress",
            r#"{"question": "What treats diabetes?", "top_k": 3}"#,
        ))
        .await
        .unwrap();
    let body = body_string(response).await;
    let events = data_payloads(&body);

    assert!(events.iter().any(|e| e["step"] == "Generating AI answer..."));
    let terminal = events.last().unwrap();
    assert_eq!(terminal["complete"], true);
    assert!(terminal["answer"].as_str().unwrap().contains("Metformin"));
}

#[tokio::test]
async fn invalid_streaming_request_is_rejected_without_events() {
    let response = test_router()
        .oneshot(post_json("/api/search_with_progress", r#"{"query": "   "}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_string(response).await;
    assert!(!body.contains("data: "));
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["error"], "Query is required");
}
