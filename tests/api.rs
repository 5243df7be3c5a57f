use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use tower_http::cors::CorsLayer;

use mimo_notes::error::{AppError, Result};
use mimo_notes::repositories::InMemoryMemoRepository;
use mimo_notes::server::{AppState, create_router};
use mimo_notes::services::{GenerationOptions, MemoService, SummaryService, TextGenerator};

struct StubGenerator {
    reply: Option<String>,
    calls: Mutex<usize>,
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, _prompt: &str, _options: GenerationOptions) -> Result<Option<String>> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.reply.clone())
    }
}

struct MissingKeyGenerator;

#[async_trait]
impl TextGenerator for MissingKeyGenerator {
    async fn generate(&self, _prompt: &str, _options: GenerationOptions) -> Result<Option<String>> {
        Err(AppError::Configuration("GEMINI_API_KEY is not set".into()))
    }
}

fn app_with(generator: Arc<dyn TextGenerator>) -> Router {
    let memo_service = Arc::new(MemoService::new(Arc::new(InMemoryMemoRepository::new())));
    let summary_service = Arc::new(SummaryService::new(generator));
    create_router(AppState::new(memo_service, summary_service), CorsLayer::new())
}

fn app() -> Router {
    app_with(Arc::new(StubGenerator {
        reply: Some("  A summary.  ".into()),
        calls: Mutex::new(0),
    }))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn groceries() -> Value {
    json!({
        "title": "Groceries",
        "content": "milk, eggs",
        "category": "personal",
        "tags": ["home"]
    })
}

#[tokio::test]
async fn create_then_list_by_category() {
    let app = app();
    let (status, created) = send(&app, "POST", "/api/memos", Some(groceries())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["createdAt"], created["updatedAt"]);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, personal) = send(&app, "GET", "/api/memos?category=personal", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(personal["memos"].as_array().unwrap().iter().any(|m| m["id"] == id));

    let (_, work) = send(&app, "GET", "/api/memos?category=work", None).await;
    assert!(work["memos"].as_array().unwrap().is_empty());

    let (_, all) = send(&app, "GET", "/api/memos?category=all", None).await;
    assert_eq!(all["memos"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn server_search_covers_title_and_content_only() {
    let app = app();
    send(
        &app,
        "POST",
        "/api/memos",
        Some(json!({
            "title": "Release",
            "content": "cut the branch",
            "category": "work",
            "tags": ["urgent"]
        })),
    )
    .await;

    let (_, by_tag) = send(&app, "GET", "/api/memos?searchQuery=urgent", None).await;
    assert!(by_tag["memos"].as_array().unwrap().is_empty());

    let (_, by_content) = send(&app, "GET", "/api/memos?searchQuery=BRANCH", None).await;
    assert_eq!(by_content["memos"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_category_is_bad_request() {
    let (status, body) = send(&app(), "GET", "/api/memos?category=chores", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn update_get_and_delete() {
    let app = app();
    let (_, created) = send(&app, "POST", "/api/memos", Some(groceries())).await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &app,
        "PATCH",
        &format!("/api/memos/{}", id),
        Some(json!({
            "title": "Groceries",
            "content": "milk, eggs, bread",
            "category": "personal",
            "tags": ["home", "weekly"],
            "expectedUpdatedAt": created["updatedAt"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["createdAt"], created["createdAt"]);
    assert_ne!(updated["updatedAt"], created["updatedAt"]);

    // 古い updatedAt での更新は 409
    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/memos/{}", id),
        Some(json!({
            "title": "Stale",
            "content": "stale",
            "category": "personal",
            "expectedUpdatedAt": created["updatedAt"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    let (status, fetched) = send(&app, "GET", &format!("/api/memos/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["content"], "milk, eggs, bread");

    let (status, _) = send(&app, "DELETE", &format!("/api/memos/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", &format!("/api/memos/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains(&id));
}

#[tokio::test]
async fn empty_title_is_rejected() {
    let (status, body) = send(
        &app(),
        "POST",
        "/api/memos",
        Some(json!({"title": " ", "content": "body", "category": "idea"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_bodies_are_json_bad_requests() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/memos",
        Some(json!({"title": "a", "content": "b", "category": "chores"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("chores"));

    let (status, body) = send(&app, "POST", "/api/memos", Some(json!({"content": "b"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("title"));

    let (_, created) = send(&app, "POST", "/api/memos", Some(groceries())).await;
    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/memos/{}", created["id"].as_str().unwrap()),
        Some(json!({"title": "x", "content": "y", "category": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        "POST",
        "/api/summarize",
        Some(json!({"title": "T", "content": null})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn clear_all_empties_list() {
    let app = app();
    send(&app, "POST", "/api/memos", Some(groceries())).await;
    send(&app, "POST", "/api/memos", Some(groceries())).await;

    let (status, body) = send(&app, "DELETE", "/api/memos", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 2);

    let (_, list) = send(&app, "GET", "/api/memos", None).await;
    assert!(list["memos"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn summarize_returns_trimmed_summary() {
    let (status, body) = send(
        &app(),
        "POST",
        "/api/summarize",
        Some(json!({"title": "T", "content": "Some content"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], "A summary.");
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn summarize_empty_content_is_bad_request_without_upstream_call() {
    let generator = Arc::new(StubGenerator {
        reply: Some("unused".into()),
        calls: Mutex::new(0),
    });
    let app = app_with(generator.clone());

    let (status, body) = send(&app, "POST", "/api/summarize", Some(json!({"title": "T", "content": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, "POST", "/api/summarize", Some(json!({"title": "T"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(*generator.calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn summarize_failures_are_server_errors() {
    let app = app_with(Arc::new(MissingKeyGenerator));
    let (status, body) = send(&app, "POST", "/api/summarize", Some(json!({"title": "T", "content": "c"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("GEMINI_API_KEY"));

    let app = app_with(Arc::new(StubGenerator {
        reply: None,
        calls: Mutex::new(0),
    }));
    let (status, body) = send(&app, "POST", "/api/summarize", Some(json!({"title": "T", "content": "c"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn health_reports_version() {
    let (status, body) = send(&app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
