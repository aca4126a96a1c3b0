use std::sync::Arc;

use async_stream::stream;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use threadline_engine::{
    ConversationStateStore, EchoClient, EngineError, Generated, ModelConversationStore,
};
use threadline_storage::{MemorySessionStore, MemoryThreadStore, StoragePaths, StoragePool};
use tower::ServiceExt;

use crate::config::ServerConfig;
use crate::create_router;
use crate::state::AppState;
use crate::testing::ScriptedConversations;

struct TestApp {
    state: Arc<AppState>,
    _dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let conversations = ModelConversationStore::new(
            Arc::new(EchoClient::new()),
            Arc::new(MemoryThreadStore::new()),
        );
        Self::with_conversations(Arc::new(conversations)).await
    }

    async fn with_conversations(conversations: Arc<dyn ConversationStateStore>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let pool = StoragePool::open(StoragePaths::from_root(dir.path().to_path_buf()), 4)
            .await
            .unwrap();
        let state = AppState::from_parts(
            ServerConfig::default(),
            pool,
            Arc::new(MemorySessionStore::new()),
            conversations,
            "echo/echo",
        );
        Self {
            state: Arc::new(state),
            _dir: dir,
        }
    }

    fn router(&self) -> Router {
        create_router(Arc::clone(&self.state))
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = self.send(method, uri, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_session(&self, user_id: &str) -> Value {
        let (status, body) = self
            .json(
                Method::POST,
                "/conversation/session",
                Some(json!({"user_id": user_id})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body
    }
}

#[tokio::test]
async fn test_service_banner() {
    let app = TestApp::new().await;
    let (status, body) = app.json(Method::GET, "/", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "threadline-server");
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn test_health_reports_storage() {
    let app = TestApp::new().await;
    let (status, body) = app.json(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "connected");
    assert_eq!(body["model"], "echo/echo");

    app.state.pool.close();
    let (status, body) = app.json(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert!(body["storage"].as_str().unwrap().starts_with("error: "));
}

#[tokio::test]
async fn test_session_lifecycle() {
    let app = TestApp::new().await;
    let created = app.create_session("u1").await;
    let id = created["session_id"].as_str().unwrap().to_string();
    assert_eq!(created["thread_id"], created["session_id"]);
    assert!(created["name"].as_str().unwrap().starts_with("Conversation "));

    let (status, fetched) = app
        .json(Method::GET, &format!("/conversation/session/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["session_id"], id.as_str());

    let (status, renamed) = app
        .json(
            Method::PATCH,
            &format!("/conversation/session/{id}"),
            Some(json!({"name": "Trip plans"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Trip plans");

    let (status, listed) = app
        .json(Method::GET, "/conversation/sessions/user/u1", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["sessions"].as_array().unwrap().len(), 1);

    let (status, deleted) = app
        .json(Method::DELETE, &format!("/conversation/session/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({"message": "Session deleted", "session_id": id.clone()}));

    let (status, body) = app
        .json(Method::GET, &format!("/conversation/session/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, _) = app
        .json(Method::DELETE, &format!("/conversation/session/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validation_errors() {
    let app = TestApp::new().await;

    let (status, body) = app
        .json(
            Method::POST,
            "/conversation/session",
            Some(json!({"user_id": "  "})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, _) = app
        .json(
            Method::POST,
            "/conversation",
            Some(json!({"user_id": "u1", "message": "   "})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let session = app.create_session("u1").await;
    let id = session["session_id"].as_str().unwrap();
    let (status, _) = app
        .json(
            Method::PATCH,
            &format!("/conversation/session/{id}"),
            Some(json!({"name": ""})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_history_is_not_an_error() {
    let app = TestApp::new().await;
    let session = app.create_session("u1").await;
    let id = session["session_id"].as_str().unwrap();

    let (status, body) = app
        .json(Method::GET, &format!("/conversation/session/{id}/history"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"], json!([]));

    let (status, _) = app
        .json(Method::GET, "/conversation/session/missing/history", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_streaming_turn_persists_history() {
    let app = TestApp::new().await;
    let (status, body) = app
        .json(
            Method::POST,
            "/conversation",
            Some(json!({"user_id": "u1", "message": "hello there", "stream": false})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "hello there");
    assert_eq!(body["message"], "hello there");
    assert_eq!(body["user_id"], "u1");
    let id = body["session_id"].as_str().unwrap().to_string();

    let (_, history) = app
        .json(Method::GET, &format!("/conversation/session/{id}/history"), None)
        .await;
    assert_eq!(
        history["messages"],
        json!([
            {"role": "user", "content": "hello there"},
            {"role": "assistant", "content": "hello there"},
        ])
    );
}

#[tokio::test]
async fn test_turn_in_unknown_or_foreign_session() {
    let app = TestApp::new().await;
    let (status, _) = app
        .json(
            Method::POST,
            "/conversation",
            Some(json!({"session_id": "nope", "user_id": "u1", "message": "hi"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let session = app.create_session("u1").await;
    let (status, _) = app
        .json(
            Method::POST,
            "/conversation",
            Some(json!({"session_id": session["session_id"], "user_id": "u2", "message": "hi"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_streaming_turn_events() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/conversation")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"user_id": "u1", "message": "hi you"}).to_string(),
        ))
        .unwrap();

    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(response.headers()["x-accel-buffering"], "no");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();

    let session_at = body.find("event: session").unwrap();
    let first_chunk = body.find(r#"{"chunk":"hi "}"#).unwrap();
    let second_chunk = body.find(r#"{"chunk":"you"}"#).unwrap();
    let done_at = body.find("event: done").unwrap();
    assert!(session_at < first_chunk);
    assert!(first_chunk < second_chunk);
    assert!(second_chunk < done_at);
    assert!(body.contains(r#""full_response":"hi you""#));
    assert!(!body.contains("event: error"));

    let sessions = app.state.sessions.list("u1").await.unwrap();
    assert_eq!(sessions.len(), 1);
    let history = app.state.history.get_history(&sessions[0].thread_id).await;
    assert_eq!(history.len(), 2);
}

async fn stream_body(app: &TestApp, body: Value) -> String {
    let (status, bytes) = app.send(Method::POST, "/conversation", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    String::from_utf8(bytes).unwrap()
}

#[tokio::test]
async fn test_session_name_names_new_session() {
    let app = TestApp::new().await;
    let (status, body) = app
        .json(
            Method::POST,
            "/conversation",
            Some(json!({
                "user_id": "u1",
                "message": "hi",
                "session_name": "Trip plans",
                "stream": false,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let id = body["session_id"].as_str().unwrap();
    let (_, session) = app
        .json(Method::GET, &format!("/conversation/session/{id}"), None)
        .await;
    assert_eq!(session["name"], "Trip plans");
}

#[tokio::test]
async fn test_failed_turn_ends_with_error_event() {
    let conversations = ScriptedConversations::new(|| {
        Box::pin(stream! {
            yield Ok(Generated::Fragment("Hi".to_string()));
            yield Err(EngineError::Generation("rate limited".to_string()));
            yield Ok(Generated::Fragment("never".to_string()));
        })
    });
    let app = TestApp::with_conversations(Arc::new(conversations)).await;

    let body = stream_body(&app, json!({"user_id": "u1", "message": "Hello"})).await;

    let session_at = body.find("event: session\n").unwrap();
    let message_at = body.find("event: message\ndata: {\"chunk\":\"Hi\"}\n\n").unwrap();
    let error_event = "event: error\ndata: {\"error\":\"rate limited\"}\n\n";
    let error_at = body.find(error_event).unwrap();
    assert!(session_at < message_at);
    assert!(message_at < error_at);
    assert!(body.ends_with(error_event), "bytes after the error event: {body:?}");
    assert!(!body.contains("never"));
    assert!(!body.contains("event: done"));
}

#[tokio::test(start_paused = true)]
async fn test_idle_stream_carries_keepalive_comment() {
    let conversations = ScriptedConversations::new(|| {
        Box::pin(stream! {
            tokio::time::sleep(std::time::Duration::from_secs(20)).await;
            yield Ok(Generated::Fragment("late".to_string()));
        })
    });
    let app = TestApp::with_conversations(Arc::new(conversations)).await;

    let body = stream_body(&app, json!({"user_id": "u1", "message": "Hello"})).await;

    let keepalive_at = body.find(": keepalive\n\n").unwrap();
    let message_at = body.find("event: message\n").unwrap();
    let done_at = body.find("event: done\n").unwrap();
    assert!(body.find("event: session\n").unwrap() < keepalive_at);
    assert!(keepalive_at < message_at);
    assert!(message_at < done_at);
    assert_eq!(body.matches(": keepalive").count(), 1);
}
