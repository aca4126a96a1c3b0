//! Conversation turns over HTTP.
//!
//! `POST /conversation` streams a turn as server-sent events by default:
//!
//! | Event | Payload |
//! |---|---|
//! | `session` | `{session_id, thread_id, user_id}` |
//! | `message` | `{chunk}` |
//! | `done` | `{full_response, session_id, thread_id}` |
//! | `error` | `{error}` |
//!
//! Idle periods are filled with `: keepalive` comment lines. With
//! `"stream": false` the same turn runs to completion and the response is
//! returned as a single JSON document.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderName, header},
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::post,
};
use futures::{Stream, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::api::types::{ConversationRequest, ConversationResponse};
use crate::coordinator::{CollectingSink, SinkItem, StreamEvent, Turn, TurnOutcome};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/conversation", post(conversation))
}

/// Start or continue a conversation turn.
async fn conversation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConversationRequest>,
) -> AppResult<Response> {
    if req.user_id.trim().is_empty() {
        return Err(AppError::Validation("user_id must not be empty".to_string()));
    }
    if req.message.trim().is_empty() {
        return Err(AppError::Validation("message must not be empty".to_string()));
    }

    let (session, created) = state
        .sessions
        .resolve_for_turn(req.session_id.as_deref(), &req.user_id, req.session_name.clone())
        .await?;
    debug!(
        session_id = %session.session_id,
        thread_id = %session.thread_id,
        created,
        stream = req.stream,
        "Turn accepted"
    );

    let turn = Turn::new(session.thread_id.clone(), req.message.clone())
        .with_session(session.session_id.clone(), session.user_id.clone());

    if req.stream {
        Ok(stream_turn(state, turn).into_response())
    } else {
        Ok(collect_turn(state, turn).await?.into_response())
    }
}

/// Run the turn in its own task and stream its events to the client.
///
/// Dropping the response body closes the channel, which the coordinator
/// reports as a disconnect.
fn stream_turn(state: Arc<AppState>, turn: Turn) -> impl IntoResponse {
    let capacity = state.coordinator.config().queue_capacity.max(1);
    let (tx, rx) = mpsc::channel::<SinkItem>(capacity);
    let wire = WireContext::from_turn(&turn);

    tokio::spawn(async move {
        state.coordinator.run(turn, &tx).await;
    });

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        Sse::new(encode_stream(ReceiverStream::new(rx), wire)),
    )
}

/// Run the turn to completion and answer with the full text.
async fn collect_turn(state: Arc<AppState>, turn: Turn) -> AppResult<Json<ConversationResponse>> {
    let session = turn
        .session
        .clone()
        .ok_or_else(|| AppError::Internal("turn without session".to_string()))?;
    let thread_id = turn.thread_id.clone();
    let message = turn.message.clone();

    // Spawned so a client hanging up does not abandon the turn half way.
    let outcome = tokio::spawn(async move {
        let sink = CollectingSink::new();
        state.coordinator.run(turn, &sink).await
    })
    .await
    .map_err(|e| AppError::Internal(format!("turn task failed: {e}")))?;

    match outcome {
        TurnOutcome::Completed { full_text } => {
            info!(session_id = %session.session_id, "Non-streaming turn completed");
            Ok(Json(ConversationResponse {
                session_id: session.session_id,
                thread_id,
                user_id: session.user_id,
                message,
                response: full_text,
            }))
        }
        TurnOutcome::Failed { message } => Err(AppError::Provider(message)),
        TurnOutcome::Disconnected => Err(AppError::Internal("turn was cancelled".to_string())),
    }
}

/// Ids echoed in the `done` payload.
#[derive(Debug, Clone)]
struct WireContext {
    session_id: String,
    thread_id: String,
}

impl WireContext {
    fn from_turn(turn: &Turn) -> Self {
        Self {
            session_id: turn
                .session
                .as_ref()
                .map(|s| s.session_id.clone())
                .unwrap_or_default(),
            thread_id: turn.thread_id.clone(),
        }
    }
}

fn encode_stream(
    items: impl Stream<Item = SinkItem> + Send + 'static,
    wire: WireContext,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    items.map(move |item| Ok(encode(&wire, item)))
}

/// Wire encoding of one sink item.
fn encode(wire: &WireContext, item: SinkItem) -> Event {
    let event = match item {
        SinkItem::Keepalive => return Event::default().comment("keepalive"),
        SinkItem::Event(event) => event,
    };

    let (name, payload) = match event {
        StreamEvent::Session {
            session_id,
            thread_id,
            user_id,
        } => (
            "session",
            json!({"session_id": session_id, "thread_id": thread_id, "user_id": user_id}),
        ),
        StreamEvent::Fragment { text } => ("message", json!({"chunk": text})),
        StreamEvent::Done { full_text } => (
            "done",
            json!({
                "full_response": full_text,
                "session_id": wire.session_id,
                "thread_id": wire.thread_id,
            }),
        ),
        StreamEvent::Error { message } => ("error", json!({"error": message})),
    };
    Event::default().event(name).data(payload.to_string())
}
