use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::page;
use super::session::{ChatSession, Turn};
use crate::config::ModelFamily;
use crate::engine::ChatBackend;
use crate::error::InferenceError;

/// Sessions untouched for this long are dropped when a new one is created.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

pub struct AppState {
    sessions: DashMap<Uuid, Mutex<ChatSession>>,
    backend: Arc<dyn ChatBackend>,
    heading: String,
    idle_timeout: Duration,
}

impl AppState {
    pub fn new(backend: Arc<dyn ChatBackend>, model_type: ModelFamily) -> Self {
        Self {
            sessions: DashMap::new(),
            backend,
            heading: format!("LLM: {model_type}"),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drop sessions whose browser has not been seen within the idle timeout.
    fn evict_idle(&self) {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.get_mut().idle_for() < self.idle_timeout);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            debug!(evicted, remaining = self.sessions.len(), "idle sessions evicted");
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    input: String,
}

#[derive(Debug, Serialize)]
struct SessionView {
    session: Uuid,
    turns: Vec<Turn>,
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("unknown session {0}")]
    UnknownSession(Uuid),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::UnknownSession(_) => StatusCode::NOT_FOUND,
            ApiError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/session", post(create_session))
        .route("/api/session/:id", get(get_session).delete(delete_session))
        .route("/api/session/:id/submit", post(submit))
        .route("/api/session/:id/clear", post(clear))
        .with_state(state)
}

async fn index(State(app): State<Arc<AppState>>) -> Html<String> {
    Html(page::render(&app.heading))
}

async fn create_session(State(app): State<Arc<AppState>>) -> Json<SessionView> {
    app.evict_idle();
    let id = Uuid::new_v4();
    app.sessions.insert(id, Mutex::new(ChatSession::new()));
    info!(session = %id, sessions = app.sessions.len(), "session created");
    Json(SessionView {
        session: id,
        turns: Vec::new(),
    })
}

fn view(app: &AppState, id: Uuid) -> Result<SessionView, ApiError> {
    let session = app.sessions.get(&id).ok_or(ApiError::UnknownSession(id))?;
    let mut session = session.lock();
    session.touch();
    Ok(SessionView {
        session: id,
        turns: session.turns().to_vec(),
    })
}

async fn get_session(
    State(app): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    view(&app, id).map(Json)
}

async fn delete_session(
    State(app): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app.sessions
        .remove(&id)
        .ok_or(ApiError::UnknownSession(id))?;
    info!(session = %id, sessions = app.sessions.len(), "session closed");
    Ok(StatusCode::NO_CONTENT)
}

async fn submit(
    State(app): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let pending = {
        let session = app.sessions.get(&id).ok_or(ApiError::UnknownSession(id))?;
        let pending = session.lock().begin_turn(&request.input);
        pending
    };
    info!(session = %id, history = pending.history.len(), "turn submitted");

    let result = app
        .backend
        .evaluate(String::new(), pending.input.clone(), pending.history.clone())
        .await;

    let session = app.sessions.get(&id).ok_or(ApiError::UnknownSession(id))?;
    let mut session = session.lock();
    match result {
        Ok(response) => {
            if !session.complete_turn(pending, response) {
                warn!(session = %id, "session cleared during generation, response dropped");
            }
            Ok(Json(SessionView {
                session: id,
                turns: session.turns().to_vec(),
            }))
        }
        Err(e) => {
            error!(session = %id, error = %e, "generation failed");
            session.abort_turn(&pending);
            Err(e.into())
        }
    }
}

async fn clear(
    State(app): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    {
        let session = app.sessions.get(&id).ok_or(ApiError::UnknownSession(id))?;
        session.lock().clear();
    }
    info!(session = %id, "history cleared");
    view(&app, id).map(Json)
}
