//! HTTP request handlers

use super::render::{render_transcript, TRY_AGAIN};
use super::types::{
    ChatRequest, ChatResponse, CreateSessionResponse, ErrorResponse, SessionResponse,
    SuccessResponse, TranscriptQuery,
};
use super::AppState;
use crate::runtime::SessionError;
use crate::state_machine::TransitionError;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Browser flow: every visit to the root starts a fresh session
        .route("/", get(new_session_page))
        .route("/s/:id", get(transcript_page).post(submit_form))
        // JSON API
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(end_session))
        .route("/api/sessions/:id/chat", post(send_chat))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Transcript Page
// ============================================================

async fn new_session_page(State(state): State<AppState>) -> Redirect {
    let id = state.sessions.create().await;
    Redirect::to(&format!("/s/{id}"))
}

async fn transcript_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<TranscriptQuery>,
) -> Response {
    match state.sessions.snapshot(&id).await {
        Ok(snapshot) => {
            let error = query.error.then_some(TRY_AGAIN);
            Html(render_transcript(&id, &snapshot, error)).into_response()
        }
        // Stale links land on a fresh session
        Err(SessionError::NotFound(_)) => Redirect::to("/").into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}

async fn submit_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(req): Form<ChatRequest>,
) -> Redirect {
    let text = req.text.trim();
    if text.is_empty() {
        return Redirect::to(&format!("/s/{id}"));
    }

    match state.sessions.send_message(&id, text).await {
        Ok(_) => Redirect::to(&format!("/s/{id}")),
        Err(SessionError::NotFound(_)) => Redirect::to("/"),
        Err(e) => {
            tracing::warn!(session_id = %id, error = %e, "Turn failed");
            Redirect::to(&format!("/s/{id}?error=true"))
        }
    }
}

// ============================================================
// Session API
// ============================================================

async fn create_session(State(state): State<AppState>) -> Json<CreateSessionResponse> {
    let id = state.sessions.create().await;
    Json(CreateSessionResponse { id })
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let snapshot = state.sessions.snapshot(&id).await?;
    Ok(Json(SessionResponse::new(id, snapshot)))
}

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("text must not be empty".to_string()));
    }

    let outcome = state.sessions.send_message(&id, text).await?;
    let snapshot = state.sessions.snapshot(&id).await?;

    Ok(Json(ChatResponse {
        reply: outcome.reply,
        session: SessionResponse::new(id, snapshot),
    }))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.sessions.end(&id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("baristabot ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Upstream(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(_) => AppError::NotFound(e.to_string()),
            SessionError::Transition(TransitionError::TurnInProgress) => {
                AppError::Conflict(e.to_string())
            }
            SessionError::Transition(_)
            | SessionError::Policy { .. }
            | SessionError::RecursionLimit(_) => AppError::Upstream(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Upstream(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("{msg}. {TRY_AGAIN}"),
            ),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
