use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, warn};

use crate::{
    identity::{Credentials, IdentityProvider},
    memory::ConversationStore,
    orchestrator::DefaultChatOrchestrator,
    types::{DEFAULT_SESSION_ID, MessageCtx},
};

pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 4_000;

#[derive(Debug, Clone, Copy)]
pub struct HttpSettings {
    pub max_message_chars: usize,
    /// Serves `/api/sessions*`. These routes are unauthenticated and expose
    /// every session's history, so they stay off unless asked for.
    pub session_inspection_enabled: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            session_inspection_enabled: false,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<DefaultChatOrchestrator>,
    pub conversations: Arc<dyn ConversationStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub settings: HttpSettings,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct AuthSuccess {
    pub success: bool,
    pub message: &'static str,
    pub data: Value,
}

#[derive(Debug, Serialize)]
pub struct AuthFailure {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    200
}

type ChatError = (StatusCode, Json<ErrorResponse>);
type AuthError = (StatusCode, Json<AuthFailure>);

pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/signup", post(signup))
        .route("/login", post(login));
    if state.settings.session_inspection_enabled {
        router = router
            .route("/api/sessions", get(api_list_sessions))
            .route("/api/sessions/{session_id}/turns", get(api_session_turns));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index() -> &'static str {
    "FloatChat API"
}

async fn health() -> &'static str {
    "ok"
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ChatError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!(%rejection, "malformed chat request");
        chat_error(StatusCode::BAD_REQUEST, rejection.body_text())
    })?;

    let max_chars = state.settings.max_message_chars;
    if request.message.chars().nth(max_chars).is_some() {
        debug!(max_chars, "chat message too long");
        return Err(chat_error(
            StatusCode::BAD_REQUEST,
            format!("message exceeds {max_chars} characters"),
        ));
    }

    let session_id = request
        .session_id
        .map(|id| id.trim().to_owned())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_owned());
    debug!(session_id = %session_id, message = %request.message, "chat message received");

    let reply = state
        .orchestrator
        .handle_message(MessageCtx {
            session_id,
            content: request.message,
            timestamp: Utc::now(),
        })
        .await
        .map_err(|error| {
            warn!(?error, "chat failed");
            chat_error(StatusCode::INTERNAL_SERVER_ERROR, "Chat failed".to_owned())
        })?;

    Ok(Json(ChatResponse { reply: reply.text }))
}

async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AuthSuccess>, AuthError> {
    let credentials = validate_credentials(payload)?;
    let data = state
        .identity
        .sign_up(&credentials)
        .await
        .map_err(|error| provider_error("signup", error))?;

    Ok(Json(AuthSuccess {
        success: true,
        message: "Signup successful!",
        data,
    }))
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AuthSuccess>, AuthError> {
    let credentials = validate_credentials(payload)?;
    let data = state
        .identity
        .sign_in_with_password(&credentials)
        .await
        .map_err(|error| provider_error("login", error))?;

    Ok(Json(AuthSuccess {
        success: true,
        message: "Login successful!",
        data,
    }))
}

// --- Session inspection handlers ---

async fn api_list_sessions(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<impl IntoResponse, ChatError> {
    let sessions = state
        .conversations
        .list_sessions(query.limit)
        .await
        .map_err(internal_error)?;
    Ok(Json(sessions))
}

async fn api_session_turns(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ChatError> {
    let turns = state
        .conversations
        .snapshot(&session_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(turns))
}

fn validate_credentials(
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Credentials, AuthError> {
    let Json(credentials) =
        payload.map_err(|rejection| auth_error(rejection.body_text()))?;

    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(auth_error("email and password are required".to_owned()));
    }
    Ok(credentials)
}

fn provider_error(operation: &'static str, error: anyhow::Error) -> AuthError {
    warn!(operation, %error, "identity provider call failed");
    auth_error(error.to_string())
}

fn auth_error(message: String) -> AuthError {
    (
        StatusCode::BAD_REQUEST,
        Json(AuthFailure {
            success: false,
            message,
        }),
    )
}

fn chat_error(status: StatusCode, error: String) -> ChatError {
    (status, Json(ErrorResponse { error }))
}

fn internal_error(error: anyhow::Error) -> ChatError {
    chat_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("internal error: {error}"),
    )
}
