use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use serde::Deserialize;
use tokio_stream::{Stream, StreamExt};

use crate::db;
use crate::errors::AppError;
use crate::models::UserRole;
use crate::services::auth::{AuthState, AuthUser, Session};
use crate::state::AppState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
}

fn resolve(state: &AppState, token: &str) -> Result<AuthState, AppError> {
    let conn = db::lock(&state.db)?;
    Ok(state.auth.resolve(&conn, token)?)
}

fn authorize_admin(state: &AppState, token: &str) -> Result<AuthUser, AppError> {
    let user = resolve(state, token)?.user.ok_or(AppError::Unauthorized)?;
    if user.role != UserRole::Admin {
        tracing::warn!(user_id = %user.id, "non-admin attempted admin access");
        return Err(AppError::Forbidden);
    }
    Ok(user)
}

/// Resolves the bearer token to a signed-in admin.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;
    authorize_admin(state, token)
}

// POST /api/auth/sign-in
#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignInRequest>,
) -> Result<Json<Session>, AppError> {
    let conn = db::lock(&state.db)?;
    match state.auth.sign_in(&conn, &body.email, &body.password)? {
        Ok(session) => Ok(Json(session)),
        Err(_) => Err(AppError::Unauthorized),
    }
}

// POST /api/auth/sign-out
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    if let Some(token) = bearer_token(&headers) {
        state.auth.sign_out(token);
    }
    Json(serde_json::json!({ "ok": true }))
}

// GET /api/auth/session
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AuthState>, AppError> {
    match bearer_token(&headers) {
        Some(token) => Ok(Json(resolve(&state, token)?)),
        None => Ok(Json(AuthState {
            user: None,
            loading: false,
            error: None,
        })),
    }
}

// GET /api/auth/events (SSE)
#[derive(Deserialize)]
pub struct EventsQuery {
    pub token: Option<String>,
}

pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    // EventSource can't set headers, so the token comes in the query string.
    let token = query.token.as_deref().ok_or(AppError::Unauthorized)?;
    authorize_admin(&state, token)?;

    let stream = state
        .auth
        .subscribe()
        .map(|event| Event::default().event("auth_event").json_data(event));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
