use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::db::{self, queries};
use crate::errors::AppError;
use crate::models::{is_plausible_email, ContactMessage};
use crate::services::notify::Notification;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub message: String,
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// POST /api/contact
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ContactRequest>,
) -> Result<(StatusCode, Json<ContactMessage>), AppError> {
    let name = body.name.trim();
    let email = body.email.trim();
    let text = body.message.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    if email.is_empty() {
        return Err(AppError::Validation("email is required".to_string()));
    }
    if !is_plausible_email(email) {
        return Err(AppError::Validation("invalid email address".to_string()));
    }
    if text.is_empty() {
        return Err(AppError::Validation("message is required".to_string()));
    }

    let message = ContactMessage {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: email.to_string(),
        company: optional(body.company),
        phone: optional(body.phone),
        message: text.to_string(),
        created_at: queries::timestamp(),
    };

    {
        let conn = db::lock(&state.db)?;
        queries::insert_contact_message(&conn, &message)?;
    }
    tracing::info!(message_id = %message.id, "contact message stored");

    // The message is already stored; a failed alert only gets logged.
    if let Err(e) = state
        .contact_notifier
        .notify(&Notification::new_contact(&message))
        .await
    {
        tracing::warn!(error = %e, message_id = %message.id, "contact notification failed");
    }

    Ok((StatusCode::CREATED, Json(message)))
}
