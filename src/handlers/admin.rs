use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::db::{self, queries};
use crate::errors::AppError;
use crate::handlers::auth::require_admin;
use crate::models::{
    is_plausible_email, slugify, BlogPost, Booking, BookingStatus, Client, ConsultantSettings,
    ContactMessage, Project, ProjectCategory, User, UserRole, WorkingHours,
};
use crate::services::{slots, storage};
use crate::state::AppState;

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn deleted(found: bool, what: &str, id: &str) -> Result<StatusCode, AppError> {
    if found {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("{what} {id}")))
    }
}

// ── Blog posts ──

#[derive(Deserialize)]
pub struct BlogPostInput {
    pub title: String,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: String,
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub published: bool,
}

impl BlogPostInput {
    fn slug(&self) -> Result<String, AppError> {
        let slug = match optional(self.slug.clone()) {
            Some(s) => slugify(&s),
            None => slugify(&self.title),
        };
        if slug.is_empty() {
            return Err(AppError::Validation(
                "slug must contain at least one letter or digit".to_string(),
            ));
        }
        Ok(slug)
    }
}

// GET /api/admin/blog
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<BlogPost>>, AppError> {
    require_admin(&state, &headers)?;
    let conn = db::lock(&state.db)?;
    Ok(Json(queries::list_blog_posts(&conn, false)?))
}

// GET /api/admin/blog/:id
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BlogPost>, AppError> {
    require_admin(&state, &headers)?;
    let conn = db::lock(&state.db)?;
    queries::get_blog_post(&conn, &id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("blog post {id}")))
}

// POST /api/admin/blog
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<BlogPostInput>,
) -> Result<(StatusCode, Json<BlogPost>), AppError> {
    require_admin(&state, &headers)?;

    let now = queries::timestamp();
    let post = BlogPost {
        id: uuid::Uuid::new_v4().to_string(),
        title: required("title", &input.title)?,
        slug: input.slug()?,
        excerpt: optional(input.excerpt),
        content: input.content,
        cover_image_url: optional(input.cover_image_url),
        published: input.published,
        published_at: input.published.then(|| now.clone()),
        created_at: now.clone(),
        updated_at: now,
    };

    let conn = db::lock(&state.db)?;
    queries::create_blog_post(&conn, &post)?;
    tracing::info!(post_id = %post.id, slug = %post.slug, "blog post created");
    Ok((StatusCode::CREATED, Json(post)))
}

// PUT /api/admin/blog/:id
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<BlogPostInput>,
) -> Result<Json<BlogPost>, AppError> {
    require_admin(&state, &headers)?;

    let conn = db::lock(&state.db)?;
    let existing = queries::get_blog_post(&conn, &id)?
        .ok_or_else(|| AppError::NotFound(format!("blog post {id}")))?;

    let published_at = match (input.published, existing.published_at) {
        (false, _) => None,
        (true, Some(at)) => Some(at),
        (true, None) => Some(queries::timestamp()),
    };
    let post = BlogPost {
        title: required("title", &input.title)?,
        slug: input.slug()?,
        excerpt: optional(input.excerpt),
        content: input.content,
        cover_image_url: optional(input.cover_image_url),
        published: input.published,
        published_at,
        updated_at: queries::timestamp(),
        ..existing
    };

    queries::update_blog_post(&conn, &post)?;
    Ok(Json(post))
}

// DELETE /api/admin/blog/:id
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    require_admin(&state, &headers)?;
    let conn = db::lock(&state.db)?;
    deleted(queries::delete_blog_post(&conn, &id)?, "blog post", &id)
}

// ── Users ──

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
    pub password: Option<String>,
}

// GET /api/admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<User>>, AppError> {
    require_admin(&state, &headers)?;
    let conn = db::lock(&state.db)?;
    Ok(Json(queries::list_users(&conn)?))
}

// POST /api/admin/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    require_admin(&state, &headers)?;

    let email = required("email", &body.email)?;
    if !is_plausible_email(&email) {
        return Err(AppError::Validation("invalid email address".to_string()));
    }
    if body.password.len() < 8 {
        return Err(AppError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email,
        full_name: optional(body.full_name),
        role: body.role.unwrap_or(UserRole::Editor),
        password_hash: state.auth.hash_password(&body.password)?,
        created_at: queries::timestamp(),
    };

    let conn = db::lock(&state.db)?;
    queries::create_user(&conn, &user)?;
    tracing::info!(user_id = %user.id, role = user.role.as_str(), "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

// PUT /api/admin/users/:id
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    let admin = require_admin(&state, &headers)?;

    let conn = db::lock(&state.db)?;
    let mut user = queries::get_user(&conn, &id)?
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;

    if let Some(name) = body.full_name {
        user.full_name = optional(Some(name));
    }
    if let Some(role) = body.role {
        if admin.id == user.id && role != UserRole::Admin {
            return Err(AppError::Conflict(
                "cannot remove your own admin role".to_string(),
            ));
        }
        user.role = role;
    }
    if let Some(password) = body.password {
        if password.len() < 8 {
            return Err(AppError::Validation(
                "password must be at least 8 characters".to_string(),
            ));
        }
        user.password_hash = state.auth.hash_password(&password)?;
    }

    queries::update_user(&conn, &user)?;
    Ok(Json(user))
}

// DELETE /api/admin/users/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let admin = require_admin(&state, &headers)?;
    if admin.id == id {
        return Err(AppError::Conflict("cannot delete your own account".to_string()));
    }
    let conn = db::lock(&state.db)?;
    deleted(queries::delete_user(&conn, &id)?, "user", &id)
}

// ── Clients ──

#[derive(Deserialize)]
pub struct ClientInput {
    pub name: String,
    pub logo_url: Option<String>,
    pub website: Option<String>,
}

// GET /api/admin/clients
pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Client>>, AppError> {
    require_admin(&state, &headers)?;
    let conn = db::lock(&state.db)?;
    Ok(Json(queries::list_clients(&conn)?))
}

// POST /api/admin/clients
pub async fn create_client(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<ClientInput>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    require_admin(&state, &headers)?;

    let client = Client {
        id: uuid::Uuid::new_v4().to_string(),
        name: required("name", &input.name)?,
        logo_url: optional(input.logo_url),
        website: optional(input.website),
        created_at: queries::timestamp(),
    };

    let conn = db::lock(&state.db)?;
    queries::create_client(&conn, &client)?;
    Ok((StatusCode::CREATED, Json(client)))
}

// PUT /api/admin/clients/:id
pub async fn update_client(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<ClientInput>,
) -> Result<Json<Client>, AppError> {
    require_admin(&state, &headers)?;

    let conn = db::lock(&state.db)?;
    let existing = queries::get_client(&conn, &id)?
        .ok_or_else(|| AppError::NotFound(format!("client {id}")))?;
    let client = Client {
        name: required("name", &input.name)?,
        logo_url: optional(input.logo_url),
        website: optional(input.website),
        ..existing
    };

    queries::update_client(&conn, &client)?;
    Ok(Json(client))
}

// DELETE /api/admin/clients/:id
pub async fn delete_client(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    require_admin(&state, &headers)?;
    let conn = db::lock(&state.db)?;
    deleted(queries::delete_client(&conn, &id)?, "client", &id)
}

// ── Portfolio ──

#[derive(Deserialize)]
pub struct ProjectInput {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category_id: Option<String>,
    pub link: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub slug: Option<String>,
}

// GET /api/admin/projects
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Project>>, AppError> {
    require_admin(&state, &headers)?;
    let conn = db::lock(&state.db)?;
    Ok(Json(queries::list_projects(&conn, None)?))
}

// POST /api/admin/projects
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<ProjectInput>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    require_admin(&state, &headers)?;

    let project = Project {
        id: uuid::Uuid::new_v4().to_string(),
        title: required("title", &input.title)?,
        description: optional(input.description),
        image_url: optional(input.image_url),
        category_id: optional(input.category_id),
        link: optional(input.link),
        featured: input.featured,
        created_at: queries::timestamp(),
    };

    let conn = db::lock(&state.db)?;
    queries::create_project(&conn, &project)?;
    Ok((StatusCode::CREATED, Json(project)))
}

// PUT /api/admin/projects/:id
pub async fn update_project(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<ProjectInput>,
) -> Result<Json<Project>, AppError> {
    require_admin(&state, &headers)?;

    let conn = db::lock(&state.db)?;
    let existing = queries::get_project(&conn, &id)?
        .ok_or_else(|| AppError::NotFound(format!("project {id}")))?;
    let project = Project {
        title: required("title", &input.title)?,
        description: optional(input.description),
        image_url: optional(input.image_url),
        category_id: optional(input.category_id),
        link: optional(input.link),
        featured: input.featured,
        ..existing
    };

    queries::update_project(&conn, &project)?;
    Ok(Json(project))
}

// DELETE /api/admin/projects/:id
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    require_admin(&state, &headers)?;
    let conn = db::lock(&state.db)?;
    deleted(queries::delete_project(&conn, &id)?, "project", &id)
}

// GET /api/admin/project-categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ProjectCategory>>, AppError> {
    require_admin(&state, &headers)?;
    let conn = db::lock(&state.db)?;
    Ok(Json(queries::list_project_categories(&conn)?))
}

// POST /api/admin/project-categories
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<ProjectCategory>), AppError> {
    require_admin(&state, &headers)?;

    let name = required("name", &input.name)?;
    let slug = slugify(optional(input.slug).as_deref().unwrap_or(&name));
    if slug.is_empty() {
        return Err(AppError::Validation(
            "slug must contain at least one letter or digit".to_string(),
        ));
    }
    let category = ProjectCategory {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        slug,
    };

    let conn = db::lock(&state.db)?;
    queries::create_project_category(&conn, &category)?;
    Ok((StatusCode::CREATED, Json(category)))
}

// DELETE /api/admin/project-categories/:id
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    require_admin(&state, &headers)?;
    let conn = db::lock(&state.db)?;
    deleted(queries::delete_project_category(&conn, &id)?, "category", &id)
}

// ── Bookings ──

#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

// GET /api/admin/bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    require_admin(&state, &headers)?;

    let status = match query.status.as_deref() {
        None | Some("") | Some("all") => None,
        Some(s) => Some(
            BookingStatus::try_parse(s)
                .ok_or_else(|| AppError::Validation(format!("unknown booking status: {s}")))?,
        ),
    };
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    let conn = db::lock(&state.db)?;
    Ok(Json(queries::list_bookings(&conn, status, limit)?))
}

// PUT /api/admin/bookings/:id/status
#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Booking>, AppError> {
    require_admin(&state, &headers)?;

    let status = BookingStatus::try_parse(&body.status)
        .ok_or_else(|| AppError::Validation(format!("unknown booking status: {}", body.status)))?;

    let conn = db::lock(&state.db)?;
    if !queries::update_booking_status(&conn, &id, status)? {
        return Err(AppError::NotFound(format!("booking {id}")));
    }
    tracing::info!(booking_id = %id, status = status.as_str(), "booking status updated");

    queries::get_booking_by_id(&conn, &id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

// ── Consultant settings ──

#[derive(Deserialize)]
pub struct ConsultantSettingsInput {
    pub consultant_name: String,
    pub photo_url: Option<String>,
    pub working_hours: WorkingHours,
}

// PUT /api/admin/consultant
pub async fn update_consultant(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<ConsultantSettingsInput>,
) -> Result<Json<ConsultantSettings>, AppError> {
    require_admin(&state, &headers)?;

    if slots::generate_time_slots(Some(&input.working_hours)).is_empty() {
        return Err(AppError::Validation(
            "working hours must span at least one full hour".to_string(),
        ));
    }
    if input.working_hours.days.iter().any(|d| *d > 6) {
        return Err(AppError::Validation(
            "working days must be between 0 (Sunday) and 6".to_string(),
        ));
    }

    let settings = ConsultantSettings {
        consultant_name: required("consultant_name", &input.consultant_name)?,
        photo_url: optional(input.photo_url),
        working_hours: input.working_hours,
    };

    let conn = db::lock(&state.db)?;
    queries::save_consultant_settings(&conn, &settings)?;
    Ok(Json(settings))
}

// ── Contact messages ──

#[derive(Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<i64>,
}

// GET /api/admin/contact-messages
pub async fn list_contact_messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<ContactMessage>>, AppError> {
    require_admin(&state, &headers)?;
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    let conn = db::lock(&state.db)?;
    Ok(Json(queries::list_contact_messages(&conn, limit)?))
}

// ── Uploads ──

#[derive(Deserialize)]
pub struct UploadRequest {
    pub bucket: String,
    pub file_name: String,
    pub content_base64: String,
}

#[derive(Serialize)]
pub struct UploadResponse {
    public_url: String,
}

// POST /api/admin/uploads
pub async fn upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<UploadRequest>,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    require_admin(&state, &headers)?;

    if !storage::is_valid_bucket(&body.bucket) {
        return Err(AppError::Validation(format!("invalid bucket name: {}", body.bucket)));
    }
    let bytes = STANDARD
        .decode(body.content_base64.trim())
        .map_err(|e| AppError::Validation(format!("invalid base64 content: {e}")))?;
    if bytes.is_empty() {
        return Err(AppError::Validation("file is empty".to_string()));
    }

    let public_url = state
        .storage
        .upload(&body.bucket, &body.file_name, &bytes)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(UploadResponse { public_url })))
}
