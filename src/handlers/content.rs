use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::db::{self, queries};
use crate::errors::AppError;
use crate::models::{BlogPost, Client, Project, ProjectCategory};
use crate::state::AppState;

// GET /api/blog
pub async fn list_posts(State(state): State<Arc<AppState>>) -> Result<Json<Vec<BlogPost>>, AppError> {
    let conn = db::lock(&state.db)?;
    Ok(Json(queries::list_blog_posts(&conn, true)?))
}

// GET /api/blog/:slug
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<BlogPost>, AppError> {
    let conn = db::lock(&state.db)?;
    queries::get_published_post_by_slug(&conn, &slug)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("blog post {slug}")))
}

// GET /api/clients
pub async fn list_clients(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Client>>, AppError> {
    let conn = db::lock(&state.db)?;
    Ok(Json(queries::list_clients(&conn)?))
}

// GET /api/projects?category=<slug>
#[derive(Deserialize)]
pub struct ProjectsQuery {
    pub category: Option<String>,
}

pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProjectsQuery>,
) -> Result<Json<Vec<Project>>, AppError> {
    let category = query.category.as_deref().filter(|c| !c.is_empty() && *c != "all");
    let conn = db::lock(&state.db)?;
    Ok(Json(queries::list_projects(&conn, category)?))
}

// GET /api/project-categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProjectCategory>>, AppError> {
    let conn = db::lock(&state.db)?;
    Ok(Json(queries::list_project_categories(&conn)?))
}
