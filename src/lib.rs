pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let uploads = ServeDir::new(&state.config.upload_dir);
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health::health))
        // Public site
        .route("/api/consultant", get(handlers::booking::get_consultant))
        .route("/api/booking/slots", get(handlers::booking::get_slots))
        .route("/api/booking/calendar", get(handlers::booking::get_calendar))
        .route("/api/booking/sessions", post(handlers::booking::create_session))
        .route("/api/booking/sessions/:id", get(handlers::booking::get_session))
        .route(
            "/api/booking/sessions/:id/date",
            post(handlers::booking::select_date),
        )
        .route(
            "/api/booking/sessions/:id/time",
            post(handlers::booking::select_time),
        )
        .route(
            "/api/booking/sessions/:id/proceed",
            post(handlers::booking::proceed),
        )
        .route("/api/booking/sessions/:id/back", post(handlers::booking::back))
        .route(
            "/api/booking/sessions/:id/contact",
            put(handlers::booking::update_contact),
        )
        .route(
            "/api/booking/sessions/:id/submit",
            post(handlers::booking::submit),
        )
        .route("/api/contact", post(handlers::contact::submit_contact))
        .route("/api/blog", get(handlers::content::list_posts))
        .route("/api/blog/:slug", get(handlers::content::get_post))
        .route("/api/clients", get(handlers::content::list_clients))
        .route("/api/projects", get(handlers::content::list_projects))
        .route(
            "/api/project-categories",
            get(handlers::content::list_categories),
        )
        // Auth
        .route("/api/auth/sign-in", post(handlers::auth::sign_in))
        .route("/api/auth/sign-out", post(handlers::auth::sign_out))
        .route("/api/auth/session", get(handlers::auth::get_session))
        .route("/api/auth/events", get(handlers::auth::events_stream))
        // Admin
        .route(
            "/api/admin/blog",
            get(handlers::admin::list_posts).post(handlers::admin::create_post),
        )
        .route(
            "/api/admin/blog/:id",
            get(handlers::admin::get_post)
                .put(handlers::admin::update_post)
                .delete(handlers::admin::delete_post),
        )
        .route(
            "/api/admin/users",
            get(handlers::admin::list_users).post(handlers::admin::create_user),
        )
        .route(
            "/api/admin/users/:id",
            put(handlers::admin::update_user).delete(handlers::admin::delete_user),
        )
        .route(
            "/api/admin/clients",
            get(handlers::admin::list_clients).post(handlers::admin::create_client),
        )
        .route(
            "/api/admin/clients/:id",
            put(handlers::admin::update_client).delete(handlers::admin::delete_client),
        )
        .route(
            "/api/admin/projects",
            get(handlers::admin::list_projects).post(handlers::admin::create_project),
        )
        .route(
            "/api/admin/projects/:id",
            put(handlers::admin::update_project).delete(handlers::admin::delete_project),
        )
        .route(
            "/api/admin/project-categories",
            get(handlers::admin::list_categories).post(handlers::admin::create_category),
        )
        .route(
            "/api/admin/project-categories/:id",
            axum::routing::delete(handlers::admin::delete_category),
        )
        .route("/api/admin/bookings", get(handlers::admin::list_bookings))
        .route(
            "/api/admin/bookings/:id/status",
            put(handlers::admin::update_booking_status),
        )
        .route("/api/admin/consultant", put(handlers::admin::update_consultant))
        .route(
            "/api/admin/contact-messages",
            get(handlers::admin::list_contact_messages),
        )
        .route("/api/admin/uploads", post(handlers::admin::upload))
        .nest_service("/uploads", uploads)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
