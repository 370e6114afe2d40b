//! API Routes
//!
//! HTTP endpoints for the application:
//! - `/api/auth` - login and identity
//! - `/api/courses` - course and school management, syllabus upload
//! - `/api/events` - course event CRUD
//! - `/api/health` - health checks

pub mod auth;
pub mod courses;
pub mod events;
pub mod health;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors_layer;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.config.server);

    Router::new()
        .merge(auth::router(state.clone()))
        .merge(courses::router(state.clone()))
        .merge(events::router(state.clone()))
        .merge(health::router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
