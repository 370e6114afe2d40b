// Course event CRUD

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use crate::db::DatabaseOperations;
use crate::middleware::CurrentUser;
use crate::models::{
    AppState, Course, CourseEvent, CourseEventCreate, CourseEventUpdate, UserRole,
};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/events/course/{course_id}", get(list_course_events))
        .route("/api/events", post(create_event))
        .route("/api/events/{event_id}", put(update_event).delete(delete_event))
        .with_state(state)
}

async fn course_or_404(state: &AppState, course_id: Uuid) -> AppResult<Course> {
    DatabaseOperations::get_course(&state.pool, course_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))
}

/// Events are visible to the course owner, enrolled students, and admins.
async fn list_course_events(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<Vec<CourseEvent>>> {
    let course = course_or_404(&state, course_id).await?;

    let user = &current.0;
    let allowed = match user.role {
        UserRole::Admin => true,
        UserRole::Professor => course.created_by == user.id,
        UserRole::Student => DatabaseOperations::is_enrolled(&state.pool, user.id, course.id)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?,
    };
    if !allowed {
        return Err(AppError::Forbidden(
            "You do not have access to this course".to_string(),
        ));
    }

    let events = DatabaseOperations::list_events_for_course(&state.pool, course.id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(events))
}

async fn owned_event_course(
    state: &AppState,
    event_id: Uuid,
    owner: Uuid,
) -> AppResult<CourseEvent> {
    let event = DatabaseOperations::get_event(&state.pool, event_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let course = course_or_404(state, event.course_id).await?;
    if course.created_by != owner {
        return Err(AppError::Forbidden(
            "You can only manage events for your own courses".to_string(),
        ));
    }

    Ok(event)
}

#[derive(Debug, serde::Deserialize)]
pub struct EventCreateRequest {
    pub course_id: Uuid,
    #[serde(flatten)]
    pub event: CourseEventCreate,
}

async fn create_event(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<EventCreateRequest>,
) -> AppResult<Json<CourseEvent>> {
    current.require_role(UserRole::Professor, "create events")?;

    let course = course_or_404(&state, request.course_id).await?;
    if course.created_by != current.0.id {
        return Err(AppError::Forbidden(
            "You can only create events for your own courses".to_string(),
        ));
    }

    let event = DatabaseOperations::create_event(&state.pool, course.id, &request.event)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    info!(event_id = %event.id, course_id = %course.id, "event created");
    Ok(Json(event))
}

async fn update_event(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(event_id): Path<Uuid>,
    Json(update): Json<CourseEventUpdate>,
) -> AppResult<Json<CourseEvent>> {
    current.require_role(UserRole::Professor, "update events")?;
    owned_event_course(&state, event_id, current.0.id).await?;

    let event = DatabaseOperations::update_event(&state.pool, event_id, &update)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(event))
}

async fn delete_event(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(event_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    current.require_role(UserRole::Professor, "delete events")?;
    owned_event_course(&state, event_id, current.0.id).await?;

    DatabaseOperations::delete_event(&state.pool, event_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    info!(%event_id, "event deleted");
    Ok(Json(serde_json::json!({ "detail": "Event deleted successfully" })))
}
