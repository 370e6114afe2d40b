// Course and school management, enrollment, and syllabus upload

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use crate::db::DatabaseOperations;
use crate::middleware::CurrentUser;
use crate::models::{
    AppState, Course, CourseCreate, CourseEventCreate, CourseSearchQuery, CourseSummary,
    JoinRequest, PublishResponse, School, SchoolCreate, SyllabusUploadResponse, UserRole,
};
use crate::types::{AppError, AppResult};

const COURSE_CODE_LEN: usize = 8;
const COURSE_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const COURSE_CODE_ATTEMPTS: usize = 16;

pub fn router(state: AppState) -> Router {
    let max_upload_bytes = state.config.upload.max_file_size_mb * 1024 * 1024;

    Router::new()
        .route("/api/courses", get(list_courses).post(create_course))
        .route("/api/courses/join", post(join_course))
        .route("/api/courses/search", get(search_course))
        .route("/api/schools", get(list_schools).post(create_school))
        .route("/api/courses/{course_id}/syllabus", post(upload_syllabus))
        .route(
            "/api/courses/{course_id}/events/publish",
            post(publish_events),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

fn generate_course_code() -> String {
    let mut rng = rand::thread_rng();
    (0..COURSE_CODE_LEN)
        .map(|_| {
            let index = rng.gen_range(0..COURSE_CODE_ALPHABET.len());
            COURSE_CODE_ALPHABET[index] as char
        })
        .collect()
}

async fn unique_course_code(state: &AppState) -> AppResult<String> {
    for _ in 0..COURSE_CODE_ATTEMPTS {
        let code = generate_course_code();
        let taken = DatabaseOperations::course_code_exists(&state.pool, &code)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
        if !taken {
            return Ok(code);
        }
    }
    Err(AppError::Internal(
        "could not generate a unique course code".to_string(),
    ))
}

async fn summarize(state: &AppState, course: Course) -> AppResult<CourseSummary> {
    let student_count = DatabaseOperations::student_count(&state.pool, course.id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let school = match course.school_id {
        Some(school_id) => DatabaseOperations::get_school(&state.pool, school_id)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?,
        None => None,
    };

    Ok(CourseSummary {
        course,
        student_count,
        school,
    })
}

/// Professors see courses they created, students their enrollments, admins all.
async fn list_courses(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<CourseSummary>>> {
    let user = &current.0;
    let courses = match user.role {
        UserRole::Professor => {
            DatabaseOperations::list_courses_for_professor(&state.pool, user.id).await
        }
        UserRole::Student => DatabaseOperations::list_courses_for_student(&state.pool, user.id).await,
        UserRole::Admin => DatabaseOperations::list_all_courses(&state.pool).await,
    }
    .map_err(|e| AppError::Internal(e.to_string()))?;

    let mut summaries = Vec::with_capacity(courses.len());
    for course in courses {
        summaries.push(summarize(&state, course).await?);
    }

    Ok(Json(summaries))
}

async fn create_course(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CourseCreate>,
) -> AppResult<Json<Course>> {
    current.require_role(UserRole::Professor, "create courses")?;

    if request.title.trim().is_empty() {
        return Err(AppError::InvalidRequest("Course title is required".to_string()));
    }

    // Duplicate CRN within the same school and semester is a conflict.
    if let (Some(school_id), Some(crn), Some(semester)) =
        (request.school_id, &request.crn, &request.semester)
    {
        let existing = DatabaseOperations::find_course(&state.pool, school_id, crn, semester)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
        if existing.is_some() {
            return Err(AppError::InvalidRequest(
                "Course with this CRN already exists for this semester".to_string(),
            ));
        }
    }

    let code = unique_course_code(&state).await?;
    let course = DatabaseOperations::create_course(&state.pool, &code, &request, current.0.id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    info!(course_id = %course.id, code = %course.code, "course created");
    Ok(Json(course))
}

async fn join_course(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<JoinRequest>,
) -> AppResult<Json<Course>> {
    current.require_role(UserRole::Student, "join courses")?;

    let course = DatabaseOperations::get_course_by_code(&state.pool, request.course_code.trim())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

    let already = DatabaseOperations::is_enrolled(&state.pool, current.0.id, course.id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if already {
        return Err(AppError::InvalidRequest(
            "Already enrolled in this course".to_string(),
        ));
    }

    DatabaseOperations::create_enrollment(&state.pool, current.0.id, course.id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    info!(course_id = %course.id, student_id = %current.0.id, "student enrolled");
    Ok(Json(course))
}

async fn search_course(
    State(state): State<AppState>,
    _current: CurrentUser,
    Query(query): Query<CourseSearchQuery>,
) -> AppResult<Json<Option<CourseSummary>>> {
    let course =
        DatabaseOperations::find_course(&state.pool, query.school_id, &query.crn, &query.semester)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

    match course {
        Some(course) => Ok(Json(Some(summarize(&state, course).await?))),
        None => Ok(Json(None)),
    }
}

async fn list_schools(
    State(state): State<AppState>,
    _current: CurrentUser,
) -> AppResult<Json<Vec<School>>> {
    let schools = DatabaseOperations::list_schools(&state.pool)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(schools))
}

async fn create_school(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<SchoolCreate>,
) -> AppResult<Json<School>> {
    current.require_role(UserRole::Professor, "create schools")?;

    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidRequest("School name is required".to_string()));
    }

    let school = DatabaseOperations::get_or_create_school(&state.pool, name)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(school))
}

async fn owned_course(state: &AppState, course_id: Uuid, owner: Uuid) -> AppResult<Course> {
    let course = DatabaseOperations::get_course(&state.pool, course_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

    if course.created_by != owner {
        return Err(AppError::Forbidden(
            "You can only manage your own courses".to_string(),
        ));
    }

    Ok(course)
}

/// Run the extractor over an uploaded syllabus and return candidate events.
/// Nothing is persisted; publishing is a separate, explicit step.
async fn upload_syllabus(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(course_id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<SyllabusUploadResponse>> {
    current.require_role(UserRole::Professor, "upload syllabi")?;
    let course = owned_course(&state, course_id, current.0.id).await?;

    let mut file_bytes = None;
    let mut media_type = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            media_type = field.content_type().map(str::to_string);
            file_bytes = Some(field.bytes().await.map_err(|e| {
                AppError::InvalidRequest(format!("Failed to read uploaded file: {e}"))
            })?);
        }
    }

    let bytes = file_bytes
        .ok_or_else(|| AppError::InvalidRequest("Missing \"file\" form field".to_string()))?;
    let media_type = media_type
        .ok_or_else(|| AppError::InvalidRequest("Uploaded file has no content type".to_string()))?;

    if !state
        .config
        .upload
        .allowed_file_types
        .iter()
        .any(|allowed| allowed == &media_type)
    {
        return Err(AppError::InvalidRequest(format!(
            "Unsupported file type: {media_type}"
        )));
    }

    let started_at = Utc::now();
    let extracted_events = state.extractor.extract(&bytes, &media_type).await?;

    info!(
        course_id = %course.id,
        count = extracted_events.len(),
        duration_ms = (Utc::now() - started_at).num_milliseconds(),
        "syllabus processed"
    );

    Ok(Json(SyllabusUploadResponse {
        extracted_events,
        course_id: course.id,
    }))
}

/// Replace the course's published events with the supplied list.
async fn publish_events(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(course_id): Path<Uuid>,
    Json(events): Json<Vec<CourseEventCreate>>,
) -> AppResult<Json<PublishResponse>> {
    current.require_role(UserRole::Professor, "publish events")?;
    let course = owned_course(&state, course_id, current.0.id).await?;

    let events_created = DatabaseOperations::replace_events(&state.pool, course.id, &events)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    info!(course_id = %course.id, events_created, "events published");

    Ok(Json(PublishResponse {
        message: format!("Successfully published {events_created} events"),
        events_created,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_code_shape() {
        for _ in 0..100 {
            let code = generate_course_code();
            assert_eq!(code.len(), COURSE_CODE_LEN);
            assert!(code
                .bytes()
                .all(|b| COURSE_CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_course_codes_vary() {
        let a = generate_course_code();
        let b = generate_course_code();
        let c = generate_course_code();
        assert!(a != b || b != c);
    }
}
