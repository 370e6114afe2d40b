use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::extract::SyllabusExtractor;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub extractor: Arc<SyllabusExtractor>,
}

// Database models
// Note: FromRow is needed for runtime query_as (without DATABASE_URL at compile time)

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Professor,
    Student,
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Professor => write!(f, "professor"),
            UserRole::Student => write!(f, "student"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

/// Closed set of calendar-event categories the extractor and the API accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_category")]
pub enum EventCategory {
    Exam,
    Quiz,
    #[sqlx(rename = "HW")]
    #[serde(rename = "HW")]
    Hw,
    Project,
    Presentation,
    Class,
    Other,
}

impl std::str::FromStr for EventCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exam" => Ok(EventCategory::Exam),
            "quiz" => Ok(EventCategory::Quiz),
            "hw" => Ok(EventCategory::Hw),
            "project" => Ok(EventCategory::Project),
            "presentation" => Ok(EventCategory::Presentation),
            "class" => Ok(EventCategory::Class),
            "other" => Ok(EventCategory::Other),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown event category: {0}")]
pub struct UnknownCategory(pub String);

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: uuid::Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct School {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: uuid::Uuid,
    pub code: String,
    pub title: String,
    pub created_by: uuid::Uuid,
    pub school_id: Option<i32>,
    pub crn: Option<String>,
    pub semester: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct Enrollment {
    pub student_id: uuid::Uuid,
    pub course_id: uuid::Uuid,
    pub enrolled_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct CourseEvent {
    pub id: uuid::Uuid,
    pub course_id: uuid::Uuid,
    pub title: String,
    pub start_ts: chrono::DateTime<chrono::Utc>,
    pub end_ts: chrono::DateTime<chrono::Utc>,
    pub category: EventCategory,
    pub location: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// An unconfirmed calendar entry produced by the syllabus extractor. Ownership
/// passes to the caller, which may discard, display, or publish it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CandidateEvent {
    pub title: String,
    pub date: chrono::NaiveDate,
    pub category: EventCategory,
    pub location: Option<String>,
}

// API request/response types

#[derive(Debug, serde::Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub name: String,
}

#[derive(Debug, serde::Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: User,
}

#[derive(Debug, serde::Deserialize)]
pub struct CourseCreate {
    pub title: String,
    pub school_id: Option<i32>,
    pub crn: Option<String>,
    pub semester: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct JoinRequest {
    pub course_code: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct CourseSearchQuery {
    pub school_id: i32,
    pub crn: String,
    pub semester: String,
}

#[derive(Debug, serde::Serialize)]
pub struct CourseSummary {
    #[serde(flatten)]
    pub course: Course,
    pub student_count: i64,
    pub school: Option<School>,
}

#[derive(Debug, serde::Deserialize)]
pub struct SchoolCreate {
    pub name: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CourseEventCreate {
    pub title: String,
    pub start_ts: chrono::DateTime<chrono::Utc>,
    pub end_ts: chrono::DateTime<chrono::Utc>,
    pub category: EventCategory,
    pub location: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct CourseEventUpdate {
    pub title: Option<String>,
    pub start_ts: Option<chrono::DateTime<chrono::Utc>>,
    pub end_ts: Option<chrono::DateTime<chrono::Utc>>,
    pub category: Option<EventCategory>,
    pub location: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct SyllabusUploadResponse {
    pub extracted_events: Vec<CandidateEvent>,
    pub course_id: uuid::Uuid,
}

#[derive(Debug, serde::Serialize)]
pub struct PublishResponse {
    pub message: String,
    pub events_created: usize,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub database: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_str_is_case_insensitive() {
        assert_eq!("Exam".parse::<EventCategory>().ok(), Some(EventCategory::Exam));
        assert_eq!("hw".parse::<EventCategory>().ok(), Some(EventCategory::Hw));
        assert_eq!("HW".parse::<EventCategory>().ok(), Some(EventCategory::Hw));
        assert!("Lecture Series".parse::<EventCategory>().is_err());
    }

    #[test]
    fn test_category_serde_uses_closed_set_labels() {
        let json = serde_json::to_string(&EventCategory::Hw).unwrap();
        assert_eq!(json, "\"HW\"");
        let back: EventCategory = serde_json::from_str("\"Presentation\"").unwrap();
        assert_eq!(back, EventCategory::Presentation);
    }

    #[test]
    fn test_candidate_event_date_round_trip() {
        let event = CandidateEvent {
            title: "Final Exam".to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2025, 12, 12).unwrap(),
            category: EventCategory::Exam,
            location: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: CandidateEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.date, event.date);
    }
}
