// Login and identity endpoints
//
// Identity verification against the upstream provider happens before this
// service; login trusts the supplied identity and exchanges it for a backend
// JWT.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::info;

use crate::db::DatabaseOperations;
use crate::middleware::{create_access_token, CurrentUser};
use crate::models::{AppState, LoginRequest, TokenResponse, User, UserRole};
use crate::types::{AppError, AppResult};

// Academic email domains that map to the professor role on first login.
const PROFESSOR_DOMAINS: &[&str] = &["@university.edu", "@college.edu", "@school.edu"];

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .with_state(state)
}

fn infer_role(email: &str) -> UserRole {
    if PROFESSOR_DOMAINS.iter().any(|domain| email.ends_with(domain)) {
        UserRole::Professor
    } else {
        UserRole::Student
    }
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let email = request.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::InvalidRequest("A valid email is required".to_string()));
    }

    let role = infer_role(&email);
    let user = DatabaseOperations::get_or_create_user(&state.pool, &email, request.name.trim(), role)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let access_token = create_access_token(
        user.id,
        &state.config.auth.secret,
        state.config.auth.token_ttl_minutes,
    )?;

    info!(user_id = %user.id, role = %user.role, "issued access token");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        user,
    }))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_academic_domains_map_to_professor() {
        assert_eq!(infer_role("ada@university.edu"), UserRole::Professor);
        assert_eq!(infer_role("grace@college.edu"), UserRole::Professor);
    }

    #[test]
    fn test_other_domains_map_to_student() {
        assert_eq!(infer_role("student@gmail.com"), UserRole::Student);
        assert_eq!(infer_role("someone@example.org"), UserRole::Student);
    }
}
