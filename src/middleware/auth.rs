// Bearer JWT authentication
//
// Tokens are issued by the auth routes and carry the user id in `sub`. The
// `CurrentUser` extractor verifies the token and loads the user, so handlers
// take an authenticated `User` as an argument.

use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::DatabaseOperations;
use crate::models::{AppState, User, UserRole};
use crate::types::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

pub fn create_access_token(user_id: Uuid, secret: &str, ttl_minutes: i64) -> AppResult<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + Duration::minutes(ttl_minutes)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("failed to sign token: {e}")))
}

pub fn verify_token(token: &str, secret: &str) -> AppResult<Uuid> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Auth("Could not validate credentials".to_string()))?;

    Uuid::parse_str(&data.claims.sub)
        .map_err(|_| AppError::Auth("Could not validate credentials".to_string()))
}

/// Authenticated user, extracted from the `Authorization: Bearer` header.
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn require_role(&self, role: UserRole, action: &str) -> AppResult<()> {
        if self.0.role == role || self.0.role == UserRole::Admin {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("Only {role}s can {action}")))
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Auth("Invalid authorization header".to_string()))?;

        let user_id = verify_token(token, &state.config.auth.secret)?;

        let user = DatabaseOperations::get_user(&state.pool, user_id)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
            .ok_or_else(|| AppError::Auth("User not found".to_string()))?;

        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_round_trip() {
        let user_id = Uuid::new_v4();
        let token = create_access_token(user_id, SECRET, 30).unwrap();
        assert_eq!(verify_token(&token, SECRET).unwrap(), user_id);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_access_token(Uuid::new_v4(), SECRET, 30).unwrap();
        assert!(verify_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = create_access_token(Uuid::new_v4(), SECRET, -5).unwrap();
        assert!(verify_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(verify_token("not.a.jwt", SECRET).is_err());
    }
}
