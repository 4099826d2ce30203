//! Access Layer: credential storage, session issuance, and the request
//! extractor that turns a bearer token into the current user.

pub mod handlers;
pub mod password;
pub mod tokens;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::errors::AppError;
use crate::models::user::UserRow;
use crate::state::AppState;

/// The current authenticated, active user. Handlers that take this
/// parameter reject requests without a valid bearer token.
pub struct AuthUser(pub UserRow);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid authorization header".to_string()))?;

        let claims = state
            .tokens
            .verify(token)
            .map_err(|e| AppError::Unauthorized(e.to_string()))?;

        let user: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(claims.sub)
            .fetch_optional(&state.db)
            .await?;

        let user = user.ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

        if !user.is_active {
            return Err(AppError::Forbidden("User account is inactive".to_string()));
        }

        Ok(AuthUser(user))
    }
}
