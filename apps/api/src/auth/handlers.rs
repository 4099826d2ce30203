use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::user::{UserResponse, UserRow};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

fn validate_registration(req: &RegisterRequest) -> Result<(), AppError> {
    let (local, domain) = req
        .email
        .split_once('@')
        .ok_or_else(|| AppError::Validation("Invalid email address".to_string()))?;
    if local.is_empty() || domain.is_empty() {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    if !(3..=50).contains(&req.username.chars().count()) {
        return Err(AppError::Validation(
            "Username must be between 3 and 50 characters".to_string(),
        ));
    }
    if !(6..=72).contains(&req.password.chars().count()) {
        return Err(AppError::Validation(
            "Password must be between 6 and 72 characters".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    validate_registration(&req)?;

    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&req.email)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Validation("Email already registered".to_string()));
    }

    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE username = $1")
        .bind(&req.username)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Validation("Username already taken".to_string()));
    }

    let hashed_password = hash_password(&req.password)?;
    let user: UserRow = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, username, hashed_password)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&req.email)
    .bind(&req.username)
    .bind(&hashed_password)
    .fetch_one(&state.db)
    .await?;

    info!("New user registered: {}", user.username);

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /api/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    // The login identifier may be either the username or the email.
    let user: Option<UserRow> =
        sqlx::query_as("SELECT * FROM users WHERE username = $1 OR email = $1")
            .bind(&req.username)
            .fetch_optional(&state.db)
            .await?;

    let user = match user {
        Some(user) if verify_password(&req.password, &user.hashed_password) => user,
        _ => {
            return Err(AppError::Unauthorized(
                "Incorrect username or password".to_string(),
            ))
        }
    };

    if !user.is_active {
        return Err(AppError::Forbidden("User account is inactive".to_string()));
    }

    let access_token = state
        .tokens
        .issue(user.id, &user.username)
        .map_err(|e| AppError::Internal(e.into()))?;

    info!("User logged in: {}", user.username);

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// GET /api/auth/me
pub async fn handle_me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(user.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(validate_registration(&request("a@example.com", "alice", "hunter22")).is_ok());
    }

    #[test]
    fn email_without_at_is_rejected() {
        let err = validate_registration(&request("not-an-email", "alice", "hunter22"));
        assert!(err.is_err());
    }

    #[test]
    fn short_username_is_rejected() {
        let err = validate_registration(&request("a@example.com", "al", "hunter22"));
        assert!(err.is_err());
    }

    #[test]
    fn short_password_is_rejected() {
        let err = validate_registration(&request("a@example.com", "alice", "12345"));
        assert!(err.is_err());
    }

    #[test]
    fn overlong_password_is_rejected() {
        let err = validate_registration(&request("a@example.com", "alice", &"x".repeat(73)));
        assert!(err.is_err());
    }
}
