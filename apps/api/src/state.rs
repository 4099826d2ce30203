use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::tokens::TokenManager;
use crate::interpreter::ClauseInterpreter;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Pluggable clause interpreter. Production uses `OpenAiInterpreter`;
    /// tests substitute a stub.
    pub interpreter: Arc<dyn ClauseInterpreter>,
    pub tokens: TokenManager,
}
