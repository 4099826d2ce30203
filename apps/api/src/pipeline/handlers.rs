use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::extraction::{ExtractionListResponse, ExtractionResponse};
use crate::pipeline::{fetch_extraction, list_extractions, submit, validate_page_params};
use crate::state::AppState;

/// Parses a path id, keeping the structured error body on malformed input
/// instead of axum's plain-text rejection.
fn parse_extraction_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::Validation(format!("Invalid extraction id: {id}")))
}

/// POST /api/extract
pub async fn handle_extract(
    State(state): State<AppState>,
    _user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ExtractionResponse>), AppError> {
    let mut filename: Option<String> = None;
    let mut file_content: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart payload: {e}")))?
    {
        if field.name() == Some("file") {
            filename = field.file_name().map(str::to_owned);
            file_content = Some(field.bytes().await.map_err(|e| {
                AppError::Validation(format!("Failed to read uploaded file: {e}"))
            })?);
        }
    }

    let file_content = file_content
        .ok_or_else(|| AppError::Validation("Missing 'file' field in upload".to_string()))?;
    let filename =
        filename.ok_or_else(|| AppError::Validation("No filename provided".to_string()))?;

    let response = submit(&state, &filename, &file_content).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/extractions/:id
pub async fn handle_get_extraction(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ExtractionResponse>, AppError> {
    let id = parse_extraction_id(&id)?;
    let response = fetch_extraction(&state.db, id).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/extractions?skip=&limit=
pub async fn handle_list_extractions(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<ListQuery>,
) -> Result<Json<ExtractionListResponse>, AppError> {
    let skip = params.skip.unwrap_or(0);
    let limit = params.limit.unwrap_or(10);
    validate_page_params(skip, limit)?;

    let response = list_extractions(&state.db, skip, limit).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_id_parses() {
        let id = Uuid::new_v4();
        assert_eq!(parse_extraction_id(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn malformed_id_is_a_validation_error() {
        let err = parse_extraction_id("not-a-uuid").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("not-a-uuid"));
    }
}
