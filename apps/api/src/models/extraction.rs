use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// One document-processing attempt. `status` is one of
/// `processing`, `completed`, `failed`; terminal states are final.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExtractionRow {
    pub id: Uuid,
    pub filename: String,
    pub file_type: String,
    pub file_size: i64,
    pub status: String,
    pub error_message: Option<String>,
    pub extra_data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One structured legal provision identified within an extraction.
/// Immutable after creation; written as a batch per successful extraction.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClauseRow {
    pub id: Uuid,
    pub extraction_id: Uuid,
    pub clause_type: String,
    pub title: Option<String>,
    pub content: String,
    pub order: i32,
    pub extra_data: Value,
    pub created_at: DateTime<Utc>,
}

/// Wire shape for a single extraction: the row's fields plus its clauses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResponse {
    #[serde(flatten)]
    pub extraction: ExtractionRow,
    pub clauses: Vec<ClauseRow>,
}

/// Wire shape for the paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionListResponse {
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
    pub extractions: Vec<ExtractionResponse>,
}
