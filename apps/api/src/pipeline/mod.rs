//! Extraction Orchestrator — owns the extraction record lifecycle.
//!
//! `submit` drives the pipeline: validate the filename, persist a durable
//! `processing` record, extract text, interpret clauses, then commit the
//! clause batch and the `completed` status in one transaction. Any failure
//! after the record exists lands it in `failed` with the cause recorded.

pub mod handlers;

use std::collections::HashMap;

use anyhow::bail;
use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extractor::{extract_text, SUPPORTED_EXTENSIONS};
use crate::interpreter::ClauseObject;
use crate::models::extraction::{
    ClauseRow, ExtractionListResponse, ExtractionResponse, ExtractionRow,
};
use crate::state::AppState;

/// Validates the declared filename and returns the lowercased extension.
/// Rejected uploads never create an extraction record.
pub fn validate_filename(filename: &str) -> Result<String, AppError> {
    if filename.trim().is_empty() {
        return Err(AppError::Validation("No filename provided".to_string()));
    }

    // A name without a dot yields itself as the "extension" and is rejected
    // below as unsupported.
    let extension = filename
        .rsplit('.')
        .next()
        .unwrap_or(filename)
        .to_ascii_lowercase();

    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::Validation(format!(
            "Unsupported file type: {extension}. Only PDF, DOCX, and TXT files are supported."
        )));
    }

    Ok(extension)
}

/// Validates pagination bounds: `skip >= 0`, `1 <= limit <= 100`.
pub fn validate_page_params(skip: i64, limit: i64) -> Result<(), AppError> {
    if skip < 0 {
        return Err(AppError::Validation("skip must be >= 0".to_string()));
    }
    if !(1..=100).contains(&limit) {
        return Err(AppError::Validation(
            "limit must be between 1 and 100".to_string(),
        ));
    }
    Ok(())
}

/// Accepts an upload and runs it to a terminal state.
pub async fn submit(
    state: &AppState,
    filename: &str,
    file_content: &[u8],
) -> Result<ExtractionResponse, AppError> {
    let file_type = validate_filename(filename)?;
    let file_size = file_content.len() as i64;

    info!("Processing file: {filename} ({file_type}, {file_size} bytes)");

    // Durable `processing` record before any extraction work begins, so a
    // partial failure is observable as a `failed` row.
    let extraction_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO extractions (id, filename, file_type, file_size, status, extra_data)
        VALUES ($1, $2, $3, $4, 'processing', '{}'::jsonb)
        "#,
    )
    .bind(extraction_id)
    .bind(filename)
    .bind(&file_type)
    .bind(file_size)
    .execute(&state.db)
    .await?;

    info!("Created extraction record: {extraction_id}");

    if let Err(cause) = run_pipeline(state, extraction_id, &file_type, file_content).await {
        sqlx::query(
            "UPDATE extractions SET status = 'failed', error_message = $2, updated_at = now() WHERE id = $1",
        )
        .bind(extraction_id)
        .bind(cause.to_string())
        .execute(&state.db)
        .await?;

        error!("Extraction {extraction_id} failed: {cause}");
        return Err(AppError::Pipeline(format!("Extraction failed: {cause}")));
    }

    info!("Successfully completed extraction {extraction_id}");

    fetch_extraction(&state.db, extraction_id).await
}

/// Steps 3–6 of the submission pipeline. Strictly ordered, no internal
/// parallelism; the error message here becomes the record's `error_message`.
async fn run_pipeline(
    state: &AppState,
    extraction_id: Uuid,
    file_type: &str,
    file_content: &[u8],
) -> anyhow::Result<()> {
    let document_text = extract_text(file_content, file_type)?;

    if document_text.trim().is_empty() {
        bail!("No text could be extracted from the document");
    }

    info!("Extracted {} characters from document", document_text.len());

    let clauses = state.interpreter.extract_clauses(&document_text).await?;

    info!("LLM extracted {} clauses", clauses.len());

    persist_results(&state.db, extraction_id, &document_text, &clauses).await?;

    Ok(())
}

/// A clause row about to be inserted. Defaulting here is independent of the
/// interpreter's: `clause_type` falls back to "unknown" and `title` to
/// "Clause {order+1}" even if the interpreter layer left them absent.
struct NewClause {
    id: Uuid,
    clause_type: String,
    title: String,
    content: String,
    order: i32,
    extra_data: Value,
}

impl NewClause {
    fn from_candidate(order: usize, clause: &ClauseObject) -> Self {
        let text = |key: &str| clause.get(key).and_then(Value::as_str).map(str::to_owned);

        NewClause {
            id: Uuid::new_v4(),
            clause_type: text("clause_type").unwrap_or_else(|| "unknown".to_string()),
            title: text("title").unwrap_or_else(|| format!("Clause {}", order + 1)),
            content: text("content").unwrap_or_default(),
            order: order as i32,
            extra_data: json!({ "summary": text("summary").unwrap_or_default() }),
        }
    }
}

/// Commits the clause batch and the `completed` status together: a partial
/// clause set is never visible under a completed extraction.
async fn persist_results(
    db: &PgPool,
    extraction_id: Uuid,
    document_text: &str,
    clauses: &[ClauseObject],
) -> Result<(), sqlx::Error> {
    let mut tx = db.begin().await?;

    for (idx, candidate) in clauses.iter().enumerate() {
        let clause = NewClause::from_candidate(idx, candidate);
        sqlx::query(
            r#"
            INSERT INTO clauses (id, extraction_id, clause_type, title, content, "order", extra_data)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(clause.id)
        .bind(extraction_id)
        .bind(&clause.clause_type)
        .bind(&clause.title)
        .bind(&clause.content)
        .bind(clause.order)
        .bind(&clause.extra_data)
        .execute(&mut *tx)
        .await?;
    }

    let extra_data = json!({
        "total_clauses": clauses.len(),
        "text_length": document_text.len(),
    });

    sqlx::query(
        "UPDATE extractions SET status = 'completed', extra_data = $2, updated_at = now() WHERE id = $1",
    )
    .bind(extraction_id)
    .bind(extra_data)
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

/// Pure read: one extraction with its clauses attached.
pub async fn fetch_extraction(db: &PgPool, id: Uuid) -> Result<ExtractionResponse, AppError> {
    let extraction: Option<ExtractionRow> =
        sqlx::query_as("SELECT * FROM extractions WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await?;

    let extraction =
        extraction.ok_or_else(|| AppError::NotFound(format!("Extraction not found: {id}")))?;

    let clauses: Vec<ClauseRow> = sqlx::query_as(
        r#"SELECT * FROM clauses WHERE extraction_id = $1 ORDER BY "order" ASC"#,
    )
    .bind(id)
    .fetch_all(db)
    .await?;

    Ok(ExtractionResponse {
        extraction,
        clauses,
    })
}

/// Pure read: a page of extractions ordered by creation time descending,
/// each with its clauses eagerly attached.
pub async fn list_extractions(
    db: &PgPool,
    skip: i64,
    limit: i64,
) -> Result<ExtractionListResponse, AppError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM extractions")
        .fetch_one(db)
        .await?;

    let rows: Vec<ExtractionRow> = sqlx::query_as(
        "SELECT * FROM extractions ORDER BY created_at DESC OFFSET $1 LIMIT $2",
    )
    .bind(skip)
    .bind(limit)
    .fetch_all(db)
    .await?;

    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let clause_rows: Vec<ClauseRow> = sqlx::query_as(
        r#"SELECT * FROM clauses WHERE extraction_id = ANY($1) ORDER BY "order" ASC"#,
    )
    .bind(&ids)
    .fetch_all(db)
    .await?;

    let mut by_extraction: HashMap<Uuid, Vec<ClauseRow>> = HashMap::new();
    for clause in clause_rows {
        by_extraction
            .entry(clause.extraction_id)
            .or_default()
            .push(clause);
    }

    let extractions = rows
        .into_iter()
        .map(|extraction| {
            let clauses = by_extraction.remove(&extraction.id).unwrap_or_default();
            ExtractionResponse {
                extraction,
                clauses,
            }
        })
        .collect();

    Ok(ExtractionListResponse {
        total,
        skip,
        limit,
        extractions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn candidate(pairs: &[(&str, &str)]) -> ClauseObject {
        let mut map = Map::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), Value::String(v.to_string()));
        }
        map
    }

    #[test]
    fn filename_extension_is_validated_case_insensitively() {
        assert_eq!(validate_filename("contract.PDF").unwrap(), "pdf");
        assert_eq!(validate_filename("contract.Docx").unwrap(), "docx");
        assert_eq!(validate_filename("notes.txt").unwrap(), "txt");
        assert_eq!(validate_filename("legacy.doc").unwrap(), "doc");
    }

    #[test]
    fn empty_filename_is_rejected() {
        let err = validate_filename("").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("No filename provided"));
    }

    #[test]
    fn filename_without_extension_is_rejected() {
        let err = validate_filename("contract").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("Unsupported file type"));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = validate_filename("malware.exe").unwrap_err();
        assert!(err.to_string().contains("exe"));
    }

    #[test]
    fn negative_skip_is_rejected() {
        let err = validate_page_params(-1, 10).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("skip"));
    }

    #[test]
    fn zero_limit_is_rejected() {
        let err = validate_page_params(0, 0).unwrap_err();
        assert!(err.to_string().contains("limit"));
    }

    #[test]
    fn oversized_limit_is_rejected() {
        let err = validate_page_params(0, 101).unwrap_err();
        assert!(err.to_string().contains("limit"));
    }

    #[test]
    fn page_bounds_are_inclusive() {
        assert!(validate_page_params(0, 1).is_ok());
        assert!(validate_page_params(0, 100).is_ok());
        assert!(validate_page_params(500, 10).is_ok());
    }

    #[test]
    fn new_clause_defaults_missing_fields() {
        let clause = NewClause::from_candidate(0, &Map::new());
        assert_eq!(clause.clause_type, "unknown");
        assert_eq!(clause.title, "Clause 1");
        assert_eq!(clause.content, "");
        assert_eq!(clause.order, 0);
        assert_eq!(clause.extra_data, json!({ "summary": "" }));
    }

    #[test]
    fn new_clause_keeps_present_fields() {
        let clause = NewClause::from_candidate(
            2,
            &candidate(&[
                ("clause_type", "payment_terms"),
                ("title", "Net 30"),
                ("content", "Payment due in 30 days."),
                ("summary", "Invoices are payable within thirty days."),
            ]),
        );
        assert_eq!(clause.clause_type, "payment_terms");
        assert_eq!(clause.title, "Net 30");
        assert_eq!(clause.order, 2);
        assert_eq!(
            clause.extra_data,
            json!({ "summary": "Invoices are payable within thirty days." })
        );
    }

    #[test]
    fn default_title_numbering_is_one_based_on_order() {
        let clause = NewClause::from_candidate(4, &candidate(&[("content", "x")]));
        assert_eq!(clause.title, "Clause 5");
        assert_eq!(clause.order, 4);
    }

    mod db_backed {
        //! End-to-end pipeline tests against a live PostgreSQL instance.
        //! Run with: TEST_DATABASE_URL=postgres://... cargo test -- --ignored

        use super::*;
        use crate::auth::tokens::TokenManager;
        use crate::db::{create_pool, init_schema};
        use crate::interpreter::{ClauseInterpreter, InterpretError};
        use async_trait::async_trait;
        use std::sync::Arc;

        struct StubInterpreter(Vec<ClauseObject>);

        #[async_trait]
        impl ClauseInterpreter for StubInterpreter {
            async fn extract_clauses(
                &self,
                _document_text: &str,
            ) -> Result<Vec<ClauseObject>, InterpretError> {
                Ok(self.0.clone())
            }
        }

        async fn test_state(clauses: Vec<ClauseObject>) -> AppState {
            let url = std::env::var("TEST_DATABASE_URL")
                .expect("TEST_DATABASE_URL must point at a PostgreSQL instance");
            let db = create_pool(&url).await.unwrap();
            init_schema(&db).await.unwrap();
            AppState {
                db,
                interpreter: Arc::new(StubInterpreter(clauses)),
                tokens: TokenManager::new("test-secret", 60),
            }
        }

        #[tokio::test]
        #[ignore = "requires TEST_DATABASE_URL"]
        async fn txt_submission_completes_with_stubbed_clauses() {
            let state = test_state(vec![
                candidate(&[("clause_type", "payment_terms"), ("content", "30 days")]),
                candidate(&[("clause_type", "termination"), ("content", "on notice")]),
            ])
            .await;

            let response = submit(&state, "contract.txt", b"Payment due in 30 days.")
                .await
                .unwrap();

            assert_eq!(response.extraction.status, "completed");
            assert_eq!(response.extraction.extra_data["total_clauses"], json!(2));
            assert_eq!(response.clauses.len(), 2);
            assert_eq!(response.clauses[0].order, 0);
            assert_eq!(response.clauses[0].clause_type, "payment_terms");
            assert_eq!(response.clauses[1].order, 1);
            assert_eq!(response.clauses[1].clause_type, "termination");

            // Reads are idempotent.
            let again = fetch_extraction(&state.db, response.extraction.id)
                .await
                .unwrap();
            assert_eq!(again.extraction.status, "completed");
            assert_eq!(again.clauses.len(), 2);
        }

        #[tokio::test]
        #[ignore = "requires TEST_DATABASE_URL"]
        async fn blank_txt_lands_in_failed_state() {
            let state = test_state(vec![]).await;

            let filename = format!("blank-{}.txt", Uuid::new_v4());
            let err = submit(&state, &filename, b"   \n\t  ").await.unwrap_err();
            assert!(matches!(err, AppError::Pipeline(_)));
            assert!(err.to_string().contains("No text could be extracted"));

            // The record is durable and queryable in `failed` state.
            let row: ExtractionRow =
                sqlx::query_as("SELECT * FROM extractions WHERE filename = $1")
                    .bind(&filename)
                    .fetch_one(&state.db)
                    .await
                    .unwrap();
            assert_eq!(row.status, "failed");
            assert!(row
                .error_message
                .as_deref()
                .unwrap()
                .contains("No text could be extracted"));
        }

        #[tokio::test]
        #[ignore = "requires TEST_DATABASE_URL"]
        async fn pagination_returns_disjoint_pages() {
            let state = test_state(vec![candidate(&[("clause_type", "x"), ("content", "y")])])
                .await;

            for i in 0..3 {
                submit(&state, &format!("doc{i}.txt"), b"some contract text")
                    .await
                    .unwrap();
            }

            let first = list_extractions(&state.db, 0, 2).await.unwrap();
            let second = list_extractions(&state.db, 2, 2).await.unwrap();
            assert!(first.total >= 3);
            assert!(first.extractions.len() <= 2);
            let first_ids: Vec<_> = first.extractions.iter().map(|e| e.extraction.id).collect();
            for e in &second.extractions {
                assert!(!first_ids.contains(&e.extraction.id));
            }
        }
    }
}
