//! Clause Interpreter — the single point of entry for all model calls.
//!
//! Sends extracted contract text to the OpenAI chat-completions API with a
//! fixed instruction template and parses the reply defensively into clause
//! objects. Call failures are terminal; nothing is retried here.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

pub mod prompts;

use self::prompts::{CLAUSE_EXTRACTION_PROMPT, CLAUSE_EXTRACTION_SYSTEM};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
/// Cost-effective model for contract analysis.
pub const MODEL: &str = "gpt-4o-mini";
/// Low temperature for consistent, factual extraction.
const TEMPERATURE: f32 = 0.1;
/// Allow for detailed extraction.
const MAX_TOKENS: u32 = 4000;

/// One clause as returned by the model. Keys beyond the defaulted ones are
/// passed through untouched; `clause_type` and `content` may be absent.
pub type ClauseObject = serde_json::Map<String, Value>;

#[derive(Debug, Error)]
pub enum InterpretError {
    #[error("Failed to extract clauses: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to extract clauses: API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to extract clauses: model returned empty content")]
    EmptyContent,

    #[error("No JSON array found in response")]
    ResponseFormat,

    #[error("Invalid JSON in LLM response: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Response is not a JSON array")]
    NotAnArray,
}

/// Converts full document text into an ordered sequence of clause objects.
/// Implemented against a trait so the pipeline can be exercised with a stub.
#[async_trait]
pub trait ClauseInterpreter: Send + Sync {
    async fn extract_clauses(&self, document_text: &str)
        -> Result<Vec<ClauseObject>, InterpretError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

/// Production interpreter backed by the OpenAI API.
#[derive(Clone)]
pub struct OpenAiInterpreter {
    client: Client,
    api_key: String,
}

impl OpenAiInterpreter {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl ClauseInterpreter for OpenAiInterpreter {
    async fn extract_clauses(
        &self,
        document_text: &str,
    ) -> Result<Vec<ClauseObject>, InterpretError> {
        let user_prompt = CLAUSE_EXTRACTION_PROMPT.replace("{document_text}", document_text);

        info!(
            "Sending contract to LLM for clause extraction (text length: {} chars)",
            document_text.len()
        );

        let request_body = ChatRequest {
            model: MODEL,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: CLAUSE_EXTRACTION_SYSTEM,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(InterpretError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;
        let reply = chat
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(InterpretError::EmptyContent)?;

        info!("Received LLM response: {} characters", reply.len());

        let clauses = parse_clause_response(reply)?;

        info!(
            "Successfully extracted {} clauses from contract",
            clauses.len()
        );

        Ok(clauses)
    }
}

/// Parses a model reply into clause objects without trusting its shape.
///
/// The candidate payload is the substring from the first `[` to the last `]`
/// (models sometimes wrap the array in prose or code fences). Non-object
/// array entries are skipped with a warning. A missing `summary` defaults to
/// the empty string and a missing `title` to `"Clause {n}"`, where `n` is the
/// 1-based position in the original array, before any entries were skipped.
/// `clause_type` and `content` are left exactly as received.
pub fn parse_clause_response(response_text: &str) -> Result<Vec<ClauseObject>, InterpretError> {
    let start = response_text.find('[').ok_or(InterpretError::ResponseFormat)?;
    let end = response_text.rfind(']').ok_or(InterpretError::ResponseFormat)?;
    let payload = if start <= end {
        &response_text[start..=end]
    } else {
        ""
    };

    let parsed: Value = serde_json::from_str(payload)?;
    validate_clause_entries(parsed)
}

/// Step applied after JSON decoding: the value must be an array, and each
/// element is defaulted or skipped as described on [`parse_clause_response`].
fn validate_clause_entries(parsed: Value) -> Result<Vec<ClauseObject>, InterpretError> {
    let Value::Array(entries) = parsed else {
        return Err(InterpretError::NotAnArray);
    };

    let mut clauses = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.into_iter().enumerate() {
        let Value::Object(mut clause) = entry else {
            warn!("Skipping clause {idx}: not a JSON object");
            continue;
        };

        clause
            .entry("summary")
            .or_insert_with(|| Value::String(String::new()));
        clause
            .entry("title")
            .or_insert_with(|| Value::String(format!("Clause {}", idx + 1)));

        clauses.push(clause);
    }

    Ok(clauses)
}
