pub mod client;
pub mod models;

use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use std::sync::LazyLock;

use crate::schema::SchemaDefinition;
use crate::session::models::QueryResult;
use models::{ErrorBody, ExecuteResponse};

/// Shown when a failure carries no structured detail.
pub const GENERIC_FAILURE: &str = "Unable to reach the server";

static MISSING_SCHEMA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bno schema\b|\bschema\b.*\b(not (found|loaded|initiali[sz]ed|uploaded)|missing)\b",
    )
    .expect("missing-schema pattern is valid")
});

#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("connection error: {0}")]
    Transport(String),

    #[error("request rejected ({status}): {detail}")]
    Rejected { status: StatusCode, detail: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("client configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Human-readable detail suitable for showing in the conversation.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Rejected { detail, .. } => detail.clone(),
            ApiError::Transport(_) => GENERIC_FAILURE.to_string(),
            ApiError::Decode(msg) | ApiError::Config(msg) => msg.clone(),
        }
    }

    /// True when the service refused to translate because no schema has been provisioned.
    pub fn is_missing_schema(&self) -> bool {
        match self {
            ApiError::Rejected { detail, .. } => MISSING_SCHEMA.is_match(detail),
            _ => false,
        }
    }
}

/// Turns a non-2xx response body into the detail shown to the user.
pub fn rejection_detail(status: StatusCode, body: &str) -> String {
    let fallback = || format!("Request failed with status {}", status.as_u16());

    // A structured body with a blank detail carries nothing worth showing.
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.detail.into_message().unwrap_or_else(fallback);
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        fallback()
    } else {
        trimmed.to_string()
    }
}

/// The three protocols the session drives, plus schema provisioning.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn translate(&self, query: &str) -> Result<QueryResult, ApiError>;

    async fn execute(&self, sql_query: &str) -> Result<ExecuteResponse, ApiError>;

    async fn submit_feedback(
        &self,
        original: &QueryResult,
        corrected_sql: &str,
    ) -> Result<(), ApiError>;

    async fn initialize_schema(&self, schema: &SchemaDefinition) -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_string_is_used_verbatim() {
        let detail =
            rejection_detail(StatusCode::BAD_REQUEST, r#"{"detail": "Schema not found"}"#);
        assert_eq!(detail, "Schema not found");
    }

    #[test]
    fn validation_lists_are_joined() {
        let body = serde_json::json!({
            "detail": [
                {"loc": ["body", "query"], "msg": "field required"},
                {"msg": "too short"}
            ]
        });
        let detail = rejection_detail(StatusCode::UNPROCESSABLE_ENTITY, &body.to_string());
        assert_eq!(detail, "field required; too short");
    }

    #[test]
    fn empty_body_falls_back_to_status() {
        let detail = rejection_detail(StatusCode::BAD_GATEWAY, "  ");
        assert_eq!(detail, "Request failed with status 502");
    }

    #[test]
    fn blank_detail_falls_back_to_status() {
        for body in [r#"{"detail": ""}"#, r#"{"detail": "   "}"#, r#"{"detail": null}"#] {
            let detail = rejection_detail(StatusCode::BAD_REQUEST, body);
            assert_eq!(detail, "Request failed with status 400", "{body}");
        }
    }

    #[test]
    fn plain_text_body_is_kept() {
        let detail = rejection_detail(StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded\n");
        assert_eq!(detail, "upstream exploded");
    }

    #[test]
    fn transport_errors_use_generic_message() {
        let err = ApiError::Transport("tcp connect error".to_string());
        assert_eq!(err.user_message(), GENERIC_FAILURE);
        assert!(!err.is_missing_schema());
    }

    #[test]
    fn recognises_missing_schema_details() {
        for detail in [
            "Schema not found",
            "No schema loaded. Please upload a schema first.",
            "schema not initialized",
            "Table schema is missing",
        ] {
            let err = ApiError::Rejected {
                status: StatusCode::BAD_REQUEST,
                detail: detail.to_string(),
            };
            assert!(err.is_missing_schema(), "{detail}");
        }

        let other = ApiError::Rejected {
            status: StatusCode::BAD_REQUEST,
            detail: "Invalid SQL syntax near FROM".to_string(),
        };
        assert!(!other.is_missing_schema());
    }
}
