use serde::{Deserialize, Serialize};

use crate::schema::SchemaDefinition;
use crate::session::models::{ExecutionResult, QueryResult};

// Request bodies

#[derive(Debug, Serialize)]
pub struct TranslateRequest<'a> {
    pub query: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ExecuteRequest<'a> {
    pub sql_query: &'a str,
}

#[derive(Debug, Serialize)]
pub struct FeedbackRequest<'a> {
    pub original_query_result: &'a QueryResult,
    pub corrected_sql: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SchemaInitRequest<'a> {
    pub schema: &'a SchemaDefinition,
}

// Response bodies

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteResponse {
    #[serde(default)]
    pub message: String,
    pub result: ExecutionResult,
    #[serde(default)]
    pub timestamp: String,
}

// Error payload returned by the service on rejection
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ErrorDetail {
    Message(String),
    Validation(Vec<ValidationIssue>),
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
pub(crate) struct ValidationIssue {
    pub msg: String,
}

impl ErrorDetail {
    pub(crate) fn into_message(self) -> Option<String> {
        match self {
            ErrorDetail::Message(msg) if msg.trim().is_empty() => None,
            ErrorDetail::Message(msg) => Some(msg.trim().to_string()),
            ErrorDetail::Validation(issues) if !issues.is_empty() => Some(
                issues
                    .into_iter()
                    .map(|issue| issue.msg)
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            ErrorDetail::Validation(_) => None,
            ErrorDetail::Other(serde_json::Value::Null) => None,
            ErrorDetail::Other(value) => Some(value.to_string()),
        }
    }
}
