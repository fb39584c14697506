use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Structured outcome of translating a natural-language query.
// Field names on the wire follow the translation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(rename = "malay_query")]
    pub natural_language_query: String,
    pub english_translation: String,
    pub sql_query: String,
    #[serde(default)]
    pub relevant_columns: BTreeMap<String, String>,
    #[serde(rename = "execution_time", default)]
    pub execution_time_seconds: f64,
    pub timestamp: String,
    // Absent until the SQL has been run explicitly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_result: Option<ExecutionResult>,
}

// Outcome of running a statement against the service's data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: String,
    #[serde(default)]
    pub rows: Vec<serde_json::Value>,
    #[serde(default)]
    pub rows_affected: i64,
    #[serde(rename = "execution_time", default)]
    pub execution_time_seconds: f64,
    pub query_type: String,
}

impl ExecutionResult {
    pub fn is_select(&self) -> bool {
        self.query_type.eq_ignore_ascii_case("SELECT")
    }
}
