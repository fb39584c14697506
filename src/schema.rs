use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::api::{ApiError, QueryBackend};

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Please upload a JSON file ({0})")]
    UnsupportedFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0}")]
    Invalid(String),

    #[error("Failed to upload schema: {}", .0.user_message())]
    Upload(#[source] ApiError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub description: String,
}

/// Table description the translation service needs before it can translate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnInfo>,
}

impl SchemaDefinition {
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.table_name.trim().is_empty() {
            return Err(SchemaError::Invalid(
                "Schema must include a table_name".to_string(),
            ));
        }

        if self.columns.is_empty() {
            return Err(SchemaError::Invalid(
                "Schema must include columns object".to_string(),
            ));
        }

        for (name, column) in &self.columns {
            if column.data_type.trim().is_empty() || column.description.trim().is_empty() {
                return Err(SchemaError::Invalid(format!(
                    "Column {} must have data_type and description",
                    name
                )));
            }
        }

        Ok(())
    }

    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let schema: SchemaDefinition = serde_json::from_str(text)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Reads and validates a schema file.
    pub async fn load(path: &Path) -> Result<Self, SchemaError> {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if !is_json {
            return Err(SchemaError::UnsupportedFile(path.display().to_string()));
        }

        let text = tokio::fs::read_to_string(path).await?;
        Self::from_json(&text)
    }
}

/// Read, validate, then upload a schema file in one awaited sequence.
pub async fn provision_from_file<B: QueryBackend + ?Sized>(
    backend: &B,
    path: &Path,
) -> Result<SchemaDefinition, SchemaError> {
    let schema = SchemaDefinition::load(path).await?;
    backend
        .initialize_schema(&schema)
        .await
        .map_err(SchemaError::Upload)?;

    info!(
        "Schema for table {} uploaded ({} columns)",
        schema.table_name,
        schema.columns.len()
    );
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::ExecuteResponse;
    use crate::session::models::QueryResult;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::io::Write;
    use std::sync::Mutex;

    const CUSTOMERS: &str = r#"{
        "table_name": "customers",
        "columns": {
            "customer_id": {"data_type": "INTEGER", "description": "Unique customer id"},
            "name": {"data_type": "VARCHAR", "description": "Customer name"}
        }
    }"#;

    #[derive(Default)]
    struct RecordingBackend {
        uploaded: Mutex<Vec<SchemaDefinition>>,
        reject_with: Option<String>,
    }

    #[async_trait]
    impl QueryBackend for RecordingBackend {
        async fn translate(&self, _query: &str) -> Result<QueryResult, ApiError> {
            unreachable!("translate is not used here")
        }

        async fn execute(&self, _sql_query: &str) -> Result<ExecuteResponse, ApiError> {
            unreachable!("execute is not used here")
        }

        async fn submit_feedback(&self, _: &QueryResult, _: &str) -> Result<(), ApiError> {
            unreachable!("feedback is not used here")
        }

        async fn initialize_schema(&self, schema: &SchemaDefinition) -> Result<(), ApiError> {
            if let Some(detail) = &self.reject_with {
                return Err(ApiError::Rejected {
                    status: StatusCode::BAD_REQUEST,
                    detail: detail.clone(),
                });
            }
            self.uploaded.lock().unwrap().push(schema.clone());
            Ok(())
        }
    }

    fn json_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn accepts_well_formed_schema() {
        let schema = SchemaDefinition::from_json(CUSTOMERS).unwrap();
        assert_eq!(schema.table_name, "customers");
        assert_eq!(schema.columns.len(), 2);
    }

    #[test]
    fn rejects_missing_table_name() {
        let err = SchemaDefinition::from_json(
            r#"{"columns": {"a": {"data_type": "INT", "description": "a"}}}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Schema must include a table_name");
    }

    #[test]
    fn rejects_column_without_description() {
        let err = SchemaDefinition::from_json(
            r#"{"table_name": "t", "columns": {"amount": {"data_type": "DOUBLE"}}}"#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Column amount must have data_type and description"
        );
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            SchemaDefinition::from_json("{not json"),
            Err(SchemaError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn non_json_files_are_refused_before_reading() {
        let err = SchemaDefinition::load(Path::new("/does/not/exist/schema.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedFile(_)));
    }

    #[tokio::test]
    async fn provisioning_reads_then_uploads() {
        let file = json_file(CUSTOMERS);
        let backend = RecordingBackend::default();

        let schema = provision_from_file(&backend, file.path()).await.unwrap();

        let uploaded = backend.uploaded.lock().unwrap();
        assert_eq!(uploaded.len(), 1);
        assert_eq!(uploaded[0], schema);
    }

    #[tokio::test]
    async fn invalid_schema_is_never_uploaded() {
        let file = json_file(r#"{"table_name": "t", "columns": {}}"#);
        let backend = RecordingBackend::default();

        let err = provision_from_file(&backend, file.path()).await.unwrap_err();

        assert!(matches!(err, SchemaError::Invalid(_)));
        assert!(backend.uploaded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_rejection_is_prefixed() {
        let file = json_file(CUSTOMERS);
        let backend = RecordingBackend {
            reject_with: Some("Unauthorized".to_string()),
            ..Default::default()
        };

        let err = provision_from_file(&backend, file.path()).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to upload schema: Unauthorized");
    }
}
