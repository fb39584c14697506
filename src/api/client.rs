use crate::api::models::{
    ExecuteRequest, ExecuteResponse, FeedbackRequest, SchemaInitRequest, TranslateRequest,
};
use crate::api::{ApiError, QueryBackend, rejection_detail};
use crate::config::{ApiConfig, EndpointConfig};
use crate::schema::SchemaDefinition;
use crate::session::models::QueryResult;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, info};

/// reqwest-backed client for the translation service.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    endpoints: EndpointConfig,
}

impl HttpBackend {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        if config.base_url.trim().is_empty() {
            return Err(ApiError::Config("API base URL is required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.trim().is_empty()),
            endpoints: config.endpoints.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // Posts a JSON body and hands back the successful response, or the rejection detail.
    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!("Request to {} failed: {}", url, e);
            ApiError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = rejection_detail(status, &body);
            error!("{} responded with status {}: {}", url, status, detail);
            return Err(ApiError::Rejected { status, detail });
        }

        Ok(response)
    }

    async fn post_json<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<R, ApiError> {
        let response = self.post(path, body).await?;

        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(format!("Failed to read response body: {}", e)))?;

        serde_json::from_str(&text).map_err(|e| {
            error!("Failed to parse response from {}: {} - Response was: {}", path, e, text);
            ApiError::Decode(format!("Failed to parse response: {}", e))
        })
    }
}

#[async_trait]
impl QueryBackend for HttpBackend {
    async fn translate(&self, query: &str) -> Result<QueryResult, ApiError> {
        info!("Requesting translation");
        let result: QueryResult = self
            .post_json(&self.endpoints.translate, &TranslateRequest { query })
            .await?;
        debug!("Translated SQL: {}", result.sql_query);
        Ok(result)
    }

    async fn execute(&self, sql_query: &str) -> Result<ExecuteResponse, ApiError> {
        info!("Requesting execution of: {}", sql_query);
        self.post_json(&self.endpoints.execute, &ExecuteRequest { sql_query })
            .await
    }

    async fn submit_feedback(
        &self,
        original: &QueryResult,
        corrected_sql: &str,
    ) -> Result<(), ApiError> {
        info!("Submitting feedback");
        let body = FeedbackRequest {
            original_query_result: original,
            corrected_sql,
        };
        self.post(&self.endpoints.feedback, &body).await?;
        Ok(())
    }

    async fn initialize_schema(&self, schema: &SchemaDefinition) -> Result<(), ApiError> {
        info!("Initializing schema for table {}", schema.table_name);
        self.post(&self.endpoints.schema, &SchemaInitRequest { schema })
            .await?;
        Ok(())
    }
}
