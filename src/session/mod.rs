pub mod models;
pub mod store;

use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, QueryBackend};
use crate::schema::{self, SchemaDefinition, SchemaError};
use models::{ExecutionResult, QueryResult};
use store::{AssistantPayload, Message, MessageId, MessageStore, TranslationFailure};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("there is no query result to execute")]
    NoActiveResult,

    #[error("a translation is already in progress")]
    TranslationInFlight,

    #[error("message {0} is no longer the latest result; execution result discarded")]
    StaleTarget(MessageId),

    #[error("{}", .0.user_message())]
    Backend(#[source] ApiError),
}

// Clears the translate flag however the request ends, including when the future is dropped.
struct PendingGuard<'a>(&'a AtomicBool);

impl<'a> PendingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct ExecutingGuard<'a>(&'a AtomicUsize);

impl<'a> ExecutingGuard<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::AcqRel);
        Self(count)
    }
}

impl Drop for ExecutingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Owns one conversation and reconciles translate, execute and feedback
/// round-trips into its message history.
///
/// Only one translation may be in flight; a second `submit_query` while one is
/// pending is rejected with [`SessionError::TranslationInFlight`]. Executions
/// target the tail result at the moment they are issued and are discarded if a
/// newer message has been appended by the time they complete.
pub struct QuerySessionManager<B> {
    backend: B,
    store: RwLock<MessageStore>,
    next_id: AtomicU64,
    pending: AtomicBool,
    executing: AtomicUsize,
}

impl<B: QueryBackend> QuerySessionManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            store: RwLock::new(MessageStore::new()),
            next_id: AtomicU64::new(1),
            pending: AtomicBool::new(false),
            executing: AtomicUsize::new(0),
        }
    }

    fn allocate_id(&self) -> MessageId {
        MessageId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// True while a translate request is in flight.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// True while at least one execute request is in flight.
    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::Acquire) > 0
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.store.read().await.all()
    }

    /// The result carried by the latest message, if that message is a successful translation.
    pub async fn last_result(&self) -> Option<QueryResult> {
        self.store.read().await.last().and_then(Message::result).cloned()
    }

    pub async fn submit_query(&self, text: &str) -> Result<(), SessionError> {
        if text.trim().is_empty() {
            debug!("Ignoring blank query");
            return Ok(());
        }

        let _pending = PendingGuard::acquire(&self.pending).ok_or_else(|| {
            warn!("Rejected query while another translation is pending");
            SessionError::TranslationInFlight
        })?;

        self.store
            .write()
            .await
            .append(Message::user(self.allocate_id(), text));

        info!("Translating query: {}", text);
        let payload = match self.backend.translate(text).await {
            Ok(result) => {
                info!("Translation succeeded: {}", result.sql_query);
                AssistantPayload::Result(result)
            }
            Err(err) => {
                error!("Translation failed: {}", err);
                AssistantPayload::Failure(TranslationFailure {
                    natural_language_query: text.to_string(),
                    message: err.user_message(),
                    missing_schema: err.is_missing_schema(),
                    timestamp: Utc::now().to_rfc3339(),
                })
            }
        };

        self.store
            .write()
            .await
            .append(Message::assistant(self.allocate_id(), payload));

        Ok(())
    }

    pub async fn execute_sql(&self, sql_query: &str) -> Result<ExecutionResult, SessionError> {
        let target = {
            let store = self.store.read().await;
            match store.last() {
                Some(message) if message.result().is_some() => message.id,
                _ => return Err(SessionError::NoActiveResult),
            }
        };

        let _executing = ExecutingGuard::enter(&self.executing);

        info!("Executing SQL for message {}: {}", target, sql_query);
        let response = self.backend.execute(sql_query).await.map_err(|err| {
            error!("Execution failed: {}", err);
            SessionError::Backend(err)
        })?;

        let mut store = self.store.write().await;
        let mut updated = match store.last() {
            Some(message) if message.id == target => message.clone(),
            _ => {
                warn!("Message {} is no longer the latest; dropping execution result", target);
                return Err(SessionError::StaleTarget(target));
            }
        };

        let Some(result) = updated.result_mut() else {
            return Err(SessionError::StaleTarget(target));
        };
        result.execution_result = Some(response.result.clone());
        store
            .replace_last(updated)
            .map_err(|_| SessionError::StaleTarget(target))?;

        info!(
            "{} ({} rows affected)",
            response.message, response.result.rows_affected
        );
        Ok(response.result)
    }

    /// Sends a correction for `original`. A missing or blank correction confirms the original SQL.
    pub async fn submit_feedback(
        &self,
        original: &QueryResult,
        corrected_sql: Option<&str>,
    ) -> Result<(), SessionError> {
        let corrected = corrected_sql
            .filter(|sql| !sql.trim().is_empty())
            .unwrap_or(&original.sql_query);

        self.backend
            .submit_feedback(original, corrected)
            .await
            .map_err(|err| {
                error!("Feedback submission failed: {}", err);
                SessionError::Backend(err)
            })?;

        info!("Feedback recorded");
        Ok(())
    }

    pub async fn provision_schema(&self, schema: &SchemaDefinition) -> Result<(), SchemaError> {
        schema.validate()?;
        self.backend
            .initialize_schema(schema)
            .await
            .map_err(SchemaError::Upload)
    }

    pub async fn provision_schema_file(
        &self,
        path: &Path,
    ) -> Result<SchemaDefinition, SchemaError> {
        schema::provision_from_file(&self.backend, path).await
    }
}
