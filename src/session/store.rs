use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

use crate::session::models::QueryResult;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("the message store is empty")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// A translation that did not produce a result.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationFailure {
    pub natural_language_query: String,
    pub message: String,
    pub missing_schema: bool,
    pub timestamp: String,
}

impl TranslationFailure {
    /// Result-shaped view of the failure, with the error text in place of SQL.
    pub fn degraded_result(&self) -> QueryResult {
        QueryResult {
            natural_language_query: self.natural_language_query.clone(),
            english_translation: String::new(),
            sql_query: format!("Error: {}", self.message),
            relevant_columns: BTreeMap::new(),
            execution_time_seconds: 0.0,
            timestamp: self.timestamp.clone(),
            execution_result: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssistantPayload {
    Result(QueryResult),
    Failure(TranslationFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    User(String),
    Assistant(AssistantPayload),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub payload: Payload,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::User,
            payload: Payload::User(text.into()),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(id: MessageId, payload: AssistantPayload) -> Self {
        Self {
            id,
            role: Role::Assistant,
            payload: Payload::Assistant(payload),
            created_at: Utc::now(),
        }
    }

    /// The successful translation carried by this message, if any.
    pub fn result(&self) -> Option<&QueryResult> {
        match &self.payload {
            Payload::Assistant(AssistantPayload::Result(result)) => Some(result),
            _ => None,
        }
    }

    pub fn result_mut(&mut self) -> Option<&mut QueryResult> {
        match &mut self.payload {
            Payload::Assistant(AssistantPayload::Result(result)) => Some(result),
            _ => None,
        }
    }

    /// Single-shape view for rendering: the real result or the degraded failure.
    pub fn query_result(&self) -> Option<QueryResult> {
        match &self.payload {
            Payload::Assistant(AssistantPayload::Result(result)) => Some(result.clone()),
            Payload::Assistant(AssistantPayload::Failure(failure)) => {
                Some(failure.degraded_result())
            }
            Payload::User(_) => None,
        }
    }
}

/// Ordered conversation history. Append-only apart from `replace_last`.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn replace_last(&mut self, message: Message) -> Result<(), StoreError> {
        let last = self.messages.last_mut().ok_or(StoreError::Empty)?;
        *last = message;
        Ok(())
    }

    /// Owned snapshot; later mutations do not affect it.
    pub fn all(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
