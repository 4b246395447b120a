//! Application error type shared by the pipeline, services and stores.

use serde_json::{Value, json};

use crate::infrastructure::cache::CacheError;

/// Error returned by pipeline stages, handlers, repositories and services.
///
/// The first four variants carry a human-readable message plus structured
/// details. The remaining variants describe failures specific to event
/// processing.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String, details: Value },

    #[error("{message}")]
    NotFound { message: String, details: Value },

    #[error("{message}")]
    Conflict { message: String, details: Value },

    #[error("{message}")]
    Internal { message: String, details: Value },

    /// The raw payload of an inbound message could not be parsed.
    #[error("failed to decode message on topic {topic}: {reason}")]
    Decode { topic: String, reason: String },

    /// One or more handlers failed while processing a single envelope.
    #[error("{} handler(s) failed on topic {topic}: {}", .failures.len(), .failures.join("; "))]
    HandlerFailures { topic: String, failures: Vec<String> },

    #[error("messaging error: {0}")]
    Messaging(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn conflict(message: impl Into<String>, details: Value) -> Self {
        Self::Conflict {
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// Stable machine-readable code for logs and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::NotFound { .. } => "not_found",
            AppError::Conflict { .. } => "conflict",
            AppError::Internal { .. } => "internal_error",
            AppError::Decode { .. } => "decode_error",
            AppError::HandlerFailures { .. } => "handler_failure",
            AppError::Messaging(_) => "messaging_error",
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound { .. })
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error()
            && db.is_unique_violation()
        {
            return AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": db.constraint() }),
            );
        }

        AppError::internal("Database error", json!({ "reason": e.to_string() }))
    }
}

impl From<CacheError> for AppError {
    fn from(e: CacheError) -> Self {
        AppError::internal("Cache error", json!({ "reason": e.to_string() }))
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::Messaging(e.to_string())
    }
}
