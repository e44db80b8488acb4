//! Unified error types for datalyst.
//!
//! This module provides the error hierarchy for the assistant:
//! - Per-query stage failures ([`StageFailure`]) that are reported to the
//!   caller inside a response rather than raised
//! - Collaborator errors (LLM provider, database driver)
//! - Persistence and configuration errors
//!
//! Only [`Error::Init`] is fatal. Everything else is recoverable at the
//! orchestration level.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ============================================================================
// Main Error Type
// ============================================================================

/// The main error type for datalyst operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The system cannot start (missing schema, missing credentials).
    #[error("initialization: {0}")]
    Init(String),

    /// Configuration error.
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    /// State persistence error.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// Database collaborator error.
    #[error("database: {0}")]
    Database(#[from] DatabaseError),

    /// LLM collaborator error.
    #[error("llm: {0}")]
    Llm(#[from] LlmError),

    /// JSON serialization error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an initialization error.
    #[inline]
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Returns `true` if the system must refuse to continue.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Init(_) | Self::Config(_))
    }
}

/// Result type alias for datalyst operations.
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Pipeline Stages
// ============================================================================

/// Pipeline stage at which a query stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// SQL generation and safety validation.
    Validation,
    /// Execution against the database.
    Execution,
    /// Natural-language interpretation of the result set.
    Interpretation,
}

impl Stage {
    /// Stable lowercase name used in logs, metrics and responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Execution => "execution",
            Self::Interpretation => "interpretation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What went wrong inside a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The safety gate rejected the candidate SQL.
    Rejected,
    /// The SQL-generation collaborator failed.
    Generation,
    /// A collaborator did not answer within the configured timeout.
    Timeout,
    /// The database driver reported an error.
    Execution,
}

/// A terminal failure of a single query.
///
/// Terminal for the query, never for the session. Carried inside the query
/// response so callers can branch on [`stage`](Self::stage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{stage} failed: {message}")]
pub struct StageFailure {
    /// Stage at which the pipeline stopped.
    pub stage: Stage,
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable reason.
    pub message: String,
    /// The SQL involved, when one had been generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

impl StageFailure {
    /// Create a validation-stage failure.
    #[must_use]
    pub fn validation(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            stage: Stage::Validation,
            kind,
            message: message.into(),
            sql: None,
        }
    }

    /// Attach the SQL that was involved.
    #[must_use]
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    /// Create an execution-stage failure for the given SQL.
    #[must_use]
    pub fn execution(
        kind: FailureKind,
        message: impl Into<String>,
        sql: impl Into<String>,
    ) -> Self {
        Self {
            stage: Stage::Execution,
            kind,
            message: message.into(),
            sql: Some(sql.into()),
        }
    }
}

// ============================================================================
// LLM Errors
// ============================================================================

/// Error type for LLM provider operations.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct LlmError {
    /// The error kind.
    pub kind: LlmErrorKind,
    /// The provider name (e.g., "gemini", "mock").
    pub provider: Option<String>,
    /// Additional error message.
    pub message: String,
    /// Optional error code from the provider.
    pub code: Option<String>,
}

/// Categories of LLM errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum LlmErrorKind {
    /// Authentication or authorization failure.
    Auth,
    /// Rate limit exceeded.
    RateLimited,
    /// Network or connection error.
    Network,
    /// HTTP status error.
    HttpStatus,
    /// The response did not contain the expected content.
    ResponseFormat,
    /// Provider-specific error.
    Provider,
    /// Internal error.
    Internal,
}

impl LlmError {
    const fn with_kind(kind: LlmErrorKind, message: String) -> Self {
        Self {
            kind,
            provider: None,
            message,
            code: None,
        }
    }

    /// Create an authentication error.
    #[must_use]
    pub fn auth(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_kind(LlmErrorKind::Auth, message.into()).for_provider(provider)
    }

    /// Create a rate limit error.
    #[must_use]
    pub fn rate_limited(provider: impl Into<String>) -> Self {
        Self::with_kind(
            LlmErrorKind::RateLimited,
            "Rate limit exceeded. Please retry after some time.".into(),
        )
        .for_provider(provider)
    }

    /// Create a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::with_kind(LlmErrorKind::Network, message.into())
    }

    /// Create an HTTP status error.
    #[must_use]
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        let mut err = Self::with_kind(
            LlmErrorKind::HttpStatus,
            format!("HTTP {status}: {}", body.into()),
        );
        err.code = Some(status.to_string());
        err
    }

    /// Create a response format error.
    #[must_use]
    pub fn response_format(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::with_kind(
            LlmErrorKind::ResponseFormat,
            format!("Expected {}, got {}", expected.into(), got.into()),
        )
    }

    /// Create a provider-specific error.
    #[must_use]
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_kind(LlmErrorKind::Provider, message.into()).for_provider(provider)
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_kind(LlmErrorKind::Internal, message.into())
    }

    /// Attach the provider name.
    #[must_use]
    pub fn for_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Check if this is a retryable error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind, LlmErrorKind::RateLimited | LlmErrorKind::Network)
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{provider}] ")?;
        }
        write!(f, "{}", self.message)?;
        if let Some(code) = &self.code {
            write!(f, " (code: {code})")?;
        }
        Ok(())
    }
}

impl std::error::Error for LlmError {}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network("Request timed out")
        } else if err.is_connect() {
            Self::network(format!("Connection failed: {err}"))
        } else {
            Self::network(err.to_string())
        }
    }
}

// ============================================================================
// Database Errors
// ============================================================================

/// Error type for database collaborator operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DatabaseError {
    /// The driver rejected or failed to run the statement.
    #[error("{0}")]
    Query(String),

    /// The database could not be opened.
    #[error("connection: {0}")]
    Connection(String),

    /// The connection lock was poisoned by a panic.
    #[error("lock error: {0}")]
    Lock(String),

    /// The blocking task failed to join.
    #[error("task error: {0}")]
    Task(String),
}

impl DatabaseError {
    /// Create a query error.
    #[inline]
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Create a connection error.
    #[inline]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Query(e.to_string())
    }
}

impl From<tokio::task::JoinError> for DatabaseError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

/// Result type for database operations.
pub type DatabaseResult<T> = std::result::Result<T, DatabaseError>;

// ============================================================================
// Configuration Errors
// ============================================================================

/// Error type for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Missing required setting.
    #[error("missing: {0}")]
    Missing(String),

    /// Invalid value.
    #[error("invalid: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create a missing setting error.
    #[inline]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing(field.into())
    }

    /// Create an invalid value error.
    #[inline]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// ============================================================================
// Storage Errors
// ============================================================================

/// Error type for state persistence (sessions, memory bank, metrics).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// IO error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// The source file does not exist.
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),
}

impl StorageError {
    /// Create a not found error.
    #[inline]
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound(path.into())
    }

    /// Returns `true` if the source was absent. Callers treat this as a no-op.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversions() {
        let err: Error = StorageError::not_found("logs/metrics.json").into();
        assert!(matches!(err, Error::Storage(_)));
        assert!(!err.is_fatal());

        let err: Error = ConfigError::missing("GOOGLE_API_KEY").into();
        assert!(err.is_fatal());
        assert!(Error::init("schema not loaded").is_fatal());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Validation.as_str(), "validation");
        assert_eq!(Stage::Execution.to_string(), "execution");
        assert_eq!(
            serde_json::to_string(&Stage::Interpretation).unwrap(),
            "\"interpretation\""
        );
    }

    #[test]
    fn test_stage_failure_display() {
        let failure = StageFailure::validation(FailureKind::Rejected, "denied keyword: DELETE");
        assert_eq!(failure.to_string(), "validation failed: denied keyword: DELETE");
        assert!(failure.sql.is_none());

        let failure = StageFailure::execution(
            FailureKind::Execution,
            "no such table: x",
            "SELECT * FROM x",
        );
        assert_eq!(failure.sql.as_deref(), Some("SELECT * FROM x"));
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::http_status(500, "boom").for_provider("gemini");
        assert_eq!(err.to_string(), "[gemini] HTTP 500: boom (code: 500)");
        assert!(!err.is_retryable());
        assert!(LlmError::rate_limited("gemini").is_retryable());
    }

    #[test]
    fn test_not_found_is_detectable() {
        assert!(StorageError::not_found("x.json").is_not_found());
        let io = std::io::Error::other("disk full");
        assert!(!StorageError::from(io).is_not_found());
    }
}
