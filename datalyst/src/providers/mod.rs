//! Language-model collaborators.
//!
//! The orchestrator needs two things from a language model:
//!
//! - [`SqlGenerator`]: turn a question, the schema and the recent
//!   conversation into one SQL statement
//! - [`ResultInterpreter`]: explain a result set in plain language and
//!   optionally suggest a chart
//!
//! [`gemini::GeminiModel`] implements both against the Gemini REST API and
//! [`mock::MockModel`] implements both with scripted responses.

pub mod chart;
pub mod gemini;
pub mod mock;
pub mod prompt;

pub use chart::{ChartKind, ChartSpec};
pub use gemini::{GeminiClient, GeminiModel};
pub use mock::MockModel;

use async_trait::async_trait;

use crate::database::{DatabaseSchema, ResultSet};
use crate::error::LlmError;

/// Produces candidate SQL for a question.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    /// Generate a single SQL statement.
    ///
    /// The statement may be wrapped in a Markdown code fence; the caller
    /// strips it before validation.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] when the model cannot be reached or returns no
    /// text.
    async fn generate_sql(
        &self,
        question: &str,
        schema: &DatabaseSchema,
        context: &str,
    ) -> Result<String, LlmError>;
}

/// Explains query results.
#[async_trait]
pub trait ResultInterpreter: Send + Sync {
    /// Describe `rows` as an answer to `question`.
    ///
    /// `rows` is `None` when the statement produced no result set.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] on model failure; the orchestrator replaces the
    /// text with a fixed fallback.
    async fn interpret(
        &self,
        question: &str,
        sql: &str,
        rows: Option<&ResultSet>,
    ) -> Result<String, LlmError>;

    /// Suggest a chart for a non-empty result set.
    fn visualize(&self, rows: &ResultSet) -> Option<ChartSpec> {
        ChartSpec::suggest(rows)
    }
}
