//! Scripted model for tests and offline runs.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::prompt::NO_RESULTS;
use super::{ResultInterpreter, SqlGenerator};
use crate::database::{DatabaseSchema, ResultSet};
use crate::error::LlmError;

/// A scripted [`SqlGenerator`] and [`ResultInterpreter`].
///
/// Cloned handles share call counters and the recorded contexts.
///
/// ```rust,ignore
/// let model = MockModel::new()
///     .with_sql("SELECT SUM(total_price) FROM sales")
///     .with_interpretation("Total revenue is 42.");
/// ```
#[derive(Debug, Clone)]
pub struct MockModel {
    sql: Result<String, String>,
    interpretation: Result<String, String>,
    delay: Option<Duration>,
    interpret_delay: Option<Duration>,
    generate_calls: Arc<AtomicUsize>,
    interpret_calls: Arc<AtomicUsize>,
    contexts: Arc<Mutex<Vec<String>>>,
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockModel {
    /// A model answering `SELECT 1` with a fixed interpretation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sql: Ok("SELECT 1".to_owned()),
            interpretation: Ok("Mock interpretation.".to_owned()),
            delay: None,
            interpret_delay: None,
            generate_calls: Arc::new(AtomicUsize::new(0)),
            interpret_calls: Arc::new(AtomicUsize::new(0)),
            contexts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Return `sql` from every generation call.
    #[must_use]
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Ok(sql.into());
        self
    }

    /// Fail every generation call with `message`.
    #[must_use]
    pub fn failing_generation(mut self, message: impl Into<String>) -> Self {
        self.sql = Err(message.into());
        self
    }

    /// Return `text` from every interpretation of a non-empty result.
    #[must_use]
    pub fn with_interpretation(mut self, text: impl Into<String>) -> Self {
        self.interpretation = Ok(text.into());
        self
    }

    /// Fail every interpretation call with `message`.
    #[must_use]
    pub fn failing_interpretation(mut self, message: impl Into<String>) -> Self {
        self.interpretation = Err(message.into());
        self
    }

    /// Sleep before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sleep before interpreting only; generation stays immediate unless
    /// [`MockModel::with_delay`] is also set.
    #[must_use]
    pub const fn with_interpretation_delay(mut self, delay: Duration) -> Self {
        self.interpret_delay = Some(delay);
        self
    }

    /// Number of generation calls made.
    #[must_use]
    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    /// Number of interpretation calls made.
    #[must_use]
    pub fn interpret_calls(&self) -> usize {
        self.interpret_calls.load(Ordering::SeqCst)
    }

    /// Conversation contexts received by the generator, in call order.
    #[must_use]
    pub fn contexts(&self) -> Vec<String> {
        self.contexts
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    async fn pause(delay: Option<Duration>) {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SqlGenerator for MockModel {
    async fn generate_sql(
        &self,
        _question: &str,
        _schema: &DatabaseSchema,
        context: &str,
    ) -> Result<String, LlmError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut contexts) = self.contexts.lock() {
            contexts.push(context.to_owned());
        }
        Self::pause(self.delay).await;
        self.sql
            .clone()
            .map_err(|message| LlmError::provider("mock", message))
    }
}

#[async_trait]
impl ResultInterpreter for MockModel {
    async fn interpret(
        &self,
        _question: &str,
        _sql: &str,
        rows: Option<&ResultSet>,
    ) -> Result<String, LlmError> {
        self.interpret_calls.fetch_add(1, Ordering::SeqCst);
        Self::pause(self.interpret_delay.or(self.delay)).await;
        if rows.is_none_or(ResultSet::is_empty) {
            return Ok(NO_RESULTS.to_owned());
        }
        self.interpretation
            .clone()
            .map_err(|message| LlmError::provider("mock", message))
    }
}
