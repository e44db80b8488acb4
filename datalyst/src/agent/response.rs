//! Query requests and responses.

use std::time::Duration;

use serde::Serialize;

use crate::database::ResultSet;
use crate::error::{Stage, StageFailure};
use crate::providers::ChartSpec;

/// Interpretation used when the interpreter fails or times out.
pub const INTERPRETATION_FALLBACK: &str = "Results retrieved but interpretation failed.";

/// A question for the analyst.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// The natural-language question.
    pub question: String,
    /// Target session; the analyst's current session when `None`.
    pub session_id: Option<String>,
    /// Ask the interpreter for a chart suggestion.
    pub visualize: bool,
}

impl QueryRequest {
    /// A request in the current session without a chart.
    #[must_use]
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            session_id: None,
            visualize: false,
        }
    }

    /// Route the request to a specific session.
    #[must_use]
    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Request a chart suggestion.
    #[must_use]
    pub const fn with_visualization(mut self, visualize: bool) -> Self {
        self.visualize = visualize;
        self
    }
}

impl From<&str> for QueryRequest {
    fn from(question: &str) -> Self {
        Self::new(question)
    }
}

/// A successful answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    /// The validated statement that was executed.
    pub sql: String,
    /// The result set, absent for statements without columns.
    pub rows: Option<ResultSet>,
    /// Plain-language explanation.
    pub interpretation: String,
    /// `true` when `interpretation` is [`INTERPRETATION_FALLBACK`].
    pub interpretation_fallback: bool,
    /// Suggested chart, when requested and applicable.
    pub visualization: Option<ChartSpec>,
}

impl Answer {
    /// Number of rows returned.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.as_ref().map_or(0, ResultSet::len)
    }
}

/// How a query ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    /// The query was executed; interpretation may have fallen back.
    Answered(Answer),
    /// The query stopped at a failure exit.
    Failed(StageFailure),
}

/// The analyst's reply to a [`QueryRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    /// Session the query ran in.
    pub session_id: String,
    /// The question as asked.
    pub question: String,
    /// Wall-clock time from receipt to response.
    pub response_time: Duration,
    /// Result of the pipeline.
    pub outcome: QueryOutcome,
}

impl QueryResponse {
    /// `true` if the query produced an answer.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, QueryOutcome::Answered(_))
    }

    /// The stage at which a failed query stopped.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match &self.outcome {
            QueryOutcome::Failed(failure) => Some(failure.stage),
            QueryOutcome::Answered(_) => None,
        }
    }

    /// The failure, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<&StageFailure> {
        match &self.outcome {
            QueryOutcome::Failed(failure) => Some(failure),
            QueryOutcome::Answered(_) => None,
        }
    }

    /// The answer, if any.
    #[must_use]
    pub const fn answer(&self) -> Option<&Answer> {
        match &self.outcome {
            QueryOutcome::Answered(answer) => Some(answer),
            QueryOutcome::Failed(_) => None,
        }
    }

    /// The SQL involved, whether or not the query succeeded.
    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        match &self.outcome {
            QueryOutcome::Answered(answer) => Some(&answer.sql),
            QueryOutcome::Failed(failure) => failure.sql.as_deref(),
        }
    }

    /// One-line summary: the interpretation or the failure reason.
    #[must_use]
    pub fn summary(&self) -> String {
        match &self.outcome {
            QueryOutcome::Answered(answer) => answer.interpretation.clone(),
            QueryOutcome::Failed(failure) => failure.to_string(),
        }
    }
}
