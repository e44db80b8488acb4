//! Text rendering of analyst output.

use std::collections::VecDeque;
use std::fmt::Write as _;

use datalyst::agent::{QueryOutcome, QueryResponse};
use datalyst::database::{DatabaseSchema, ResultSet};
use datalyst::session::Message;
use datalyst::telemetry::clip;

/// Rows shown before the remainder is summarised.
pub const DISPLAY_ROWS: usize = 10;

/// Longest message shown in full by [`history`].
const HISTORY_PREVIEW_CHARS: usize = 100;

/// Render up to `limit` rows with a footer for the rest.
#[must_use]
pub fn rows(rows: Option<&ResultSet>, limit: usize) -> String {
    let Some(rows) = rows.filter(|r| !r.is_empty()) else {
        return "No results".to_owned();
    };

    let mut out = rows.preview(limit);
    if rows.len() > limit {
        let _ = write!(out, "\n... and {} more rows", rows.len() - limit);
    }
    out
}

/// Render a query response the way the chat loop prints it.
#[must_use]
pub fn response(response: &QueryResponse) -> String {
    match &response.outcome {
        QueryOutcome::Answered(answer) => {
            let mut out = format!(
                "Generated SQL:\n   {}\n\nResults ({:.2}s):\n{}\n\nInterpretation:\n   {}",
                answer.sql,
                response.response_time.as_secs_f64(),
                rows(answer.rows.as_ref(), DISPLAY_ROWS),
                answer.interpretation,
            );
            if let Some(chart) = &answer.visualization {
                let _ = write!(out, "\n\nSuggested chart: {chart}");
            }
            out
        }
        QueryOutcome::Failed(failure) => {
            let mut out = format!("Error at {} stage:\n   {}", failure.stage, failure.message);
            if let Some(sql) = &failure.sql {
                let _ = write!(out, "\n   SQL: {sql}");
            }
            out
        }
    }
}

/// Render the schema as an indented table list.
#[must_use]
pub fn schema(schema: &DatabaseSchema) -> String {
    let mut out = String::from("Database Schema:");
    for (table, columns) in schema.tables() {
        let _ = write!(out, "\n\n  Table: {table}");
        for column in columns {
            let _ = write!(out, "\n    - {} ({})", column.name, column.data_type);
        }
    }
    out
}

/// Render a conversation history, clipping long messages.
#[must_use]
pub fn history(messages: &VecDeque<Message>) -> String {
    if messages.is_empty() {
        return "Conversation History: (empty)".to_owned();
    }

    let mut out = String::from("Conversation History:");
    for message in messages {
        let content = clip(&message.content, HISTORY_PREVIEW_CHARS);
        let ellipsis = if content.len() < message.content.len() { "..." } else { "" };
        let _ = write!(out, "\n  {}: {content}{ellipsis}", message.role.label());
    }
    out
}
