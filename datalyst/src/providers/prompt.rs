//! Prompt templates for the SQL-generation and interpretation calls.

use crate::database::{DatabaseSchema, ResultSet};

/// Rows included in the interpretation prompt.
pub const SAMPLE_ROWS: usize = 5;

/// Answer given for an absent or empty result set.
pub const NO_RESULTS: &str = "No results found for your query.";

/// Build the SQL-generation prompt.
#[must_use]
pub fn sql_generation(question: &str, schema: &DatabaseSchema, context: &str) -> String {
    let context = if context.is_empty() {
        "No previous context"
    } else {
        context
    };

    format!(
        "You are an expert SQL query generator. Convert the natural language query to a valid SQL SELECT query.

Database Schema:
{schema}

Previous Context:
{context}

User Query: {question}

Rules:
1. Generate ONLY SELECT queries (no INSERT, UPDATE, DELETE, DROP, etc.)
2. Use proper JOIN syntax when querying multiple tables
3. Include appropriate WHERE clauses for filtering
4. Use aggregate functions (COUNT, SUM, AVG, etc.) when asked for totals or averages
5. Add ORDER BY and LIMIT clauses when appropriate
6. Return ONLY the SQL query without any explanation or markdown

SQL Query:",
        schema = schema.render(),
    )
}

/// Build the interpretation prompt for a non-empty result set.
#[must_use]
pub fn interpretation(question: &str, sql: &str, rows: &ResultSet) -> String {
    format!(
        "You are a data analyst assistant. Analyze the query results and provide clear, concise insights.

User's Question: {question}

SQL Query: {sql}

Results Summary:
{summary}

Sample Data (first {SAMPLE_ROWS} rows):
{sample}

Provide a clear, natural language interpretation that:
1. Answers the user's question directly
2. Highlights key findings from the data
3. Mentions any interesting patterns or outliers
4. Keeps the response concise (2-4 sentences)

Interpretation:",
        summary = rows.summary(),
        sample = rows.preview(SAMPLE_ROWS),
    )
}
