//! Accuracy evaluation against a fixed question suite.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use datalyst::DataAnalyst;
use datalyst::agent::QueryRequest;
use serde::Serialize;
use tracing::info;

/// One evaluation question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationCase {
    /// What the case exercises.
    pub description: &'static str,
    /// The question asked.
    pub question: &'static str,
    /// Whether the analyst is expected to answer it.
    pub should_succeed: bool,
}

impl EvaluationCase {
    const fn answerable(description: &'static str, question: &'static str) -> Self {
        Self {
            description,
            question,
            should_succeed: true,
        }
    }
}

/// The built-in suite over the sample database.
pub const SAMPLE_CASES: [EvaluationCase; 10] = [
    EvaluationCase::answerable(
        "Basic aggregation - total sales",
        "What is the total revenue from all sales?",
    ),
    EvaluationCase::answerable(
        "Top N query with sorting",
        "Show me the top 5 products by revenue",
    ),
    EvaluationCase::answerable(
        "Grouping by category",
        "What are the total sales by product category?",
    ),
    EvaluationCase::answerable(
        "Join query across tables",
        "Show me customer names and their total order amounts",
    ),
    EvaluationCase::answerable(
        "Date filtering",
        "How many orders were placed in the last 30 days?",
    ),
    EvaluationCase::answerable(
        "Count query",
        "How many customers do we have in each region?",
    ),
    EvaluationCase::answerable("Average calculation", "What is the average order value?"),
    EvaluationCase::answerable(
        "Multiple conditions",
        "Show me all electronics products priced above $100",
    ),
    EvaluationCase::answerable(
        "Regional analysis",
        "Which region has the highest total sales?",
    ),
    EvaluationCase::answerable(
        "Complex join with aggregation",
        "What is the total revenue per customer region?",
    ),
];

/// Outcome of one case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseResult {
    /// 1-based position in the suite.
    pub test_id: usize,
    /// Case description.
    pub description: String,
    /// The question asked.
    pub natural_query: String,
    /// SQL produced, empty if generation failed.
    pub generated_sql: String,
    /// Whether the analyst answered.
    pub success: bool,
    /// Whether it was expected to.
    pub expected_success: bool,
    /// `success == expected_success`.
    pub passed: bool,
    /// Seconds from question to response.
    pub response_time: f64,
    /// Failure message, if any.
    pub error: Option<String>,
    /// Rows in the result set.
    pub rows_returned: usize,
}

/// Aggregate numbers for a suite run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationSummary {
    /// Cases run.
    pub total_tests: usize,
    /// Cases whose outcome matched the expectation.
    pub passed: usize,
    /// Cases whose outcome did not.
    pub failed: usize,
    /// Percentage passed.
    pub accuracy: f64,
    /// Mean seconds per case.
    pub average_response_time: f64,
    /// Seconds for the whole suite.
    pub total_time: f64,
}

impl fmt::Display for EvaluationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "EVALUATION SUMMARY")?;
        writeln!(f, "Total Tests: {}", self.total_tests)?;
        writeln!(f, "Passed: {}", self.passed)?;
        writeln!(f, "Failed: {}", self.failed)?;
        writeln!(f, "Accuracy: {:.1}%", self.accuracy)?;
        write!(f, "Average Response Time: {:.2}s", self.average_response_time)
    }
}

#[derive(Serialize)]
struct ResultsFile<'a> {
    test_results: &'a [CaseResult],
    timestamp: DateTime<Utc>,
}

/// Runs cases through an analyst and keeps the per-case results.
#[derive(Debug)]
pub struct Evaluator<'a> {
    analyst: &'a mut DataAnalyst,
    results: Vec<CaseResult>,
}

impl<'a> Evaluator<'a> {
    /// Evaluate with `analyst`.
    pub const fn new(analyst: &'a mut DataAnalyst) -> Self {
        Self {
            analyst,
            results: Vec::new(),
        }
    }

    /// Results collected so far.
    #[must_use]
    pub fn results(&self) -> &[CaseResult] {
        &self.results
    }

    /// Run every case in order.
    ///
    /// # Errors
    ///
    /// Returns an error only when the analyst has no schema loaded.
    pub async fn run(&mut self, cases: &[EvaluationCase]) -> datalyst::Result<EvaluationSummary> {
        let mut total_time = 0.0;
        let mut passed = 0;

        for (index, case) in cases.iter().enumerate() {
            let response = self.analyst.query(QueryRequest::new(case.question)).await?;
            let elapsed = response.response_time.as_secs_f64();
            total_time += elapsed;

            let success = response.is_success();
            let ok = success == case.should_succeed;
            if ok {
                passed += 1;
            }

            info!(
                test_id = index + 1,
                description = case.description,
                passed = ok,
                response_time = elapsed,
                "evaluation_case_finished"
            );

            self.results.push(CaseResult {
                test_id: index + 1,
                description: case.description.to_owned(),
                natural_query: case.question.to_owned(),
                generated_sql: response.sql().unwrap_or_default().to_owned(),
                success,
                expected_success: case.should_succeed,
                passed: ok,
                response_time: elapsed,
                error: response.failure().map(|f| f.message.clone()),
                rows_returned: response.answer().map_or(0, |a| a.row_count()),
            });
        }

        let total = cases.len();
        let (accuracy, average_response_time) = if total == 0 {
            (0.0, 0.0)
        } else {
            (
                passed as f64 / total as f64 * 100.0,
                total_time / total as f64,
            )
        };

        Ok(EvaluationSummary {
            total_tests: total,
            passed,
            failed: total - passed,
            accuracy,
            average_response_time,
            total_time,
        })
    }

    /// Write the per-case results as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, path: &Path) -> datalyst::Result<()> {
        let file = ResultsFile {
            test_results: &self.results,
            timestamp: Utc::now(),
        };
        datalyst::state::write_json(path, &file).await?;
        info!(path = %path.display(), "evaluation_results_saved");
        Ok(())
    }
}
