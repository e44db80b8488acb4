//! Query metrics and tracing helpers.
//!
//! Every orchestrated query feeds one outcome into the
//! [`MetricsAccumulator`] owned by the analyst. The accumulator is a plain
//! value: it is initialised with [`MetricsAccumulator::new`], read with
//! [`snapshot`](MetricsAccumulator::snapshot) and cleared with
//! [`reset`](MetricsAccumulator::reset). Nothing is global.
//!
//! Structured events go through the `tracing` crate, so any subscriber
//! (plain `fmt`, JSON, OpenTelemetry) can be attached by the host.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{Span, info, info_span};

use crate::error::{Stage, StorageResult};
use crate::state;

/// Counter set describing query outcomes.
///
/// `average_response_time` is derived from `total_response_time /
/// queries_processed` and is kept in the struct so the persisted file
/// carries it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSnapshot {
    /// Queries seen.
    pub queries_processed: u64,
    /// Queries that produced an answer.
    pub successful_queries: u64,
    /// Queries that stopped at a failure exit.
    pub failed_queries: u64,
    /// Failures at the validation stage.
    pub validation_errors: u64,
    /// Failures at the execution stage.
    pub execution_errors: u64,
    /// Mean wall-clock seconds per query.
    pub average_response_time: f64,
    /// Summed wall-clock seconds.
    pub total_response_time: f64,
}

impl MetricsSnapshot {
    /// Fraction of processed queries that succeeded, if any were processed.
    #[must_use]
    pub fn success_rate(&self) -> Option<f64> {
        (self.queries_processed > 0)
            .then(|| self.successful_queries as f64 / self.queries_processed as f64)
    }

    fn recompute_average(&mut self) {
        self.average_response_time = if self.queries_processed > 0 {
            self.total_response_time / self.queries_processed as f64
        } else {
            0.0
        };
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Query Metrics")?;
        writeln!(f, "  Processed:         {}", self.queries_processed)?;
        writeln!(f, "  Successful:        {}", self.successful_queries)?;
        writeln!(f, "  Failed:            {}", self.failed_queries)?;
        writeln!(f, "  Validation errors: {}", self.validation_errors)?;
        writeln!(f, "  Execution errors:  {}", self.execution_errors)?;
        writeln!(f, "  Avg response:      {:.2}s", self.average_response_time)?;
        write!(f, "  Total response:    {:.2}s", self.total_response_time)
    }
}

/// Accumulates query outcomes for the lifetime of an analyst.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsAccumulator {
    metrics: MetricsSnapshot,
}

impl MetricsAccumulator {
    /// Create a zeroed accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished query.
    ///
    /// `failed_at` is the stage that stopped a failed query; it is ignored
    /// for successes.
    pub fn record_query(&mut self, success: bool, elapsed: Duration, failed_at: Option<Stage>) {
        let m = &mut self.metrics;
        m.queries_processed += 1;
        m.total_response_time += elapsed.as_secs_f64();
        m.recompute_average();

        if success {
            m.successful_queries += 1;
        } else {
            m.failed_queries += 1;
            match failed_at {
                Some(Stage::Validation) => m.validation_errors += 1,
                Some(Stage::Execution) => m.execution_errors += 1,
                Some(Stage::Interpretation) | None => {}
            }
        }

        info!(
            success,
            response_time = elapsed.as_secs_f64(),
            error_type = failed_at.map(Stage::as_str),
            total_queries = m.queries_processed,
            "metrics_recorded"
        );
    }

    /// Copy of the current counters.
    #[must_use]
    pub const fn snapshot(&self) -> MetricsSnapshot {
        self.metrics
    }

    /// Zero every counter.
    pub fn reset(&mut self) {
        self.metrics = MetricsSnapshot::default();
        info!("metrics_reset");
    }

    /// Write the counters to `destination`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`](crate::error::StorageError) if the file
    /// cannot be written.
    pub async fn persist(&self, destination: &Path) -> StorageResult<()> {
        state::write_json(destination, &self.metrics).await?;
        info!(path = %destination.display(), "metrics_saved");
        Ok(())
    }

    /// Replace the counters with those stored at `source`.
    ///
    /// The average is recomputed from the stored totals.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`](crate::error::StorageError::NotFound)
    /// when the file is absent.
    pub async fn restore(&mut self, source: &Path) -> StorageResult<()> {
        let mut metrics: MetricsSnapshot = state::read_json(source).await?;
        metrics.recompute_average();
        self.metrics = metrics;
        info!(path = %source.display(), "metrics_restored");
        Ok(())
    }
}

/// Wall-clock timer for a single query.
#[derive(Debug, Clone, Copy)]
pub struct QueryTimer {
    start: Instant,
}

impl Default for QueryTimer {
    fn default() -> Self {
        Self::start()
    }
}

impl QueryTimer {
    /// Start timing now.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Time since the query was received.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Create a span for an orchestrated query.
    #[must_use]
    pub fn query_span(session_id: &str, question: &str) -> Span {
        info_span!("analyst_query", session_id = %session_id, question = %clip(question, 100))
    }
}

/// Truncate `text` to at most `max_chars` characters for logging.
#[must_use]
pub fn clip(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(end, _)| &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;

    #[test]
    fn test_record_query() {
        let mut acc = MetricsAccumulator::new();
        acc.record_query(true, Duration::from_millis(1500), None);
        acc.record_query(false, Duration::from_millis(500), Some(Stage::Validation));
        acc.record_query(false, Duration::from_millis(1000), Some(Stage::Execution));

        let m = acc.snapshot();
        assert_eq!(m.queries_processed, 3);
        assert_eq!(m.successful_queries, 1);
        assert_eq!(m.failed_queries, 2);
        assert_eq!(m.validation_errors, 1);
        assert_eq!(m.execution_errors, 1);
        assert!((m.total_response_time - 3.0).abs() < 1e-9);
        assert!((m.average_response_time - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_guarded_when_empty() {
        let acc = MetricsAccumulator::new();
        assert!(acc.snapshot().average_response_time.abs() < f64::EPSILON);
        assert!(acc.snapshot().success_rate().is_none());
    }

    #[test]
    fn test_reset() {
        let mut acc = MetricsAccumulator::new();
        acc.record_query(true, Duration::from_secs(1), None);
        acc.reset();
        assert_eq!(acc.snapshot(), MetricsSnapshot::default());
    }

    #[tokio::test]
    async fn test_persist_restore() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.json");

        let mut acc = MetricsAccumulator::new();
        acc.record_query(true, Duration::from_secs(2), None);
        acc.record_query(false, Duration::from_secs(1), Some(Stage::Execution));
        acc.persist(&path).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(raw["queries_processed"], 2);
        assert_eq!(raw["execution_errors"], 1);

        let mut restored = MetricsAccumulator::new();
        restored.restore(&path).await.unwrap();
        assert_eq!(restored.snapshot(), acc.snapshot());
    }

    #[tokio::test]
    async fn test_restore_recomputes_average() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.json");
        tokio::fs::write(
            &path,
            r#"{"queries_processed": 4, "total_response_time": 2.0, "average_response_time": 99.0}"#,
        )
        .await
        .unwrap();

        let mut acc = MetricsAccumulator::new();
        acc.restore(&path).await.unwrap();
        assert!((acc.snapshot().average_response_time - 0.5).abs() < 1e-9);
        assert_eq!(acc.snapshot().failed_queries, 0);
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("hello", 10), "hello");
        assert_eq!(clip("hello", 3), "hel");
        assert_eq!(clip("héllo", 2), "hé");
    }

    #[test]
    fn test_timer() {
        let timer = QueryTimer::start();
        assert!(timer.elapsed() < Duration::from_secs(5));
    }
}
