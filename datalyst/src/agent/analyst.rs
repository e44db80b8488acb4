//! The data analyst orchestrator.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{Instrument, debug, info, warn};
use uuid::Uuid;

use super::response::{Answer, INTERPRETATION_FALLBACK, QueryOutcome, QueryRequest, QueryResponse};
use super::sql::strip_code_fence;
use crate::config::AnalystConfig;
use crate::database::{Database, DatabaseSchema, ResultSet};
use crate::error::{Error, FailureKind, Result, Stage, StageFailure, StorageResult};
use crate::guardrail::SqlGuardrail;
use crate::memory::MemoryBank;
use crate::providers::{ResultInterpreter, SqlGenerator};
use crate::session::{Message, Role, SessionStore};
use crate::telemetry::{MetricsAccumulator, MetricsSnapshot, QueryTimer, clip};

/// Session history file inside the state directory.
pub const SESSION_FILE: &str = "session_state.json";
/// Memory bank file inside the state directory.
pub const MEMORY_FILE: &str = "memory_bank.json";
/// Metrics file inside the state directory.
pub const METRICS_FILE: &str = "metrics.json";

/// Orchestrates generation, validation, execution and interpretation.
///
/// Each query moves through `Received → Validated → Executed → Interpreted`
/// or leaves at the validation or execution failure exit. Failures end the
/// query, never the session.
///
/// Queries take `&mut self` and run to completion one at a time. A host
/// serving concurrent callers wraps the analyst in a single lock.
pub struct DataAnalyst {
    database: Arc<dyn Database>,
    generator: Arc<dyn SqlGenerator>,
    interpreter: Arc<dyn ResultInterpreter>,
    guardrail: SqlGuardrail,
    sessions: SessionStore,
    memory: MemoryBank,
    metrics: MetricsAccumulator,
    current_session: String,
    config: AnalystConfig,
}

impl fmt::Debug for DataAnalyst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataAnalyst")
            .field("current_session", &self.current_session)
            .field("sessions", &self.sessions.len())
            .field("patterns", &self.memory.patterns().len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DataAnalyst {
    /// Create a builder.
    #[must_use]
    pub fn builder() -> DataAnalystBuilder {
        DataAnalystBuilder::default()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Ask a question in the current session without a chart.
    ///
    /// # Errors
    ///
    /// See [`DataAnalyst::query`].
    pub async fn ask(&mut self, question: impl Into<String>) -> Result<QueryResponse> {
        self.query(QueryRequest::new(question)).await
    }

    /// Run one question through the pipeline.
    ///
    /// Per-query failures are reported inside the response. The only error
    /// is [`Error::Init`] when no schema has been loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Init`] if the schema cache is empty.
    pub async fn query(&mut self, request: QueryRequest) -> Result<QueryResponse> {
        let timer = QueryTimer::start();
        let session_id = request
            .session_id
            .clone()
            .unwrap_or_else(|| self.current_session.clone());
        let span = QueryTimer::query_span(&session_id, &request.question);

        self.run_query(request, session_id, timer)
            .instrument(span)
            .await
    }

    async fn run_query(
        &mut self,
        request: QueryRequest,
        session_id: String,
        timer: QueryTimer,
    ) -> Result<QueryResponse> {
        let question = request.question;
        info!(question = %clip(&question, 100), "query_received");

        // Received
        self.sessions.append(&session_id, Role::User, question.as_str(), None);
        let context = self.sessions.context_window(&session_id);
        let schema = self
            .memory
            .schema()
            .ok_or_else(|| Error::init("database schema has not been loaded"))?;

        // Validated
        let generated = self
            .bounded(self.generator.generate_sql(&question, schema, &context))
            .await;
        let sql = match generated {
            Some(Ok(text)) => strip_code_fence(&text).to_owned(),
            Some(Err(e)) => {
                let failure = StageFailure::validation(
                    FailureKind::Generation,
                    format!("SQL generation failed: {e}"),
                );
                return Ok(self.fail(session_id, question, timer, failure));
            }
            None => {
                let failure = StageFailure::validation(
                    FailureKind::Timeout,
                    format!(
                        "SQL generation timed out after {}s",
                        self.config.collaborator_timeout.as_secs_f64()
                    ),
                );
                return Ok(self.fail(session_id, question, timer, failure));
            }
        };
        info!(sql = %clip(&sql, 200), "sql_generated");

        if let Err(rejection) = self.guardrail.validate(&sql) {
            warn!(reason = %rejection, sql = %clip(&sql, 100), "validation_failed");
            let failure = StageFailure::validation(
                FailureKind::Rejected,
                format!("Query validation failed: {rejection}"),
            )
            .with_sql(sql);
            return Ok(self.fail(session_id, question, timer, failure));
        }
        debug!("validation_passed");

        // Executed
        let executed = self.bounded(self.database.execute(&sql)).await;
        let rows = match executed {
            Some(Ok(rows)) => rows,
            Some(Err(e)) => {
                warn!(error = %e, sql = %clip(&sql, 200), "execution_failed");
                self.memory.record_pattern(question.as_str(), sql.as_str(), false);
                let failure = StageFailure::execution(FailureKind::Execution, e.to_string(), sql);
                return Ok(self.fail(session_id, question, timer, failure));
            }
            None => {
                warn!(sql = %clip(&sql, 200), "execution_timed_out");
                self.memory.record_pattern(question.as_str(), sql.as_str(), false);
                let failure = StageFailure::execution(
                    FailureKind::Timeout,
                    format!(
                        "query execution timed out after {}s",
                        self.config.collaborator_timeout.as_secs_f64()
                    ),
                    sql,
                );
                return Ok(self.fail(session_id, question, timer, failure));
            }
        };
        let row_count = rows.as_ref().map_or(0, ResultSet::len);
        info!(rows = row_count, "execution_succeeded");

        // Interpreted
        let interpreted = self
            .bounded(self.interpreter.interpret(&question, &sql, rows.as_ref()))
            .await;
        let (interpretation, interpretation_fallback) = match interpreted {
            Some(Ok(text)) => (text, false),
            Some(Err(e)) => {
                warn!(error = %e, "interpretation_failed");
                (INTERPRETATION_FALLBACK.to_owned(), true)
            }
            None => {
                warn!("interpretation_timed_out");
                (INTERPRETATION_FALLBACK.to_owned(), true)
            }
        };

        let visualization = match &rows {
            Some(rs)
                if request.visualize
                    && !rs.is_empty()
                    && rs.len() <= self.config.visualization_row_limit =>
            {
                self.interpreter.visualize(rs)
            }
            _ => None,
        };

        self.memory.record_pattern(question.as_str(), sql.as_str(), true);

        let mut metadata = Map::new();
        metadata.insert("sql".to_owned(), Value::from(sql.as_str()));
        metadata.insert("rows".to_owned(), Value::from(row_count));
        self.sessions
            .append(&session_id, Role::Assistant, interpretation.as_str(), Some(metadata));

        let response_time = timer.elapsed();
        self.metrics.record_query(true, response_time, None);
        info!(
            response_time = response_time.as_secs_f64(),
            rows = row_count,
            fallback = interpretation_fallback,
            "query_completed"
        );

        Ok(QueryResponse {
            session_id,
            question,
            response_time,
            outcome: QueryOutcome::Answered(Answer {
                sql,
                rows,
                interpretation,
                interpretation_fallback,
                visualization,
            }),
        })
    }

    /// Bound a collaborator call by the configured timeout.
    async fn bounded<F: Future>(&self, call: F) -> Option<F::Output> {
        tokio::time::timeout(self.config.collaborator_timeout, call)
            .await
            .ok()
    }

    fn fail(
        &mut self,
        session_id: String,
        question: String,
        timer: QueryTimer,
        failure: StageFailure,
    ) -> QueryResponse {
        let response_time = timer.elapsed();
        self.metrics
            .record_query(false, response_time, Some(failure.stage));
        info!(
            stage = failure.stage.as_str(),
            error = %failure.message,
            response_time = response_time.as_secs_f64(),
            "query_failed"
        );

        QueryResponse {
            session_id,
            question,
            response_time,
            outcome: QueryOutcome::Failed(failure),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The cached database schema.
    #[must_use]
    pub const fn schema(&self) -> Option<&DatabaseSchema> {
        self.memory.schema()
    }

    /// History of a session, or of the current session when `None`.
    #[must_use]
    pub fn history(&self, session_id: Option<&str>) -> &VecDeque<Message> {
        self.sessions
            .history(session_id.unwrap_or(&self.current_session))
    }

    /// Clear a session's history, or the current session's when `None`.
    pub fn clear_history(&mut self, session_id: Option<&str>) {
        let id = session_id.map_or_else(|| self.current_session.clone(), str::to_owned);
        self.sessions.clear(&id);
    }

    /// Snapshot of the query metrics.
    #[must_use]
    pub const fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Zero the query metrics.
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// The memory bank.
    #[must_use]
    pub const fn memory(&self) -> &MemoryBank {
        &self.memory
    }

    /// Mutable access to the memory bank, e.g. for preferences.
    pub const fn memory_mut(&mut self) -> &mut MemoryBank {
        &mut self.memory
    }

    /// The session store.
    #[must_use]
    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// The current session id.
    #[must_use]
    pub fn current_session(&self) -> &str {
        &self.current_session
    }

    /// Start a fresh session and make it current.
    pub fn new_session(&mut self) -> String {
        self.switch_session(Uuid::new_v4().to_string())
    }

    /// Make `session_id` current, creating it if needed.
    pub fn switch_session(&mut self, session_id: impl Into<String>) -> String {
        let id = self.sessions.create(session_id);
        self.current_session.clone_from(&id);
        id
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &AnalystConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    fn state_path(&self, file: &str) -> PathBuf {
        self.config.state_dir.join(file)
    }

    /// Write the current session, the memory bank and the metrics into the
    /// state directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if any file cannot be written.
    pub async fn save_state(&self) -> Result<()> {
        self.sessions
            .persist(&self.current_session, &self.state_path(SESSION_FILE))
            .await?;
        self.memory.persist(&self.state_path(MEMORY_FILE)).await?;
        self.metrics.persist(&self.state_path(METRICS_FILE)).await?;
        info!(dir = %self.config.state_dir.display(), "state_saved");
        Ok(())
    }

    /// Load the current session, the memory bank and the metrics from the
    /// state directory. Missing files are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if a file exists but cannot be read.
    pub async fn restore_state(&mut self) -> Result<()> {
        let session_path = self.state_path(SESSION_FILE);
        let memory_path = self.state_path(MEMORY_FILE);
        let metrics_path = self.state_path(METRICS_FILE);

        skip_missing(
            self.sessions
                .restore(&self.current_session, &session_path)
                .await,
            &session_path,
        )?;
        skip_missing(self.memory.restore(&memory_path).await, &memory_path)?;
        skip_missing(self.metrics.restore(&metrics_path).await, &metrics_path)?;
        info!(dir = %self.config.state_dir.display(), "state_restored");
        Ok(())
    }

    /// Shut down, saving state when configured to.
    ///
    /// A failed save is logged and otherwise ignored.
    pub async fn close(self) {
        if self.config.persist_on_close
            && let Err(e) = self.save_state().await
        {
            warn!(error = %e, "state_save_failed");
        }
        info!(session_id = %self.current_session, "analyst_closed");
    }
}

fn skip_missing(result: StorageResult<()>, path: &Path) -> Result<()> {
    match result {
        Err(e) if e.is_not_found() => {
            debug!(path = %path.display(), "state_file_missing");
            Ok(())
        }
        other => Ok(other?),
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`DataAnalyst`].
#[derive(Default)]
pub struct DataAnalystBuilder {
    database: Option<Arc<dyn Database>>,
    generator: Option<Arc<dyn SqlGenerator>>,
    interpreter: Option<Arc<dyn ResultInterpreter>>,
    config: AnalystConfig,
}

impl fmt::Debug for DataAnalystBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataAnalystBuilder")
            .field("database", &self.database.is_some())
            .field("generator", &self.generator.is_some())
            .field("interpreter", &self.interpreter.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl DataAnalystBuilder {
    /// Set the database collaborator.
    #[must_use]
    pub fn database(mut self, database: impl Database + 'static) -> Self {
        self.database = Some(Arc::new(database));
        self
    }

    /// Set the SQL generator.
    #[must_use]
    pub fn generator(mut self, generator: impl SqlGenerator + 'static) -> Self {
        self.generator = Some(Arc::new(generator));
        self
    }

    /// Set the result interpreter.
    #[must_use]
    pub fn interpreter(mut self, interpreter: impl ResultInterpreter + 'static) -> Self {
        self.interpreter = Some(Arc::new(interpreter));
        self
    }

    /// Use one model as both generator and interpreter.
    #[must_use]
    pub fn model<M>(mut self, model: M) -> Self
    where
        M: SqlGenerator + ResultInterpreter + 'static,
    {
        let model = Arc::new(model);
        self.generator = Some(Arc::clone(&model) as Arc<dyn SqlGenerator>);
        self.interpreter = Some(model);
        self
    }

    /// Set the configuration.
    #[must_use]
    pub fn config(mut self, config: AnalystConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the schema, optionally restore state and open a fresh session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Init`] if a collaborator is missing or the schema
    /// cannot be loaded in time.
    pub async fn build(self) -> Result<DataAnalyst> {
        let database = self
            .database
            .ok_or_else(|| Error::init("no database collaborator configured"))?;
        let generator = self
            .generator
            .ok_or_else(|| Error::init("no SQL generator configured"))?;
        let interpreter = self
            .interpreter
            .ok_or_else(|| Error::init("no result interpreter configured"))?;

        let mut analyst = DataAnalyst {
            database,
            generator,
            interpreter,
            guardrail: SqlGuardrail::new(),
            sessions: SessionStore::new(self.config.max_history),
            memory: MemoryBank::new(),
            metrics: MetricsAccumulator::new(),
            current_session: String::new(),
            config: self.config,
        };
        analyst.new_session();

        if analyst.config.restore_on_start
            && let Err(e) = analyst.restore_state().await
        {
            warn!(error = %e, "state_restore_failed");
        }

        let schema = match analyst.bounded(analyst.database.schema()).await {
            Some(Ok(schema)) => schema,
            Some(Err(e)) => return Err(Error::init(format!("failed to load database schema: {e}"))),
            None => return Err(Error::init("timed out loading database schema")),
        };
        let tables: Vec<String> = schema.table_names().map(str::to_owned).collect();
        analyst.memory.store_schema(schema);

        info!(
            session_id = %analyst.current_session,
            tables = ?tables,
            "analyst_initialized"
        );
        Ok(analyst)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_fs::TempDir;
    use rusqlite::Connection;

    use super::*;
    use crate::database::SqliteDatabase;
    use crate::error::DatabaseResult;
    use crate::memory::PreferenceValue;
    use crate::providers::{ChartKind, MockModel};

    /// Answers `schema` at once and sleeps before every `execute`.
    struct SlowDatabase {
        inner: SqliteDatabase,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl Database for SlowDatabase {
        async fn execute(&self, sql: &str) -> DatabaseResult<Option<ResultSet>> {
            tokio::time::sleep(self.delay).await;
            self.inner.execute(sql).await
        }

        async fn schema(&self) -> DatabaseResult<DatabaseSchema> {
            self.inner.schema().await
        }
    }

    fn fixture() -> SqliteDatabase {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE sales (
                sale_id INTEGER PRIMARY KEY,
                region TEXT NOT NULL,
                total_price REAL NOT NULL
            );
            INSERT INTO sales (region, total_price) VALUES
                ('North', 100.0),
                ('South', 50.0),
                ('North', 25.5);",
        )
        .unwrap();
        SqliteDatabase::from_connection(conn).unwrap()
    }

    async fn analyst(model: MockModel, config: AnalystConfig) -> DataAnalyst {
        DataAnalyst::builder()
            .database(fixture())
            .model(model)
            .config(config)
            .build()
            .await
            .unwrap()
    }

    fn quiet_config() -> AnalystConfig {
        AnalystConfig::default().with_persist_on_close(false)
    }

    #[tokio::test]
    async fn test_build_loads_schema() {
        let analyst = analyst(MockModel::new(), quiet_config()).await;
        let schema = analyst.schema().unwrap();
        assert_eq!(schema.columns("sales").map(<[_]>::len), Some(3));
        assert!(analyst.history(None).is_empty());
        assert_eq!(analyst.sessions().current(), Some(analyst.current_session()));
    }

    #[tokio::test]
    async fn test_build_without_generator_fails() {
        let err = DataAnalyst::builder()
            .database(fixture())
            .interpreter(MockModel::new())
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Init(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_total_revenue_answered() {
        let model = MockModel::new()
            .with_sql("```sql\nSELECT SUM(total_price) AS revenue FROM sales\n```")
            .with_interpretation("Total revenue is 175.50.");
        let mut analyst = analyst(model.clone(), quiet_config()).await;

        let response = analyst.ask("What is the total revenue?").await.unwrap();

        assert!(response.is_success());
        let answer = response.answer().unwrap();
        assert_eq!(answer.sql, "SELECT SUM(total_price) AS revenue FROM sales");
        assert_eq!(answer.row_count(), 1);
        assert_eq!(answer.interpretation, "Total revenue is 175.50.");
        assert!(!answer.interpretation_fallback);
        assert!(answer.visualization.is_none());

        let patterns = analyst.memory().patterns();
        assert_eq!(patterns.len(), 1);
        assert!(patterns[0].succeeded);

        let history = analyst.history(None);
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].metadata["rows"], 1);

        let metrics = analyst.metrics();
        assert_eq!(metrics.queries_processed, 1);
        assert_eq!(metrics.successful_queries, 1);
        assert_eq!(model.interpret_calls(), 1);
    }

    #[tokio::test]
    async fn test_destructive_sql_rejected() {
        let model = MockModel::new().with_sql("DELETE FROM sales");
        let mut analyst = analyst(model.clone(), quiet_config()).await;

        let response = analyst.ask("Delete every sale").await.unwrap();

        assert_eq!(response.stage(), Some(Stage::Validation));
        let failure = response.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Rejected);
        assert_eq!(failure.sql.as_deref(), Some("DELETE FROM sales"));
        assert!(failure.message.contains("DELETE"));

        assert!(analyst.memory().patterns().is_empty());
        assert_eq!(analyst.history(None).len(), 1);
        assert_eq!(model.interpret_calls(), 0);

        let metrics = analyst.metrics();
        assert_eq!(metrics.failed_queries, 1);
        assert_eq!(metrics.validation_errors, 1);
        assert_eq!(metrics.execution_errors, 0);
    }

    #[tokio::test]
    async fn test_generation_failure() {
        let model = MockModel::new().failing_generation("quota exhausted");
        let mut analyst = analyst(model, quiet_config()).await;

        let response = analyst.ask("How many sales?").await.unwrap();
        let failure = response.failure().unwrap();
        assert_eq!(failure.stage, Stage::Validation);
        assert_eq!(failure.kind, FailureKind::Generation);
        assert!(failure.sql.is_none());
        assert!(failure.message.starts_with("SQL generation failed:"));
    }

    #[tokio::test]
    async fn test_execution_failure_records_pattern() {
        let model = MockModel::new().with_sql("SELECT * FROM missing_table");
        let mut analyst = analyst(model, quiet_config()).await;

        let response = analyst.ask("Show the missing table").await.unwrap();

        assert_eq!(response.stage(), Some(Stage::Execution));
        assert_eq!(response.sql(), Some("SELECT * FROM missing_table"));
        assert!(response.summary().contains("missing_table"));

        let patterns = analyst.memory().patterns();
        assert_eq!(patterns.len(), 1);
        assert!(!patterns[0].succeeded);
        assert_eq!(analyst.metrics().execution_errors, 1);
    }

    #[tokio::test]
    async fn test_interpretation_failure_falls_back() {
        let model = MockModel::new()
            .with_sql("SELECT region FROM sales")
            .failing_interpretation("model offline");
        let mut analyst = analyst(model, quiet_config()).await;

        let response = analyst.ask("Which regions?").await.unwrap();

        assert!(response.is_success());
        let answer = response.answer().unwrap();
        assert_eq!(answer.interpretation, INTERPRETATION_FALLBACK);
        assert!(answer.interpretation_fallback);
        assert_eq!(answer.row_count(), 3);
        assert!(analyst.memory().patterns()[0].succeeded);
        assert_eq!(analyst.metrics().successful_queries, 1);
    }

    #[tokio::test]
    async fn test_generation_timeout() {
        let model = MockModel::new().with_delay(Duration::from_secs(5));
        let config = quiet_config().with_collaborator_timeout(Duration::from_millis(200));
        // The delayed model only slows generation and interpretation, so the
        // schema load still fits in the bound.
        let mut analyst = analyst(model, config).await;

        let response = analyst.ask("Anything").await.unwrap();
        let failure = response.failure().unwrap();
        assert_eq!(failure.stage, Stage::Validation);
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert!(response.response_time < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_execution_timeout_records_failed_pattern() {
        let model = MockModel::new().with_sql("SELECT region FROM sales");
        let database = SlowDatabase {
            inner: fixture(),
            delay: Duration::from_secs(5),
        };
        let mut analyst = DataAnalyst::builder()
            .database(database)
            .model(model.clone())
            .config(quiet_config().with_collaborator_timeout(Duration::from_millis(200)))
            .build()
            .await
            .unwrap();

        let response = analyst.ask("Which regions?").await.unwrap();

        let failure = response.failure().unwrap();
        assert_eq!(failure.stage, Stage::Execution);
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert_eq!(failure.sql.as_deref(), Some("SELECT region FROM sales"));
        assert!(response.response_time < Duration::from_secs(5));

        let patterns = analyst.memory().patterns();
        assert_eq!(patterns.len(), 1);
        assert!(!patterns[0].succeeded);

        let metrics = analyst.metrics();
        assert_eq!(metrics.failed_queries, 1);
        assert_eq!(metrics.execution_errors, 1);
        assert_eq!(metrics.validation_errors, 0);
        assert_eq!(model.interpret_calls(), 0);
    }

    #[tokio::test]
    async fn test_interpretation_timeout_falls_back() {
        let model = MockModel::new()
            .with_sql("SELECT region FROM sales")
            .with_interpretation_delay(Duration::from_secs(5));
        let config = quiet_config().with_collaborator_timeout(Duration::from_millis(200));
        let mut analyst = analyst(model, config).await;

        let response = analyst.ask("Which regions?").await.unwrap();

        assert!(response.is_success());
        let answer = response.answer().unwrap();
        assert_eq!(answer.interpretation, INTERPRETATION_FALLBACK);
        assert!(answer.interpretation_fallback);
        assert_eq!(answer.row_count(), 3);
        assert!(response.response_time < Duration::from_secs(5));

        assert!(analyst.memory().patterns()[0].succeeded);
        assert_eq!(analyst.metrics().successful_queries, 1);
        assert_eq!(analyst.history(None)[1].content, INTERPRETATION_FALLBACK);
    }

    #[tokio::test]
    async fn test_context_includes_previous_turns() {
        let model = MockModel::new().with_sql("SELECT COUNT(*) FROM sales");
        let mut analyst = analyst(model.clone(), quiet_config()).await;

        analyst.ask("How many sales?").await.unwrap();
        analyst.ask("And by region?").await.unwrap();

        let contexts = model.contexts();
        assert_eq!(contexts.len(), 2);
        assert!(contexts[0].contains("USER: How many sales?"));
        assert!(contexts[1].contains("ASSISTANT: Mock interpretation."));
        assert!(contexts[1].contains("USER: And by region?"));
    }

    #[tokio::test]
    async fn test_visualization_on_request() {
        let model = MockModel::new()
            .with_sql("SELECT region, SUM(total_price) AS revenue FROM sales GROUP BY region");
        let mut analyst = analyst(model, quiet_config()).await;

        let plain = analyst.ask("Revenue by region").await.unwrap();
        assert!(plain.answer().unwrap().visualization.is_none());

        let request = QueryRequest::new("Revenue by region").with_visualization(true);
        let charted = analyst.query(request).await.unwrap();
        let chart = charted.answer().unwrap().visualization.clone().unwrap();
        assert_eq!(chart.kind, ChartKind::Bar);
        assert_eq!(chart.x, "region");
        assert_eq!(chart.y, "revenue");
    }

    #[tokio::test]
    async fn test_explicit_session_routing() {
        let mut analyst = analyst(MockModel::new(), quiet_config()).await;

        let request = QueryRequest::new("What is one?").in_session("side");
        let response = analyst.query(request).await.unwrap();

        assert_eq!(response.session_id, "side");
        assert_eq!(analyst.history(Some("side")).len(), 2);
        assert!(analyst.history(None).is_empty());

        analyst.clear_history(Some("side"));
        assert!(analyst.history(Some("side")).is_empty());
    }

    #[tokio::test]
    async fn test_new_session_starts_empty() {
        let mut analyst = analyst(MockModel::new(), quiet_config()).await;
        analyst.ask("What is one?").await.unwrap();
        let first = analyst.current_session().to_owned();

        let second = analyst.new_session();
        assert_ne!(first, second);
        assert!(analyst.history(None).is_empty());
        assert_eq!(analyst.history(Some(&first)).len(), 2);
    }

    #[tokio::test]
    async fn test_state_round_trip() {
        let temp = TempDir::new().unwrap();
        let config = AnalystConfig::default().with_state_dir(temp.path());

        let mut first = analyst(MockModel::new(), config.clone()).await;
        first.memory_mut().set_preference("chart_theme", "dark");
        first.ask("What is one?").await.unwrap();
        first.close().await;

        assert!(temp.path().join(SESSION_FILE).exists());
        assert!(temp.path().join(MEMORY_FILE).exists());
        assert!(temp.path().join(METRICS_FILE).exists());

        let second = analyst(MockModel::new(), config.with_restore_on_start(true)).await;
        assert_eq!(second.memory().patterns().len(), 1);
        assert_eq!(
            second.memory().preference("chart_theme").and_then(PreferenceValue::as_str),
            Some("dark")
        );
        assert_eq!(second.metrics().queries_processed, 1);
        assert_eq!(second.history(None).len(), 2);
    }

    #[tokio::test]
    async fn test_restore_on_start_reads_offsetless_timestamps() {
        let temp = TempDir::new().unwrap();
        let stamp = "2025-03-01T10:00:00.123456";
        std::fs::write(
            temp.path().join(SESSION_FILE),
            format!(r#"[{{"role": "user", "content": "total sales?", "timestamp": "{stamp}"}}]"#),
        )
        .unwrap();
        std::fs::write(
            temp.path().join(MEMORY_FILE),
            format!(
                r#"{{"query_patterns": [{{"nl": "total sales", "sql": "SELECT 1",
                    "success": true, "timestamp": "{stamp}"}}]}}"#
            ),
        )
        .unwrap();
        std::fs::write(temp.path().join(METRICS_FILE), r#"{"queries_processed": 4}"#).unwrap();

        let config = quiet_config()
            .with_state_dir(temp.path())
            .with_restore_on_start(true);
        let analyst = analyst(MockModel::new(), config).await;

        assert_eq!(analyst.history(None).len(), 1);
        assert_eq!(analyst.memory().patterns().len(), 1);
        assert_eq!(analyst.metrics().queries_processed, 4);
    }

    #[tokio::test]
    async fn test_restore_missing_state_is_noop() {
        let temp = TempDir::new().unwrap();
        let config = quiet_config().with_state_dir(temp.path().join("absent"));
        let mut analyst = analyst(MockModel::new(), config).await;

        analyst.restore_state().await.unwrap();
        assert!(analyst.memory().patterns().is_empty());
        assert_eq!(analyst.metrics().queries_processed, 0);
    }

    #[tokio::test]
    async fn test_reset_metrics() {
        let mut analyst = analyst(MockModel::new(), quiet_config()).await;
        analyst.ask("What is one?").await.unwrap();
        analyst.reset_metrics();
        assert_eq!(analyst.metrics().queries_processed, 0);
    }
}
