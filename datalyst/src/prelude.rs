//! Common imports for building an analyst.

pub use crate::agent::{
    Answer, DataAnalyst, DataAnalystBuilder, QueryOutcome, QueryRequest, QueryResponse,
};
pub use crate::config::{AnalystConfig, Settings};
pub use crate::database::{Database, DatabaseSchema, ResultSet, SqliteDatabase};
pub use crate::error::{Error, FailureKind, Result, Stage, StageFailure};
pub use crate::guardrail::SqlGuardrail;
pub use crate::memory::{MemoryBank, PreferenceValue};
pub use crate::providers::{
    ChartKind, ChartSpec, GeminiClient, GeminiModel, MockModel, ResultInterpreter, SqlGenerator,
};
pub use crate::session::{Message, Role, SessionStore};
pub use crate::telemetry::MetricsSnapshot;
