//! The query orchestrator.
//!
//! [`DataAnalyst`] drives each question through a fixed pipeline:
//!
//! 1. **Received**: the question is appended to the session history.
//! 2. **Validated**: the generator turns it into SQL, code fences are
//!    stripped and the [`SqlGuardrail`](crate::guardrail::SqlGuardrail)
//!    accepts or rejects the statement.
//! 3. **Executed**: the database runs the accepted statement.
//! 4. **Interpreted**: the interpreter explains the rows, falling back to a
//!    fixed message if it fails.
//!
//! A failure in generation, validation or execution ends the query with a
//! [`StageFailure`](crate::error::StageFailure) inside the
//! [`QueryResponse`]; the session stays usable. Every collaborator call is
//! bounded by [`AnalystConfig::collaborator_timeout`](crate::AnalystConfig).
//!
//! # Example
//!
//! ```rust,ignore
//! use datalyst::agent::{DataAnalyst, QueryRequest};
//! use datalyst::providers::MockModel;
//!
//! let mut analyst = DataAnalyst::builder()
//!     .database(db)
//!     .model(MockModel::new().with_sql("SELECT COUNT(*) FROM customers"))
//!     .build()
//!     .await?;
//!
//! let response = analyst
//!     .query(QueryRequest::new("How many customers?").with_visualization(true))
//!     .await?;
//! assert!(response.is_success());
//! ```

mod analyst;
mod response;
mod sql;

pub use analyst::{DataAnalyst, DataAnalystBuilder, MEMORY_FILE, METRICS_FILE, SESSION_FILE};
pub use response::{Answer, INTERPRETATION_FALLBACK, QueryOutcome, QueryRequest, QueryResponse};
pub use sql::strip_code_fence;
