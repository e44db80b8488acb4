//! Database collaborator.
//!
//! The orchestrator talks to the database through the [`Database`] trait:
//! one call to load the schema at startup and one call per validated
//! statement. [`SqliteDatabase`] is the bundled implementation.
//!
//! Implementations report driver failures as [`DatabaseError`] values with
//! a human-readable message; the orchestrator turns those into
//! execution-stage failures.

pub mod demo;
mod result;
mod schema;
mod sqlite;

pub use result::{ColumnKind, ColumnStats, ResultSet, display_value};
pub use schema::{ColumnInfo, DatabaseSchema};
pub use sqlite::SqliteDatabase;

use async_trait::async_trait;

use crate::error::DatabaseResult;

/// A relational database that can describe itself and run statements.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run a single statement.
    ///
    /// Returns `Ok(None)` for statements that produce no columns.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError`](crate::error::DatabaseError) on any
    /// driver-level failure.
    async fn execute(&self, sql: &str) -> DatabaseResult<Option<ResultSet>>;

    /// Describe every user table.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError`](crate::error::DatabaseError) if the catalog
    /// cannot be read.
    async fn schema(&self) -> DatabaseResult<DatabaseSchema>;
}
