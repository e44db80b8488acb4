#![cfg_attr(docsrs, feature(doc_cfg))]
//! Datalyst turns natural-language questions into read-only SQL, runs them
//! against a relational database and explains the results.
//!
//! The crate is organised around a single orchestrator, [`DataAnalyst`],
//! and the bookkeeping it relies on:
//!
//! - [`guardrail`]: the SELECT-only safety gate applied to generated SQL
//! - [`session`]: bounded per-session conversation history
//! - [`memory`]: schema cache, query-pattern log and user preferences
//! - [`telemetry`]: query outcome and timing metrics
//!
//! The language model and the database are collaborators behind traits in
//! [`providers`] and [`database`], so the orchestrator can be driven by the
//! Gemini client and SQLite in production and by [`providers::MockModel`]
//! in tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use datalyst::prelude::*;
//!
//! let db = SqliteDatabase::open("sample_data.db")?;
//! let gemini = GeminiClient::from_env()?;
//! let model = gemini.model("gemini-2.5-flash");
//!
//! let mut analyst = DataAnalyst::builder()
//!     .database(db)
//!     .generator(model.clone())
//!     .interpreter(model)
//!     .build()
//!     .await?;
//!
//! let response = analyst.ask("What is the total revenue?").await?;
//! println!("{}", response.summary());
//! ```

pub mod agent;
pub mod config;
pub mod database;
pub mod error;
pub mod guardrail;
pub mod memory;
pub mod prelude;
pub mod providers;
pub mod session;
pub mod state;
pub mod telemetry;

pub use agent::{Answer, DataAnalyst, QueryOutcome, QueryRequest, QueryResponse};
pub use config::{AnalystConfig, Settings};
pub use error::{Error, FailureKind, Result, Stage, StageFailure};
