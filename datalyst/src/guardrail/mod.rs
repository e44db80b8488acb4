//! The safety gate for generated SQL.
//!
//! Every statement produced by the SQL-generation collaborator passes through
//! [`SqlGuardrail::validate`] before it reaches the database. The gate is a
//! token-level heuristic:
//!
//! 1. The statement is lowercased and trimmed.
//! 2. It is split on whitespace. If any token is exactly one of the denied
//!    keywords (`drop`, `truncate`, `delete`, `alter`, `create`, `insert`,
//!    `update`, `grant`, `revoke`) the statement is rejected, naming that
//!    keyword.
//! 3. Otherwise the first token must be exactly `select`.
//!
//! Matching is whole-token, so identifiers such as `dropout_rate` or
//! `created_at` do not trip the gate.
//!
//! # Known Limitations
//!
//! The gate does not parse SQL. It is necessary but not sufficient:
//!
//! - quoted or concatenated keywords (`"DROP"`, `dr/**/op`) are not detected
//! - a keyword glued to punctuation (`t;drop`) is a different token
//! - trailing semicolons and comments are not stripped
//! - CTEs (`WITH ... SELECT`) are rejected because the first token is `with`
//!
//! The SQLite collaborator adds the real boundary: it opens databases
//! read-only and refuses multi-statement strings. See
//! [`SqliteDatabase`](crate::database::SqliteDatabase).
//!
//! # Example
//!
//! ```rust,ignore
//! use datalyst::guardrail::{Rejection, SqlGuardrail};
//!
//! let gate = SqlGuardrail::new();
//! assert!(gate.validate("SELECT dropout_rate FROM students").is_ok());
//! assert_eq!(
//!     gate.validate("select * from t; drop table t"),
//!     Err(Rejection::DeniedKeyword("drop")),
//! );
//! ```

mod sql;

pub use sql::{DENIED_KEYWORDS, Rejection, SqlGuardrail};
