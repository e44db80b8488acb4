//! Memory bank for learned information.
//!
//! Holds what outlives a single conversation:
//!
//! - the database schema, cached once at startup and replaced whole
//! - a ring of the last [`MAX_PATTERNS`] (question, SQL, outcome) records
//!   with naive word-overlap lookup
//! - user preferences as a small closed set of value types

mod bank;
mod types;

pub use bank::{DEFAULT_SIMILAR_LIMIT, MAX_PATTERNS, MemoryBank};
pub use types::{PreferenceValue, QueryPattern};
