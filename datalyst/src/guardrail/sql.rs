//! SELECT-only validation of candidate SQL.

use std::fmt;

/// Keywords that reject a statement when they appear as a standalone token.
pub const DENIED_KEYWORDS: &[&str] = &[
    "drop", "truncate", "delete", "alter", "create", "insert", "update", "grant", "revoke",
];

/// Why the safety gate refused a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// A denied keyword appeared as a whole token.
    DeniedKeyword(&'static str),
    /// The first token was not `select` (this includes the empty statement).
    NotSelect,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeniedKeyword(keyword) => {
                write!(
                    f,
                    "Query contains potentially dangerous keyword: {}",
                    keyword.to_uppercase()
                )
            }
            Self::NotSelect => f.write_str("not a SELECT statement"),
        }
    }
}

impl std::error::Error for Rejection {}

/// Token-level SELECT-only safety gate.
#[derive(Debug, Clone, Copy)]
pub struct SqlGuardrail {
    denied: &'static [&'static str],
}

impl Default for SqlGuardrail {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlGuardrail {
    /// Create a gate using [`DENIED_KEYWORDS`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            denied: DENIED_KEYWORDS,
        }
    }

    /// Accept or reject a candidate statement.
    ///
    /// The denylist is checked before the SELECT prefix, so
    /// `"delete from t"` is reported as a denied keyword rather than as a
    /// non-SELECT statement.
    pub fn validate(&self, sql: &str) -> Result<(), Rejection> {
        let normalized = sql.trim().to_lowercase();

        for token in normalized.split_whitespace() {
            if let Some(keyword) = self.denied.iter().find(|k| **k == token) {
                return Err(Rejection::DeniedKeyword(*keyword));
            }
        }

        match normalized.split_whitespace().next() {
            Some("select") => Ok(()),
            _ => Err(Rejection::NotSelect),
        }
    }

    /// Convenience wrapper returning `true` when the statement is accepted.
    #[must_use]
    pub fn is_allowed(&self, sql: &str) -> bool {
        self.validate(sql).is_ok()
    }
}
