//! Memory bank records.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A historical question, the SQL generated for it and whether it ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryPattern {
    /// The user's question.
    #[serde(alias = "nl")]
    pub natural_language: String,
    /// The generated statement.
    pub sql: String,
    /// Whether the statement executed successfully.
    #[serde(alias = "success")]
    pub succeeded: bool,
    /// When the pattern was recorded.
    #[serde(deserialize_with = "crate::state::lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl QueryPattern {
    /// Create a pattern stamped with the current time.
    #[must_use]
    pub fn new(
        natural_language: impl Into<String>,
        sql: impl Into<String>,
        succeeded: bool,
    ) -> Self {
        Self {
            natural_language: natural_language.into(),
            sql: sql.into(),
            succeeded,
            timestamp: Utc::now(),
        }
    }

    /// Number of distinct lowercased words shared with `words`.
    pub(crate) fn overlap(&self, words: &HashSet<String>) -> usize {
        word_set(&self.natural_language)
            .intersection(words)
            .count()
    }
}

/// Lowercased whitespace-separated words of `text`.
pub(crate) fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

/// A user preference value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreferenceValue {
    /// A flag.
    Bool(bool),
    /// A number.
    Number(f64),
    /// A string.
    Text(String),
    /// An ordered list of values.
    List(Vec<PreferenceValue>),
}

impl PreferenceValue {
    /// The flag, if this is a boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The number, if this is numeric.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The text, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PreferenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for PreferenceValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for PreferenceValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for PreferenceValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for PreferenceValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for PreferenceValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Self>> From<Vec<T>> for PreferenceValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_accepts_short_keys() {
        let pattern: QueryPattern = serde_json::from_str(
            r#"{"nl": "total sales", "sql": "SELECT 1", "success": true,
                "timestamp": "2025-03-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(pattern.natural_language, "total sales");
        assert!(pattern.succeeded);

        let json = serde_json::to_value(&pattern).unwrap();
        assert_eq!(json["natural_language"], "total sales");
        assert_eq!(json["succeeded"], true);
    }

    #[test]
    fn test_pattern_timestamp_without_offset() {
        let pattern: QueryPattern = serde_json::from_str(
            r#"{"nl": "total sales", "sql": "SELECT 1", "success": true,
                "timestamp": "2025-03-01T10:00:00.123456"}"#,
        )
        .unwrap();
        assert_eq!(pattern.timestamp.to_rfc3339(), "2025-03-01T10:00:00.123456+00:00");
    }

    #[test]
    fn test_pattern_unreadable_timestamp_defaults() {
        let pattern: QueryPattern = serde_json::from_str(
            r#"{"nl": "total sales", "sql": "SELECT 1", "timestamp": "last tuesday"}"#,
        )
        .unwrap();
        assert_eq!(pattern.timestamp, DateTime::<Utc>::default());
        assert_eq!(pattern.sql, "SELECT 1");
    }

    #[test]
    fn test_overlap_is_case_insensitive_set() {
        let pattern = QueryPattern::new("Show TOTAL sales sales by region", "SELECT 1", true);
        let words = word_set("total sales by region");
        assert_eq!(pattern.overlap(&words), 4);
        assert_eq!(pattern.overlap(&word_set("customers")), 0);
    }

    #[test]
    fn test_preference_value_shapes() {
        let values: Vec<PreferenceValue> =
            serde_json::from_str(r#"[true, 2.5, "bar", ["a", 1, false]]"#).unwrap();
        assert_eq!(values[0], PreferenceValue::Bool(true));
        assert_eq!(values[1].as_f64(), Some(2.5));
        assert_eq!(values[2].as_str(), Some("bar"));
        assert_eq!(
            values[3],
            PreferenceValue::List(vec!["a".into(), 1.into(), false.into()])
        );
        assert_eq!(values[3].to_string(), "[a, 1, false]");
    }
}
