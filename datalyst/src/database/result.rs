//! Query result sets.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of numeric columns described by [`ResultSet::summary`].
const SUMMARY_NUMERIC_COLUMNS: usize = 3;

/// Rows returned by a statement, in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Column names in select-list order.
    pub columns: Vec<String>,
    /// Row values, one entry per column.
    pub rows: Vec<Vec<Value>>,
}

/// Inferred kind of a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every non-null value is a number.
    Numeric,
    /// At least one value is text.
    Text,
    /// Only nulls, booleans or nested values.
    Other,
}

/// Min/max/mean of a numeric column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Arithmetic mean.
    pub avg: f64,
}

impl ResultSet {
    /// Create a result set.
    #[must_use]
    pub const fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of the column at `index`.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// Infer the kind of the column at `index` from its values.
    #[must_use]
    pub fn column_kind(&self, index: usize) -> ColumnKind {
        let mut saw_number = false;
        for value in self.column(index) {
            match value {
                Value::Null => {}
                Value::Number(_) => saw_number = true,
                Value::String(_) => return ColumnKind::Text,
                _ => return ColumnKind::Other,
            }
        }
        if saw_number {
            ColumnKind::Numeric
        } else {
            ColumnKind::Other
        }
    }

    /// Indices of columns of the given kind, in column order.
    #[must_use]
    pub fn columns_of_kind(&self, kind: ColumnKind) -> Vec<usize> {
        (0..self.columns.len())
            .filter(|i| self.column_kind(*i) == kind)
            .collect()
    }

    /// Min/max/mean over the numeric values of a column.
    #[must_use]
    pub fn stats(&self, index: usize) -> Option<ColumnStats> {
        let values: Vec<f64> = self.column(index).filter_map(Value::as_f64).collect();
        if values.is_empty() {
            return None;
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = values.iter().sum::<f64>() / values.len() as f64;
        Some(ColumnStats { min, max, avg })
    }

    /// Text summary handed to the interpreter: row count, column names and
    /// statistics for the first few numeric columns.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Total rows: {}\nColumns: {}",
            self.len(),
            self.columns.join(", ")
        );

        let numeric = self.columns_of_kind(ColumnKind::Numeric);
        if !numeric.is_empty() {
            out.push_str("\n\nNumerical Summary:");
            for index in numeric.into_iter().take(SUMMARY_NUMERIC_COLUMNS) {
                if let Some(stats) = self.stats(index) {
                    let _ = write!(
                        out,
                        "\n  {}: min={:.2}, max={:.2}, avg={:.2}",
                        self.columns[index], stats.min, stats.max, stats.avg
                    );
                }
            }
        }
        out
    }

    /// Render the first `limit` rows as pipe-separated lines under a header.
    #[must_use]
    pub fn preview(&self, limit: usize) -> String {
        let mut lines = vec![self.columns.join(" | ")];
        lines.extend(self.rows.iter().take(limit).map(|row| {
            row.iter()
                .map(display_value)
                .collect::<Vec<_>>()
                .join(" | ")
        }));
        lines.join("\n")
    }
}

/// Render a cell without JSON quoting.
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_owned(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn regions() -> ResultSet {
        ResultSet::new(
            vec!["region".into(), "revenue".into(), "orders".into()],
            vec![
                vec![json!("North"), json!(100.0), json!(4)],
                vec![json!("South"), json!(50.5), json!(2)],
                vec![json!("East"), Value::Null, json!(0)],
            ],
        )
    }

    #[test]
    fn test_column_kinds() {
        let rs = regions();
        assert_eq!(rs.column_kind(0), ColumnKind::Text);
        assert_eq!(rs.column_kind(1), ColumnKind::Numeric);
        assert_eq!(rs.columns_of_kind(ColumnKind::Numeric), vec![1, 2]);

        let nulls = ResultSet::new(vec!["x".into()], vec![vec![Value::Null]]);
        assert_eq!(nulls.column_kind(0), ColumnKind::Other);
    }

    #[test]
    fn test_stats_skip_nulls() {
        let stats = regions().stats(1).unwrap();
        assert!((stats.min - 50.5).abs() < f64::EPSILON);
        assert!((stats.max - 100.0).abs() < f64::EPSILON);
        assert!((stats.avg - 75.25).abs() < f64::EPSILON);
        assert!(regions().stats(0).is_none());
    }

    #[test]
    fn test_summary() {
        let summary = regions().summary();
        assert!(summary.starts_with("Total rows: 3\nColumns: region, revenue, orders"));
        assert!(summary.contains("Numerical Summary:"));
        assert!(summary.contains("  revenue: min=50.50, max=100.00, avg=75.25"));
        assert!(summary.contains("  orders: min=0.00, max=4.00, avg=2.00"));
    }

    #[test]
    fn test_summary_limits_numeric_columns() {
        let rs = ResultSet::new(
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            vec![vec![json!(1), json!(2), json!(3), json!(4)]],
        );
        let summary = rs.summary();
        assert!(summary.contains("  c: "));
        assert!(!summary.contains("  d: "));
    }

    #[test]
    fn test_preview() {
        let preview = regions().preview(2);
        assert_eq!(
            preview,
            "region | revenue | orders\nNorth | 100.0 | 4\nSouth | 50.5 | 2"
        );
        assert_eq!(display_value(&Value::Null), "NULL");
    }
}
