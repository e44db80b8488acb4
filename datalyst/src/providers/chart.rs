//! Chart suggestions for result sets.
//!
//! Only a description of the chart is produced; rendering is left to the
//! host application.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::database::{ColumnKind, ResultSet};

/// Result sets larger than this are never charted.
pub const MAX_CHART_ROWS: usize = 100;

/// Category charts switch from bars to a line above this many rows.
const MAX_BAR_ROWS: usize = 20;

/// Kind of chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    /// Categorical vs numerical.
    Bar,
    /// Trends over an ordered axis.
    Line,
    /// Correlation between two numeric columns.
    Scatter,
    /// Share of a whole.
    Pie,
}

impl ChartKind {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Scatter => "scatter",
            Self::Pie => "pie",
        }
    }
}

/// A chart over the first two columns of a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSpec {
    /// Chart kind.
    pub kind: ChartKind,
    /// Column on the x axis (or the slice labels for a pie).
    pub x: String,
    /// Column on the y axis (or the slice values for a pie).
    pub y: String,
    /// Chart title.
    pub title: String,
}

impl ChartSpec {
    /// Build a chart of the given kind over the first two columns.
    ///
    /// Returns `None` if the result set has fewer than two columns.
    #[must_use]
    pub fn new(kind: ChartKind, rows: &ResultSet) -> Option<Self> {
        let [x, y, ..] = rows.columns.as_slice() else {
            return None;
        };

        let title = match kind {
            ChartKind::Bar => format!("{y} by {x}"),
            ChartKind::Line => format!("{y} over {x}"),
            ChartKind::Scatter => format!("{y} vs {x}"),
            ChartKind::Pie => "Distribution".to_owned(),
        };

        Some(Self {
            kind,
            x: x.clone(),
            y: y.clone(),
            title,
        })
    }

    /// Pick a chart for the result set.
    ///
    /// Empty sets, sets above [`MAX_CHART_ROWS`] rows and single-column sets
    /// get no chart. Text plus numeric columns give a bar chart for small
    /// sets and a line chart otherwise; two or more numeric columns give a
    /// scatter plot; anything else falls back to bars.
    #[must_use]
    pub fn suggest(rows: &ResultSet) -> Option<Self> {
        if rows.is_empty() || rows.len() > MAX_CHART_ROWS || rows.columns.len() < 2 {
            return None;
        }

        let numeric = rows.columns_of_kind(ColumnKind::Numeric).len();
        let text = rows.columns_of_kind(ColumnKind::Text).len();

        let kind = if text >= 1 && numeric >= 1 {
            if rows.len() <= MAX_BAR_ROWS {
                ChartKind::Bar
            } else {
                ChartKind::Line
            }
        } else if numeric >= 2 {
            ChartKind::Scatter
        } else {
            ChartKind::Bar
        };

        Self::new(kind, rows)
    }
}

impl fmt::Display for ChartSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} chart \"{}\" (x: {}, y: {})",
            self.kind.as_str(),
            self.title,
            self.x,
            self.y
        )
    }
}
