//! Table and column metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Declared type as reported by the database (may be empty).
    #[serde(rename = "type")]
    pub data_type: String,
    /// Whether the column accepts NULL.
    pub nullable: bool,
}

impl ColumnInfo {
    /// Create a column description.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
        }
    }
}

/// Complete schema of a database: table name to ordered columns.
///
/// Always replaced as a whole, never patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatabaseSchema {
    tables: BTreeMap<String, Vec<ColumnInfo>>,
}

impl DatabaseSchema {
    /// Create an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style table insertion.
    #[must_use]
    pub fn with_table(mut self, name: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        self.insert_table(name, columns);
        self
    }

    /// Add or replace a table.
    pub fn insert_table(&mut self, name: impl Into<String>, columns: Vec<ColumnInfo>) {
        self.tables.insert(name.into(), columns);
    }

    /// Columns of a table.
    #[must_use]
    pub fn columns(&self, table: &str) -> Option<&[ColumnInfo]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    /// Table names in sorted order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Iterate over tables and their columns.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &[ColumnInfo])> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` if the schema has no tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Render as the schema context given to the SQL generator.
    ///
    /// ```text
    /// Table: sales
    ///   Columns: sale_id (INTEGER), total_price (REAL)
    /// ```
    ///
    /// Tables are separated by a blank line.
    #[must_use]
    pub fn render(&self) -> String {
        self.tables
            .iter()
            .map(|(table, columns)| {
                let cols = columns
                    .iter()
                    .map(|c| format!("{} ({})", c.name, c.data_type))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Table: {table}\n  Columns: {cols}")
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DatabaseSchema {
        DatabaseSchema::new()
            .with_table(
                "sales",
                vec![
                    ColumnInfo::new("sale_id", "INTEGER", false),
                    ColumnInfo::new("total_price", "REAL", true),
                ],
            )
            .with_table("customers", vec![ColumnInfo::new("name", "TEXT", true)])
    }

    #[test]
    fn test_render() {
        assert_eq!(
            sample().render(),
            "Table: customers\n  Columns: name (TEXT)\n\n\
             Table: sales\n  Columns: sale_id (INTEGER), total_price (REAL)"
        );
        assert_eq!(DatabaseSchema::new().render(), "");
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["sales"][1]["name"], "total_price");
        assert_eq!(json["sales"][1]["type"], "REAL");
        assert_eq!(json["sales"][1]["nullable"], true);

        let back: DatabaseSchema = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_lookup() {
        let schema = sample();
        assert_eq!(schema.table_names().collect::<Vec<_>>(), vec!["customers", "sales"]);
        assert_eq!(schema.columns("sales").map(<[ColumnInfo]>::len), Some(2));
        assert!(schema.columns("orders").is_none());
    }
}
