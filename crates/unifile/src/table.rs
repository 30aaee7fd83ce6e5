//! Row normalization into the canonical table schema.
//!
//! Every table produced by unifile exposes the same ten columns in the same
//! order, whichever extractor produced its units. Missing fields become null
//! cells rather than missing columns.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::types::Unit;

/// Column names, in output order.
pub const CANONICAL_COLUMNS: [&str; 10] = [
    "source_path",
    "source_name",
    "file_type",
    "unit_type",
    "unit_id",
    "content",
    "char_count",
    "metadata",
    "status",
    "error",
];

/// One row of the output table.
///
/// All cells are optional so that loosely shaped records (plugin output, replayed
/// JSON) normalize to nulls instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Row {
    pub source_path: Option<String>,
    pub source_name: Option<String>,
    pub file_type: Option<String>,
    pub unit_type: Option<String>,
    pub unit_id: Option<String>,
    pub content: Option<String>,
    pub char_count: Option<u64>,
    pub metadata: Option<serde_json::Map<String, Value>>,
    pub status: Option<String>,
    pub error: Option<String>,
}

impl Row {
    /// Cells in canonical column order.
    pub fn cells(&self) -> [Value; 10] {
        fn opt<T: Into<Value> + Clone>(v: &Option<T>) -> Value {
            v.clone().map(Into::into).unwrap_or(Value::Null)
        }
        [
            opt(&self.source_path),
            opt(&self.source_name),
            opt(&self.file_type),
            opt(&self.unit_type),
            opt(&self.unit_id),
            opt(&self.content),
            opt(&self.char_count),
            self.metadata.clone().map(Value::Object).unwrap_or(Value::Null),
            opt(&self.status),
            opt(&self.error),
        ]
    }

    pub fn get(&self, column: &str) -> Option<Value> {
        let idx = CANONICAL_COLUMNS.iter().position(|c| *c == column)?;
        Some(self.cells()[idx].clone())
    }

    /// Metadata value by key, if the metadata cell is present.
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref().and_then(|m| m.get(key))
    }
}

impl From<&Unit> for Row {
    fn from(unit: &Unit) -> Self {
        let metadata = unit
            .metadata()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<serde_json::Map<_, _>>();
        Row {
            source_path: Some(unit.source_path().to_string_lossy().into_owned()),
            source_name: Some(unit.source_name().to_string()),
            file_type: Some(unit.file_type().to_string()),
            unit_type: Some(unit.unit_type().as_str().to_string()),
            unit_id: Some(unit.unit_id().to_string()),
            content: Some(unit.content().to_string()),
            char_count: Some(unit.char_count() as u64),
            metadata: Some(metadata),
            status: Some(unit.status().as_str().to_string()),
            error: unit.error_message().map(str::to_string),
        }
    }
}

/// An ordered collection of rows in the canonical schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Normalize extractor output into a table.
    pub fn from_units(units: &[Unit]) -> Self {
        Self {
            rows: units.iter().map(Row::from).collect(),
        }
    }

    /// Normalize loosely shaped JSON records.
    ///
    /// Keys outside the canonical schema are dropped and absent keys become null.
    /// A record that is not a JSON object fails with a serialization error.
    pub fn from_records(records: Vec<Value>) -> Result<Self> {
        let rows = records
            .into_iter()
            .map(|record| {
                let record = match record {
                    Value::Object(mut map) => {
                        map.retain(|k, _| CANONICAL_COLUMNS.contains(&k.as_str()));
                        Value::Object(map)
                    }
                    other => other,
                };
                serde_json::from_value::<Row>(record).map_err(Into::into)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rows })
    }

    pub fn columns(&self) -> &'static [&'static str] {
        &CANONICAL_COLUMNS
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// True when every row has `status = ok`.
    pub fn all_ok(&self) -> bool {
        self.rows.iter().all(|r| r.status.as_deref() == Some("ok"))
    }

    /// One JSON array per row, cells in canonical order.
    pub fn to_json_lines(&self) -> Result<String> {
        let mut out = String::new();
        for row in &self.rows {
            out.push_str(&serde_json::to_string(&row.cells())?);
            out.push('\n');
        }
        Ok(out)
    }
}

impl FromIterator<Row> for Table {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnitType;
    use serde_json::json;
    use std::path::Path;

    #[test]
    fn test_columns_are_canonical_for_empty_table() {
        let table = Table::empty();
        assert_eq!(table.columns(), &CANONICAL_COLUMNS);
        assert!(table.is_empty());
    }

    #[test]
    fn test_from_units_preserves_fields() {
        let unit = Unit::ok(Path::new("/data/a.txt"), "txt", UnitType::Block, "2", "hello").with_metadata("block_type", "paragraph");
        let table = Table::from_units(&[unit]);
        let row = &table.rows()[0];
        assert_eq!(row.unit_type.as_deref(), Some("block"));
        assert_eq!(row.char_count, Some(5));
        assert_eq!(row.status.as_deref(), Some("ok"));
        assert_eq!(row.error, None);
        assert_eq!(row.metadata_value("block_type"), Some(&json!("paragraph")));
    }

    #[test]
    fn test_from_records_fills_nulls_and_drops_unknown_keys() {
        let table = Table::from_records(vec![
            json!({"content": "x", "status": "ok", "extra": 1}),
            json!({"unit_id": "7", "source_name": "b.csv"}),
        ])
        .unwrap();

        assert_eq!(table.len(), 2);
        let first = table.rows()[0].cells();
        assert_eq!(first[5], json!("x"));
        assert_eq!(first[0], Value::Null);
        assert_eq!(first[7], Value::Null);

        let second = &table.rows()[1];
        assert_eq!(second.get("unit_id"), Some(json!("7")));
        assert_eq!(second.get("content"), Some(Value::Null));
        assert_eq!(second.get("nope"), None);
    }

    #[test]
    fn test_from_records_rejects_non_objects() {
        assert!(Table::from_records(vec![json!([1, 2])]).is_err());
    }

    #[test]
    fn test_cells_follow_canonical_order() {
        let unit = Unit::error(Path::new("/data/x.pdf"), "pdf", UnitType::Page, "1", "bad page");
        let table = Table::from_units(&[unit]);
        let cells = table.rows()[0].cells();
        assert_eq!(cells[1], json!("x.pdf"));
        assert_eq!(cells[3], json!("page"));
        assert_eq!(cells[8], json!("error"));
        assert_eq!(cells[9], json!("bad page"));
        assert!(!table.all_ok());
    }

    #[test]
    fn test_json_lines_one_line_per_row() {
        let units = vec![
            Unit::ok(Path::new("/d/a.txt"), "txt", UnitType::File, "0", "a"),
            Unit::ok(Path::new("/d/a.txt"), "txt", UnitType::File, "1", "b"),
        ];
        let out = Table::from_units(&units).to_json_lines().unwrap();
        assert_eq!(out.lines().count(), 2);
    }
}
