//! CSV/TSV extractor.

use std::path::Path;

use crate::Result;
use crate::core::config::{ExtractorSettings, RuntimeOption};
use crate::core::dispatch::ExtractionContext;
use crate::extraction::delimited::{delimiter_for, parse_delimited};
use crate::plugins::{Extractor, path_extension};
use crate::types::{Unit, UnitType};

pub(crate) const EXTENSIONS: &[&str] = &["csv", "tsv"];

/// Emits delimited files as a table unit, raw text, or one unit per cell.
///
/// | `table_cells` | `enable_tables` | output                                   |
/// |---------------|-----------------|------------------------------------------|
/// | on            | any             | one `cell` unit per non-empty cell      |
/// | off           | on              | one `table` unit, rows tab-joined         |
/// | off           | off             | one `file` unit with the raw text         |
#[derive(Debug, Clone)]
pub struct DelimitedExtractor {
    tables: bool,
    cells: bool,
}

impl Default for DelimitedExtractor {
    fn default() -> Self {
        Self {
            tables: true,
            cells: false,
        }
    }
}

impl Extractor for DelimitedExtractor {
    fn name(&self) -> &str {
        "delimited"
    }

    fn accepted_options(&self) -> &[RuntimeOption] {
        &[RuntimeOption::EnableTables, RuntimeOption::TableCells]
    }

    fn configure(&mut self, settings: &ExtractorSettings) {
        if let Some(tables) = settings.bool(RuntimeOption::EnableTables) {
            self.tables = tables;
        }
        if let Some(cells) = settings.bool(RuntimeOption::TableCells) {
            self.cells = cells;
        }
    }

    fn extract(&self, path: &Path, _ctx: &ExtractionContext<'_>) -> Result<Vec<Unit>> {
        let text = match super::read_text(path) {
            Ok(text) => text,
            Err(e) => return Ok(super::failure(path, e)),
        };

        if !self.tables && !self.cells {
            return Ok(vec![Unit::ok(path, "", UnitType::File, "0", text)]);
        }

        let delimiter = delimiter_for(path_extension(path).as_deref().unwrap_or_default());
        let rows = match parse_delimited(&text, delimiter) {
            Ok(rows) => rows,
            Err(e) => return Ok(super::failure(path, e)),
        };

        if self.cells {
            let mut units = Vec::new();
            for (r, row) in rows.iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    if cell.trim().is_empty() {
                        continue;
                    }
                    units.push(
                        Unit::ok(path, "", UnitType::Cell, format!("{},{}", r, c), cell.as_str())
                            .with_metadata("row", r)
                            .with_metadata("col", c),
                    );
                }
            }
            return Ok(units);
        }

        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let content = rows.iter().map(|row| row.join("\t")).collect::<Vec<_>>().join("\n");
        Ok(vec![
            Unit::ok(path, "", UnitType::Table, "0", content)
                .with_metadata("rows", rows.len())
                .with_metadata("cols", cols),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RuntimeOptions;
    use crate::core::dispatch::Dispatcher;
    use crate::plugins::{ExtractorRegistry, default_factory};
    use serde_json::json;
    use tempfile::tempdir;

    fn extract(name: &str, body: &str, options: &RuntimeOptions) -> Vec<Unit> {
        let mut registry = ExtractorRegistry::new();
        for ext in EXTENSIONS {
            registry.register(ext, default_factory::<DelimitedExtractor>()).unwrap();
        }
        let dir = tempdir().unwrap();
        let file = dir.path().join(name);
        std::fs::write(&file, body).unwrap();
        Dispatcher::with_registry(registry).extract_units(&file, options, None).unwrap()
    }

    #[test]
    fn test_csv_as_table_unit() {
        let units = extract("people.csv", "name,age\n\"Lovelace, Ada\",36\n", &RuntimeOptions::default());
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].unit_type(), UnitType::Table);
        assert_eq!(units[0].content(), "name\tage\nLovelace, Ada\t36");
        assert_eq!(units[0].metadata()["rows"], json!(2));
        assert_eq!(units[0].metadata()["cols"], json!(2));
        assert_eq!(units[0].file_type(), "csv");
    }

    #[test]
    fn test_tables_off_keeps_raw_text() {
        let options = RuntimeOptions {
            enable_tables: Some(false),
            ..Default::default()
        };
        let units = extract("raw.csv", "a,b\n1,2\n", &options);
        assert_eq!(units[0].unit_type(), UnitType::File);
        assert_eq!(units[0].content(), "a,b\n1,2\n");
    }

    #[test]
    fn test_tsv_cells() {
        let options = RuntimeOptions {
            table_cells: Some(true),
            ..Default::default()
        };
        let units = extract("grid.tsv", "x\ty\n1\t\n", &options);
        let ids: Vec<_> = units.iter().map(|u| u.unit_id().to_string()).collect();
        assert_eq!(ids, vec!["0,0", "0,1", "1,0"]);
        assert!(units.iter().all(|u| u.unit_type() == UnitType::Cell));
    }

    #[test]
    fn test_unterminated_quote_is_error_unit() {
        let units = extract("bad.csv", "a,b\n\"open,2\n", &RuntimeOptions::default());
        assert_eq!(units.len(), 1);
        assert!(!units[0].is_ok());
        assert_eq!(units[0].unit_id(), "body");
        assert_eq!(units[0].metadata()["exception"], json!("parsing"));
    }
}
