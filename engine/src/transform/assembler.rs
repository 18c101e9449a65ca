//! Document assembly.
//!
//! Runs every extractor of a [`Csv`] against processed records and merges
//! the results into documents. Fields are inserted in a fixed order:
//! cells, concatenated cells, non-separated tables, time fields, and
//! finally the separated table, which fans the document out into one
//! document per table row.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};

use crate::error::{ConfigError, ShapeError, ShapeResult};
use crate::logs::log_info_indent;
use crate::models::{Document, Value};
use crate::transform::config::Csv;
use crate::transform::datatype::to_rfc3339;
use crate::transform::extract::{field_name, TableData};

/// Extraction results grouped by extractor kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segments {
    pub cells: Document,
    pub concat_cells: Document,
    pub tables: BTreeMap<String, TableData>,
    pub timestamps: BTreeMap<String, DateTime<FixedOffset>>,
}

/// Assembles documents from records according to a configuration.
pub struct Assembler<'a> {
    config: &'a Csv,
}

impl<'a> Assembler<'a> {
    pub fn new(config: &'a Csv) -> Self {
        Self { config }
    }

    /// Insert `key`, failing on collisions when the configuration asks to.
    fn insert<V>(
        &self,
        target: &mut BTreeMap<String, V>,
        key: String,
        value: V,
        origin: &'static str,
    ) -> ShapeResult<()> {
        if self.config.fault_on_duplicate && target.contains_key(&key) {
            return Err(ShapeError::Duplicate { key, origin });
        }
        target.insert(key, value);
        Ok(())
    }

    fn extract_cells(&self, records: &[Vec<String>], document: &mut Document) -> ShapeResult<()> {
        for (i, cell) in self.config.cell_locations.iter().enumerate() {
            let (name, value) = cell.parse(records).map_err(|source| ShapeError::Extract {
                what: format!("cell location {i}"),
                source,
            })?;
            self.insert(document, field_name(name, self.config.keep_spaces), value, "cell")?;
        }
        Ok(())
    }

    fn extract_concat_cells(&self, records: &[Vec<String>], document: &mut Document) -> ShapeResult<()> {
        for (i, concat) in self.config.concat_cell_locations.iter().enumerate() {
            let (name, value) = concat.parse(records).map_err(|source| ShapeError::Extract {
                what: format!("concat cell location {i}"),
                source,
            })?;
            self.insert(document, field_name(name, self.config.keep_spaces), value, "concatCell")?;
        }
        Ok(())
    }

    fn extract_tables(&self, records: &[Vec<String>], separated: bool) -> ShapeResult<Vec<(String, TableData)>> {
        let mut tables = Vec::new();
        for (i, table) in self.config.table_locations.iter().enumerate() {
            if table.parse_separated != separated {
                continue;
            }
            let parsed = table.parse(records, self.config.keep_spaces).map_err(|source| ShapeError::Table {
                name: if table.name.is_empty() { format!("table location {i}") } else { table.name.clone() },
                source,
            })?;
            tables.push(parsed);
        }
        Ok(tables)
    }

    fn extract_timestamps(&self, records: &[Vec<String>]) -> ShapeResult<Vec<(String, DateTime<FixedOffset>)>> {
        let mut timestamps = Vec::new();
        for field in self.config.time_fields.iter().filter(|f| !f.is_blank()) {
            let time = field.parse(records).map_err(|source| ShapeError::Extract {
                what: format!("time field ({})", field.name),
                source,
            })?;
            timestamps.push((field.name.clone(), time));
        }
        Ok(timestamps)
    }

    /// Build the documents for one record array.
    ///
    /// Without a separated table this is exactly one document. With one,
    /// it is one document per data row of that table; a table without
    /// data rows leaves the single base document.
    pub fn assemble(&self, records: &[Vec<String>]) -> ShapeResult<Vec<Document>> {
        let mut base = Document::new();
        self.extract_cells(records, &mut base)?;
        self.extract_concat_cells(records, &mut base)?;

        for (name, data) in self.extract_tables(records, false)? {
            self.insert(&mut base, name, data.into_value(), "table")?;
        }
        for (name, time) in self.extract_timestamps(records)? {
            self.insert(&mut base, name, Value::String(to_rfc3339(&time)), "timeField")?;
        }

        let Some(table) = self.config.separated_tables().next() else {
            log_info_indent(format!("{} fields", base.len()), 1);
            return Ok(vec![base]);
        };

        let (name, rows) = match self.extract_tables(records, true)?.pop() {
            Some((name, TableData::Rows(rows))) => (name, rows),
            _ => {
                return Err(ShapeError::Config(ConfigError::Invariant(format!(
                    "separated table ({}) must be parsed as rows",
                    table.name
                ))))
            }
        };
        if rows.is_empty() {
            log_info_indent(format!("table ({name}) has no rows, {} fields", base.len()), 1);
            return Ok(vec![base]);
        }

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let mut document = base.clone();
            if table.ignore_nesting {
                for (key, value) in row {
                    self.insert(&mut document, key, value, "table")?;
                }
            } else {
                self.insert(&mut document, name.clone(), Value::Object(row), "table")?;
            }
            documents.push(document);
        }
        log_info_indent(format!("table ({name}) separated into {} documents", documents.len()), 1);
        Ok(documents)
    }

    /// Run every extractor and return the results grouped by kind.
    pub fn extract_segmented(&self, records: &[Vec<String>]) -> ShapeResult<Segments> {
        let mut segments = Segments::default();
        self.extract_cells(records, &mut segments.cells)?;
        self.extract_concat_cells(records, &mut segments.concat_cells)?;
        let tables = self.extract_tables(records, false)?.into_iter().chain(self.extract_tables(records, true)?);
        for (name, data) in tables {
            self.insert(&mut segments.tables, name, data, "table")?;
        }
        for (name, time) in self.extract_timestamps(records)? {
            self.insert(&mut segments.timestamps, name, time, "timeField")?;
        }
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::Cell;
    use crate::transform::datatype::DataType;
    use crate::transform::extract::{CellLocation, ConcatCellLocation, TableLocation, TimeField};

    fn records() -> Vec<Vec<String>> {
        [
            "Machine No,7",
            "Date,240910",
            "Time,125309",
            "Shot,Pressure,Result",
            "101,54.6,OK",
            "102,,NG",
        ]
        .iter()
        .map(|line| line.split(',').map(str::to_string).collect())
        .collect()
    }

    fn shots(separated: bool, ignore_nesting: bool) -> TableLocation {
        TableLocation {
            name: "shots".into(),
            start_cell: Cell::new(3, 0),
            end_cell: Cell::new(-1, -1),
            table_has_header: true,
            column_data_types: vec![DataType::Int64, DataType::Auto, DataType::Bool],
            skip_blank_data: true,
            parse_separated: separated,
            ignore_nesting,
            ..Default::default()
        }
    }

    fn config() -> Csv {
        Csv {
            cell_locations: vec![CellLocation::named_by(Cell::new(0, 1), DataType::Int64, Cell::new(0, 0))],
            concat_cell_locations: vec![ConcatCellLocation {
                cells: vec![Cell::new(1, 1), Cell::new(2, 1)],
                delimiter: "T".into(),
                data_type: DataType::String,
                name: "stamp".into(),
                name_cell: None,
            }],
            table_locations: vec![shots(false, false)],
            time_fields: vec![
                TimeField {
                    cells: vec![Cell::new(1, 1), Cell::new(2, 1)],
                    layout: "060102150405".into(),
                    name: "@timestamp".into(),
                },
                TimeField::default(),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_single_document() {
        let config = config();
        let documents = Assembler::new(&config).assemble(&records()).unwrap();
        assert_eq!(documents.len(), 1);

        let document = &documents[0];
        assert_eq!(document["Machine_No"], Value::Int64(7));
        assert_eq!(document["stamp"], Value::from("240910T125309"));
        assert!(document.contains_key("@timestamp"));

        let shots = document["shots"].as_array().unwrap();
        assert_eq!(shots.len(), 2);
        assert_eq!(shots[0].get("Result"), Some(&Value::Bool(true)));
        assert_eq!(shots[1].get("Pressure"), None);
    }

    #[test]
    fn test_keep_spaces() {
        let config = Csv { keep_spaces: true, ..config() };
        let documents = Assembler::new(&config).assemble(&records()).unwrap();
        assert!(documents[0].contains_key("Machine No"));
    }

    #[test]
    fn test_separated_nested() {
        let config = Csv { table_locations: vec![shots(true, false)], ..config() };
        let documents = Assembler::new(&config).assemble(&records()).unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[1]["Machine_No"], Value::Int64(7));
        assert_eq!(documents[1]["shots"].get("Shot"), Some(&Value::Int64(102)));
    }

    #[test]
    fn test_separated_ignore_nesting() {
        let config = Csv { table_locations: vec![shots(true, true)], ..config() };
        let documents = Assembler::new(&config).assemble(&records()).unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0]["Shot"], Value::Int64(101));
        assert_eq!(documents[0]["Pressure"], Value::from(54.6));
        assert!(!documents[1].contains_key("Pressure"));
        assert!(!documents[0].contains_key("shots"));
    }

    #[test]
    fn test_separated_without_rows() {
        let mut table = shots(true, true);
        table.end_cell = Cell::new(3, -1);
        let config = Csv { table_locations: vec![table], ..config() };
        let documents = Assembler::new(&config).assemble(&records()).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0]["Machine_No"], Value::Int64(7));
        assert!(documents[0].contains_key("@timestamp"));
        assert!(!documents[0].contains_key("Shot"));
    }

    #[test]
    fn test_separated_must_be_rows() {
        let table = TableLocation { parse_as_array: true, ..shots(true, false) };
        let config = Csv { table_locations: vec![table], ..config() };
        let err = Assembler::new(&config).assemble(&records()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvariantViolated);
        assert!(err.to_string().contains("shots"));
    }

    #[test]
    fn test_duplicates() {
        let mut config = config();
        config.concat_cell_locations[0].name = "Machine_No".into();
        assert_eq!(Assembler::new(&config).assemble(&records()).unwrap()[0]["Machine_No"], Value::from("240910T125309"));

        config.fault_on_duplicate = true;
        let err = Assembler::new(&config).assemble(&records()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);
    }

    #[test]
    fn test_extract_error_context() {
        let mut config = config();
        config.cell_locations[0].location = Cell::new(9, 9);
        let err = Assembler::new(&config).assemble(&records()).unwrap_err();
        assert!(err.to_string().contains("cell location 0"));
        assert_eq!(err.kind(), ErrorKind::BoundsExceeded);
    }

    #[test]
    fn test_segmented() {
        let config = Csv { table_locations: vec![shots(true, false)], ..config() };
        let segments = Assembler::new(&config).extract_segmented(&records()).unwrap();
        assert_eq!(segments.cells.len(), 1);
        assert_eq!(segments.concat_cells["stamp"], Value::from("240910T125309"));
        assert!(matches!(segments.tables.get("shots"), Some(TableData::Rows(rows)) if rows.len() == 2));
        assert_eq!(segments.timestamps.len(), 1);
    }

    #[test]
    fn test_segmented_duplicates() {
        let mut config = Csv { table_locations: vec![shots(false, false), shots(true, false)], ..config() };
        config.time_fields.push(config.time_fields[0].clone());

        let segments = Assembler::new(&config).extract_segmented(&records()).unwrap();
        assert_eq!((segments.tables.len(), segments.timestamps.len()), (1, 1));

        config.fault_on_duplicate = true;
        let err = Assembler::new(&config).extract_segmented(&records()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);
        assert!(err.to_string().contains("table (shots)"));

        config.table_locations.pop();
        let err = Assembler::new(&config).extract_segmented(&records()).unwrap_err();
        assert!(err.to_string().contains("timeField (@timestamp)"));
    }
}
