//! Single-cell extraction.

use serde::{Deserialize, Serialize};

use super::{check_naming, resolve_name};
use crate::error::{ExtractError, ExtractResult};
use crate::models::{Cell, Value};
use crate::transform::datatype::DataType;
use crate::transform::locate::find_cell;

/// Reads one cell as a named, typed field.
///
/// The field name is either the literal `name` or the text found at
/// `name_cell`, never both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CellLocation {
    pub location: Cell,
    pub data_type: DataType,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_cell: Option<Cell>,
}

impl CellLocation {
    pub fn named(location: Cell, data_type: DataType, name: impl Into<String>) -> Self {
        Self { location, data_type, name: name.into(), name_cell: None }
    }

    pub fn named_by(location: Cell, data_type: DataType, name_cell: Cell) -> Self {
        Self { location, data_type, name: String::new(), name_cell: Some(name_cell) }
    }

    pub fn validate(&self) -> Result<(), String> {
        check_naming(&self.name, self.name_cell)
    }

    /// Resolve the field name and read the typed value.
    pub fn parse(&self, records: &[Vec<String>]) -> ExtractResult<(String, Value)> {
        let name = resolve_name(&self.name, self.name_cell, records, "cell")?;
        let raw = find_cell(records, self.location)
            .map_err(|source| ExtractError::Value { cell: self.location, source })?;
        let value = self.data_type.read(raw).map_err(|source| ExtractError::Coerce {
            target: format!("cell {} ({name})", self.location),
            data_type: self.data_type,
            source,
        })?;
        Ok((name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<Vec<String>> {
        vec![
            vec!["Shot".into(), "989392".into()],
            vec!["Version".into(), "D8MJ1-C9".into()],
            vec!["Max".into(), "10".into()],
        ]
    }

    #[test]
    fn test_parse_with_name_cell() {
        let cell = CellLocation::named_by(Cell::new(0, 1), DataType::Int64, Cell::new(0, 0));
        assert_eq!(cell.parse(&records()).unwrap(), ("Shot".to_string(), Value::Int64(989392)));
    }

    #[test]
    fn test_parse_with_literal_name() {
        let cell = CellLocation::named(Cell::new(2, 1), DataType::Float64, "max pressure");
        let (name, value) = cell.parse(&records()).unwrap();
        assert_eq!(name, "max pressure");
        assert_eq!(serde_json::to_string(&value).unwrap(), "10.0");
    }

    #[test]
    fn test_parse_errors() {
        let out_of_bounds = CellLocation::named(Cell::new(3, 0), DataType::Auto, "x");
        assert!(matches!(out_of_bounds.parse(&records()), Err(ExtractError::Value { .. })));

        let bad_name = CellLocation::named_by(Cell::new(0, 1), DataType::Auto, Cell::new(0, 5));
        assert!(matches!(bad_name.parse(&records()), Err(ExtractError::Name { .. })));

        let bad_type = CellLocation::named(Cell::new(1, 1), DataType::Int64, "version");
        assert!(matches!(bad_type.parse(&records()), Err(ExtractError::Coerce { .. })));
    }

    #[test]
    fn test_validate_naming() {
        assert!(CellLocation::named(Cell::new(0, 0), DataType::Auto, "a").validate().is_ok());
        assert!(CellLocation::default().validate().is_err());

        let mut both = CellLocation::named(Cell::new(0, 0), DataType::Auto, "a");
        both.name_cell = Some(Cell::new(0, 1));
        assert!(both.validate().is_err());
    }

    #[test]
    fn test_wire_format() {
        let json = r#"{"Location": {"Row": 4, "Column": 1}, "DataType": 3, "NameCell": {"Row": 4, "Column": 0}}"#;
        let cell: CellLocation = serde_json::from_str(json).unwrap();
        assert_eq!(cell, CellLocation::named_by(Cell::new(4, 1), DataType::Int64, Cell::new(4, 0)));
        assert!(!serde_json::to_string(&cell).unwrap().contains("\"Name\""));
    }

    #[test]
    fn test_literal_name_with_origin_name_cell() {
        let json = r#"{"Location": {"Row": 0, "Column": 1}, "DataType": 3, "Name": "shot", "NameCell": {"Row": 0, "Column": 0}}"#;
        let cell: CellLocation = serde_json::from_str(json).unwrap();
        assert!(cell.validate().is_ok());
        assert_eq!(cell.parse(&records()).unwrap(), ("shot".to_string(), Value::Int64(989392)));
    }
}
