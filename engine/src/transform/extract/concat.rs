//! Concatenated-cell extraction.

use serde::{Deserialize, Serialize};

use super::{check_naming, resolve_name};
use crate::error::{ExtractError, ExtractResult};
use crate::models::{Cell, Value};
use crate::transform::datatype::DataType;
use crate::transform::locate::find_cell;

/// Joins several cells with a delimiter and reads the result as one field.
///
/// Typical use: a date and a time stored in separate cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ConcatCellLocation {
    pub cells: Vec<Cell>,
    pub delimiter: String,
    pub data_type: DataType,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_cell: Option<Cell>,
}

impl ConcatCellLocation {
    pub fn validate(&self) -> Result<(), String> {
        check_naming(&self.name, self.name_cell)
    }

    pub fn parse(&self, records: &[Vec<String>]) -> ExtractResult<(String, Value)> {
        let name = resolve_name(&self.name, self.name_cell, records, "concatCell")?;

        let mut parts = Vec::with_capacity(self.cells.len());
        for &cell in &self.cells {
            let raw = find_cell(records, cell).map_err(|source| ExtractError::Value { cell, source })?;
            parts.push(raw);
        }
        let joined = parts.join(&self.delimiter);

        let value = self.data_type.read(&joined).map_err(|source| ExtractError::Coerce {
            target: format!("concatCell ({name})"),
            data_type: self.data_type,
            source,
        })?;
        Ok((name, value))
    }
}
