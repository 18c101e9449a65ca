//! Table extraction.
//!
//! A table is a rectangular region of the record array. Its header is
//! either the first row of the region or a configured list of names.
//! The remaining rows are read in one of three shapes:
//!
//! - rows: a list of `{header: value}` objects (default)
//! - columns: `{header: [values...]}` (`ParseAsArray`)
//! - single row: the first data row as one object (`ParseSingleRow`)
//!
//! End coordinates are inclusive; a negative end means "last row" or
//! "last column of the start row".

use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::field_name;
use crate::error::{ExtractError, ExtractResult, LocateError};
use crate::models::{Cell, Document, Value};
use crate::transform::datatype::DataType;
use crate::transform::locate::{find_cell, find_value, inclusive_end};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TableLocation {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_location: Option<Cell>,
    pub start_cell: Cell,
    pub end_cell: Cell,
    pub header_names: Vec<String>,
    pub column_data_types: Vec<DataType>,
    pub table_has_header: bool,
    pub auto_column_data_types: bool,
    pub skip_blank_data: bool,
    pub parse_as_array: bool,
    pub parse_single_row: bool,
    /// Emit one document per table row.
    pub parse_separated: bool,
    /// With `parse_separated`: merge row fields into the document instead
    /// of nesting them under the table name.
    pub ignore_nesting: bool,
}

/// Extracted table content.
#[derive(Debug, Clone, PartialEq)]
pub enum TableData {
    Rows(Vec<Document>),
    Columns(BTreeMap<String, Vec<Value>>),
    Row(Document),
}

impl TableData {
    pub fn into_value(self) -> Value {
        match self {
            TableData::Rows(rows) => Value::Array(rows.into_iter().map(Value::Object).collect()),
            TableData::Columns(columns) => {
                Value::Object(columns.into_iter().map(|(k, v)| (k, Value::Array(v))).collect())
            }
            TableData::Row(row) => Value::Object(row),
        }
    }
}

/// Resolved geometry of a table.
struct Region {
    headers: Vec<String>,
    types: Vec<DataType>,
    rows: Range<usize>,
    columns: Range<usize>,
}

impl TableLocation {
    /// Check the configuration on its own, without any records.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() && self.name_location.is_none() {
            return Err("either Name or NameLocation must be set".into());
        }
        if self.start_cell.row < 0 || self.start_cell.column < 0 {
            return Err(format!("StartCell {} cannot be negative", self.start_cell));
        }
        if self.end_cell.row >= 0 && self.end_cell.row < self.start_cell.row {
            return Err(format!("EndCell row {} is before StartCell row {}", self.end_cell.row, self.start_cell.row));
        }
        if self.table_has_header == !self.header_names.is_empty() {
            return Err("exactly one of TableHasHeader and HeaderNames must be set".into());
        }
        if self.auto_column_data_types == !self.column_data_types.is_empty() {
            return Err("exactly one of AutoColumnDataTypes and ColumnDataTypes must be set".into());
        }
        if self.parse_separated && (self.parse_as_array || self.parse_single_row) {
            return Err("ParseSeparated cannot be combined with ParseAsArray or ParseSingleRow".into());
        }
        if self.parse_as_array && self.parse_single_row {
            return Err("ParseAsArray and ParseSingleRow are mutually exclusive".into());
        }

        let mut counts = Vec::new();
        if !self.header_names.is_empty() {
            counts.push(("HeaderNames", self.header_names.len()));
        }
        if !self.column_data_types.is_empty() {
            counts.push(("ColumnDataTypes", self.column_data_types.len()));
        }
        if self.end_cell.column >= 0 {
            let width = self.end_cell.column - self.start_cell.column + 1;
            if width < 1 {
                return Err(format!(
                    "EndCell column {} is before StartCell column {}",
                    self.end_cell.column, self.start_cell.column
                ));
            }
            for (what, count) in &counts {
                if *count as i64 != width {
                    return Err(format!("{what} has {count} entries but the table spans {width} columns"));
                }
            }
        }
        if let [(_, a), (_, b)] = counts.as_slice() {
            if a != b {
                return Err(format!("HeaderNames has {a} entries but ColumnDataTypes has {b}"));
            }
        }
        Ok(())
    }

    /// Literal name if set, otherwise the text at `name_location`.
    pub fn resolve_name(&self, records: &[Vec<String>], keep_spaces: bool) -> ExtractResult<String> {
        if !self.name.is_empty() {
            return Ok(self.name.clone());
        }
        let cell = self.name_location.ok_or(ExtractError::Unnamed { what: "table" })?;
        let name = find_cell(records, cell).map_err(|source| ExtractError::Name { what: "table", source })?;
        Ok(field_name(name.to_string(), keep_spaces))
    }

    /// Extract the table in the shape selected by its flags.
    pub fn parse(&self, records: &[Vec<String>], keep_spaces: bool) -> ExtractResult<(String, TableData)> {
        let name = self.resolve_name(records, keep_spaces)?;
        let region = self.region(records, keep_spaces)?;

        let data = if self.parse_as_array {
            TableData::Columns(self.read_columns(records, &region)?)
        } else if self.parse_single_row {
            match region.rows.clone().next() {
                Some(row) => TableData::Row(self.read_row(records, &region, row)?),
                None => TableData::Row(Document::new()),
            }
        } else {
            let mut rows = Vec::with_capacity(region.rows.len());
            for row in region.rows.clone() {
                rows.push(self.read_row(records, &region, row)?);
            }
            TableData::Rows(rows)
        };
        Ok((name, data))
    }

    fn region(&self, records: &[Vec<String>], keep_spaces: bool) -> ExtractResult<Region> {
        let (start_row, start_column) = self.start_cell.position()?;

        let column_end = match usize::try_from(self.end_cell.column) {
            Ok(end) => end + 1,
            Err(_) => records
                .get(start_row)
                .ok_or(LocateError::RowOutOfBounds { row: start_row, rows: records.len() })?
                .len(),
        };
        let columns = start_column..column_end.max(start_column);
        let mut rows = start_row..inclusive_end(records.len(), self.end_cell.row);

        let headers: Vec<String> = if self.table_has_header {
            let headers = columns
                .clone()
                .map(|column| find_value(records, start_row, column).map(str::to_string))
                .collect::<Result<_, _>>()?;
            rows.start += 1;
            headers
        } else {
            self.header_names.clone()
        };
        let headers: Vec<String> = headers.into_iter().map(|h| field_name(h, keep_spaces)).collect();

        if headers.len() != columns.len() {
            return Err(ExtractError::HeaderArity { headers: headers.len(), columns: columns.len() });
        }

        let types = if self.auto_column_data_types {
            vec![DataType::Auto; columns.len()]
        } else {
            self.column_data_types.clone()
        };
        if types.len() != columns.len() {
            return Err(ExtractError::TypeArity { types: types.len(), columns: columns.len() });
        }

        Ok(Region { headers, types, rows, columns })
    }

    fn read_cell(&self, records: &[Vec<String>], region: &Region, row: usize, n: usize) -> ExtractResult<Value> {
        let column = region.columns.start + n;
        let raw = find_value(records, row, column)?;
        let data_type = region.types[n];
        data_type.read(raw).map_err(|source| ExtractError::Coerce {
            target: format!("cell ({row}, {column}) with header ({})", region.headers[n]),
            data_type,
            source,
        })
    }

    fn read_row(&self, records: &[Vec<String>], region: &Region, row: usize) -> ExtractResult<Document> {
        let mut document = Document::new();
        for (n, header) in region.headers.iter().enumerate() {
            let value = self.read_cell(records, region, row, n)?;
            if value.is_null() && self.skip_blank_data {
                continue;
            }
            let key = if region.types[n] == DataType::Split {
                format!("{header}_{}", value.type_name())
            } else {
                header.clone()
            };
            document.insert(key, value);
        }
        Ok(document)
    }

    fn read_columns(&self, records: &[Vec<String>], region: &Region) -> ExtractResult<BTreeMap<String, Vec<Value>>> {
        let mut columns = BTreeMap::new();
        for (n, header) in region.headers.iter().enumerate() {
            let mut values = Vec::with_capacity(region.rows.len());
            for row in region.rows.clone() {
                values.push(self.read_cell(records, region, row, n)?);
            }
            columns.insert(header.clone(), values);
        }
        Ok(columns)
    }
}
