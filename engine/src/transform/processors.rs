//! Record processors.
//!
//! A processor rewrites the record array before any extraction runs.
//! Processors are chained in configuration order; each one consumes the
//! records it is given and returns the replacement.
//!
//! Row and column ends are exclusive. A negative end means "through the
//! end of that dimension".

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ConfigError, ProcessorError};
use crate::models::{Cell, Records};
use crate::transform::locate::exclusive_end;

/// Discriminator of a processor on the wire (`"Type"` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorType {
    MergeColumns = 0,
    MergeRows = 1,
    FillRight = 2,
    ReplaceCell = 3,
    TransposeRow = 4,
    RemoveCellLeft = 5,
}

impl ProcessorType {
    pub const ALL: [ProcessorType; 6] = [
        ProcessorType::MergeColumns,
        ProcessorType::MergeRows,
        ProcessorType::FillRight,
        ProcessorType::ReplaceCell,
        ProcessorType::TransposeRow,
        ProcessorType::RemoveCellLeft,
    ];

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| i64::from(t.tag()) == tag)
    }

    pub fn description(self) -> &'static str {
        match self {
            ProcessorType::MergeColumns => "Join a column range of each row into one cell",
            ProcessorType::MergeRows => "Fold a band of rows into one row, cell by cell",
            ProcessorType::FillRight => "Copy the left neighbour into blank cells",
            ProcessorType::ReplaceCell => "Overwrite one cell",
            ProcessorType::TransposeRow => "Swap rows and columns of a band of rows",
            ProcessorType::RemoveCellLeft => "Delete one cell, shifting the rest of its row left",
        }
    }
}

impl fmt::Display for ProcessorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessorType::MergeColumns => "MergeColumns",
            ProcessorType::MergeRows => "MergeRows",
            ProcessorType::FillRight => "FillRight",
            ProcessorType::ReplaceCell => "ReplaceCell",
            ProcessorType::TransposeRow => "TransposeRow",
            ProcessorType::RemoveCellLeft => "RemoveCellLeft",
        };
        f.write_str(name)
    }
}

/// A step that rewrites the record array.
pub trait RecordProcessor {
    fn name(&self) -> &str;

    fn processor_type(&self) -> ProcessorType;

    fn execute(&self, records: Records) -> Result<Records, ProcessorError>;
}

// =============================================================================
// Bounds helpers
// =============================================================================

/// A resolved half-open band of rows.
#[derive(Debug, Clone, Copy)]
struct RowBand {
    start: usize,
    end: usize,
}

impl RowBand {
    fn resolve(start: i64, end: i64, rows: usize) -> Result<Self, ProcessorError> {
        let start = usize::try_from(start).map_err(|_| ProcessorError::NegativeRow { row: start })?;
        check_order("row", start, end)?;
        if start > rows {
            return Err(ProcessorError::RowOutOfRange { what: "start", row: start as i64, rows });
        }
        if end > rows as i64 {
            return Err(ProcessorError::RowOutOfRange { what: "end", row: end, rows });
        }
        Ok(Self { start, end: exclusive_end(rows, end) })
    }

    fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    fn contains(&self, row: usize) -> bool {
        (self.start..self.end).contains(&row)
    }
}

fn check_order(axis: &'static str, start: usize, end: i64) -> Result<(), ProcessorError> {
    if end >= 0 && end < start as i64 {
        return Err(ProcessorError::EndBeforeStart { axis, start: start as i64, end });
    }
    Ok(())
}

/// Concrete position of a start or target cell.
fn concrete(cell: Cell) -> Result<(usize, usize), ProcessorError> {
    cell.position()
        .map_err(|_| ProcessorError::NegativeStart { row: cell.row, column: cell.column })
}

/// Exclusive column end for one row of a band.
fn column_end(row: usize, columns: usize, start: usize, end: i64) -> Result<usize, ProcessorError> {
    let end = exclusive_end(columns, end);
    if end > columns {
        return Err(ProcessorError::ColumnOutOfRange { row, what: "end", column: end as i64, columns });
    }
    if start > end {
        return Err(ProcessorError::ColumnOutOfRange { row, what: "start", column: start as i64, columns });
    }
    Ok(end)
}

/// All rows of the band must share the length of its first row.
fn band_width(records: &[Vec<String>], band: RowBand) -> Result<usize, ProcessorError> {
    let expected = records[band.start].len();
    for row in band.start + 1..band.end {
        let len = records[row].len();
        if len != expected {
            return Err(ProcessorError::Ragged { row, len, expected });
        }
    }
    Ok(expected)
}

// =============================================================================
// MergeColumns
// =============================================================================

/// Joins columns `[start.column, end.column)` of each row in
/// `[start.row, end.row)` into a single cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MergeColumns {
    pub name: String,
    pub start: Cell,
    pub end: Cell,
    pub delimiter: String,
}

impl RecordProcessor for MergeColumns {
    fn name(&self) -> &str {
        &self.name
    }

    fn processor_type(&self) -> ProcessorType {
        ProcessorType::MergeColumns
    }

    fn execute(&self, records: Records) -> Result<Records, ProcessorError> {
        let (_, start_column) = concrete(self.start)?;
        check_order("column", start_column, self.end.column)?;
        let band = RowBand::resolve(self.start.row, self.end.row, records.len())?;

        let mut output = Vec::with_capacity(records.len());
        for (index, row) in records.into_iter().enumerate() {
            if !band.contains(index) {
                output.push(row);
                continue;
            }

            let end_column = column_end(index, row.len(), start_column, self.end.column)?;
            let mut merged = Vec::with_capacity(row.len() + 1 - (end_column - start_column));
            let mut cells = row.into_iter();
            merged.extend(cells.by_ref().take(start_column));
            let joined: Vec<String> = cells.by_ref().take(end_column - start_column).collect();
            merged.push(joined.join(&self.delimiter));
            merged.extend(cells);
            output.push(merged);
        }
        Ok(output)
    }
}

// =============================================================================
// MergeRows
// =============================================================================

/// Folds rows `[start_row, end_row)` into one row by joining cells
/// column by column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MergeRows {
    pub name: String,
    pub start_row: i64,
    pub end_row: i64,
    pub delimiter: String,
    pub trim_whitespace: bool,
}

impl MergeRows {
    fn join(&self, acc: &str, next: &str) -> String {
        if self.trim_whitespace {
            format!("{}{}{}", acc.trim(), self.delimiter, next.trim()).trim().to_string()
        } else {
            format!("{}{}{}", acc, self.delimiter, next)
        }
    }
}

impl RecordProcessor for MergeRows {
    fn name(&self) -> &str {
        &self.name
    }

    fn processor_type(&self) -> ProcessorType {
        ProcessorType::MergeRows
    }

    fn execute(&self, records: Records) -> Result<Records, ProcessorError> {
        let band = RowBand::resolve(self.start_row, self.end_row, records.len())?;
        if band.len() == 0 {
            return Ok(records);
        }
        band_width(&records, band)?;

        let mut rows = records.into_iter();
        let mut output: Records = rows.by_ref().take(band.start).collect();
        if let Some(mut merged) = rows.next() {
            for row in rows.by_ref().take(band.len() - 1) {
                for (acc, cell) in merged.iter_mut().zip(row) {
                    *acc = self.join(acc, &cell);
                }
            }
            output.push(merged);
        }
        output.extend(rows);
        Ok(output)
    }
}

// =============================================================================
// FillRight
// =============================================================================

/// Fills blank cells with the value of their left neighbour, cascading
/// left to right. Column 0 never changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FillRight {
    pub name: String,
    pub start: Cell,
    pub end: Cell,
}

impl RecordProcessor for FillRight {
    fn name(&self) -> &str {
        &self.name
    }

    fn processor_type(&self) -> ProcessorType {
        ProcessorType::FillRight
    }

    fn execute(&self, mut records: Records) -> Result<Records, ProcessorError> {
        let (_, start_column) = concrete(self.start)?;
        check_order("column", start_column, self.end.column)?;
        let band = RowBand::resolve(self.start.row, self.end.row, records.len())?;

        for index in band.start..band.end {
            let row = &mut records[index];
            let end_column = column_end(index, row.len(), start_column, self.end.column)?;
            for column in start_column.max(1)..end_column {
                if row[column].trim().is_empty() {
                    row[column] = row[column - 1].clone();
                }
            }
        }
        Ok(records)
    }
}

// =============================================================================
// ReplaceCell
// =============================================================================

/// Overwrites one cell with a fixed value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ReplaceCell {
    pub name: String,
    pub cell: Cell,
    pub value: String,
}

impl RecordProcessor for ReplaceCell {
    fn name(&self) -> &str {
        &self.name
    }

    fn processor_type(&self) -> ProcessorType {
        ProcessorType::ReplaceCell
    }

    fn execute(&self, mut records: Records) -> Result<Records, ProcessorError> {
        let slot = cell_mut(&mut records, self.cell)?;
        *slot = self.value.clone();
        Ok(records)
    }
}

fn cell_mut(records: &mut Records, cell: Cell) -> Result<&mut String, ProcessorError> {
    let (row, column) = concrete(cell)?;
    let rows = records.len();
    let cells = records
        .get_mut(row)
        .ok_or(ProcessorError::RowOutOfRange { what: "cell", row: cell.row, rows })?;
    let columns = cells.len();
    cells
        .get_mut(column)
        .ok_or(ProcessorError::ColumnOutOfRange { row, what: "cell", column: cell.column, columns })
}

// =============================================================================
// TransposeRow
// =============================================================================

/// Transposes rows `[start_row, end_row)`: a band of H rows of width W
/// becomes W rows of H cells, spliced in at `start_row`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TransposeRow {
    pub name: String,
    pub start_row: i64,
    pub end_row: i64,
}

impl RecordProcessor for TransposeRow {
    fn name(&self) -> &str {
        &self.name
    }

    fn processor_type(&self) -> ProcessorType {
        ProcessorType::TransposeRow
    }

    fn execute(&self, records: Records) -> Result<Records, ProcessorError> {
        let band = RowBand::resolve(self.start_row, self.end_row, records.len())?;
        if band.len() == 0 {
            return Ok(records);
        }
        let width = band_width(&records, band)?;
        let height = band.len();

        let mut rows = records.into_iter();
        let mut output: Records = rows.by_ref().take(band.start).collect();
        let mut transposed = vec![Vec::with_capacity(height); width];
        for row in rows.by_ref().take(height) {
            for (column, cell) in row.into_iter().enumerate() {
                transposed[column].push(cell);
            }
        }
        output.extend(transposed);
        output.extend(rows);
        Ok(output)
    }
}

// =============================================================================
// RemoveCellLeft
// =============================================================================

/// Deletes one cell; the rest of its row shifts left.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RemoveCellLeft {
    pub name: String,
    pub cell: Cell,
}

impl RecordProcessor for RemoveCellLeft {
    fn name(&self) -> &str {
        &self.name
    }

    fn processor_type(&self) -> ProcessorType {
        ProcessorType::RemoveCellLeft
    }

    fn execute(&self, mut records: Records) -> Result<Records, ProcessorError> {
        cell_mut(&mut records, self.cell)?;
        let (row, column) = concrete(self.cell)?;
        records[row].remove(column);
        Ok(records)
    }
}

// =============================================================================
// Processor (tagged union)
// =============================================================================

/// Any configured processor.
///
/// On the wire a processor is an object whose numeric `"Type"` field
/// selects the variant; the remaining fields belong to that variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Processor {
    MergeColumns(MergeColumns),
    MergeRows(MergeRows),
    FillRight(FillRight),
    ReplaceCell(ReplaceCell),
    TransposeRow(TransposeRow),
    RemoveCellLeft(RemoveCellLeft),
}

impl Processor {
    /// Build the processor registered under `tag` from its JSON body.
    pub fn from_tag(tag: i64, body: serde_json::Value) -> Result<Self, ConfigError> {
        let kind = ProcessorType::from_tag(tag).ok_or(ConfigError::UnknownProcessorType(tag))?;
        let processor = match kind {
            ProcessorType::MergeColumns => Processor::MergeColumns(serde_json::from_value(body)?),
            ProcessorType::MergeRows => Processor::MergeRows(serde_json::from_value(body)?),
            ProcessorType::FillRight => Processor::FillRight(serde_json::from_value(body)?),
            ProcessorType::ReplaceCell => Processor::ReplaceCell(serde_json::from_value(body)?),
            ProcessorType::TransposeRow => Processor::TransposeRow(serde_json::from_value(body)?),
            ProcessorType::RemoveCellLeft => Processor::RemoveCellLeft(serde_json::from_value(body)?),
        };
        Ok(processor)
    }

    fn inner(&self) -> &dyn RecordProcessor {
        match self {
            Processor::MergeColumns(p) => p,
            Processor::MergeRows(p) => p,
            Processor::FillRight(p) => p,
            Processor::ReplaceCell(p) => p,
            Processor::TransposeRow(p) => p,
            Processor::RemoveCellLeft(p) => p,
        }
    }
}

impl RecordProcessor for Processor {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn processor_type(&self) -> ProcessorType {
        self.inner().processor_type()
    }

    fn execute(&self, records: Records) -> Result<Records, ProcessorError> {
        self.inner().execute(records)
    }
}

#[derive(Serialize)]
struct Tagged<'a, T: Serialize> {
    #[serde(rename = "Type")]
    kind: u8,
    #[serde(flatten)]
    body: &'a T,
}

impl Serialize for Processor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let kind = self.processor_type().tag();
        match self {
            Processor::MergeColumns(body) => Tagged { kind, body }.serialize(serializer),
            Processor::MergeRows(body) => Tagged { kind, body }.serialize(serializer),
            Processor::FillRight(body) => Tagged { kind, body }.serialize(serializer),
            Processor::ReplaceCell(body) => Tagged { kind, body }.serialize(serializer),
            Processor::TransposeRow(body) => Tagged { kind, body }.serialize(serializer),
            Processor::RemoveCellLeft(body) => Tagged { kind, body }.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Processor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let body = serde_json::Value::deserialize(deserializer)?;
        let tag = body
            .get("Type")
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| D::Error::custom("processor is missing a numeric Type"))?;
        Processor::from_tag(tag, body).map_err(D::Error::custom)
    }
}

/// Get a description of all available processors
pub fn processors_description() -> String {
    ProcessorType::ALL
        .iter()
        .map(|t| format!("  {} {:<15} {}", t.tag(), t.to_string(), t.description()))
        .collect::<Vec<_>>()
        .join("\n")
}
