//! Field extractors.
//!
//! Each extractor reads a region of the processed record array and
//! produces named fields for the output document:
//!
//! - [`CellLocation`] - one cell
//! - [`ConcatCellLocation`] - several cells joined into one value
//! - [`TimeField`] - several cells parsed as a timestamp
//! - [`TableLocation`] - a rectangular region with a header

pub mod cell;
pub mod concat;
pub mod table;
pub mod timefield;

pub use cell::CellLocation;
pub use concat::ConcatCellLocation;
pub use table::{TableData, TableLocation};
pub use timefield::TimeField;

use crate::error::{ExtractError, ExtractResult};
use crate::models::Cell;
use crate::transform::locate::find_cell;

/// Literal name if set, otherwise the text of the name cell.
pub(crate) fn resolve_name(
    name: &str,
    name_cell: Option<Cell>,
    records: &[Vec<String>],
    what: &'static str,
) -> ExtractResult<String> {
    if !name.is_empty() {
        return Ok(name.to_string());
    }
    let cell = name_cell.ok_or(ExtractError::Unnamed { what })?;
    find_cell(records, cell)
        .map(str::to_string)
        .map_err(|source| ExtractError::Name { what, source })
}

/// Replace spaces with underscores unless spaces are kept.
pub(crate) fn field_name(name: String, keep_spaces: bool) -> String {
    if keep_spaces {
        name
    } else {
        name.replace(' ', "_")
    }
}

/// Exactly one of a literal name and a name cell must be set.
///
/// Next to a literal name, a name cell at the origin counts as unset.
pub(crate) fn check_naming(name: &str, name_cell: Option<Cell>) -> Result<(), String> {
    match (name.is_empty(), name_cell) {
        (true, None) => Err("either Name or NameCell must be set".to_string()),
        (false, Some(cell)) if cell != Cell::default() => {
            Err("Name and NameCell are mutually exclusive".to_string())
        }
        _ => Ok(()),
    }
}
