//! Cell lookup and end-sentinel resolution.

use crate::error::LocateError;
use crate::models::Cell;

/// Bounds-checked read of `records[row][column]`.
pub fn find_value(records: &[Vec<String>], row: usize, column: usize) -> Result<&str, LocateError> {
    let cells = records.get(row).ok_or(LocateError::RowOutOfBounds {
        row,
        rows: records.len(),
    })?;
    cells.get(column).map(String::as_str).ok_or(LocateError::ColumnOutOfBounds {
        row,
        column,
        columns: cells.len(),
    })
}

/// Read a cell given as a coordinate. Sentinels are rejected.
pub fn find_cell(records: &[Vec<String>], cell: Cell) -> Result<&str, LocateError> {
    let (row, column) = cell.position()?;
    find_value(records, row, column)
}

/// Exclusive end of a range whose configured end is already exclusive.
///
/// A negative end means "through the end": `len`.
pub fn exclusive_end(len: usize, end: i64) -> usize {
    usize::try_from(end).unwrap_or(len)
}

/// Exclusive end of a range whose configured end is inclusive.
pub fn inclusive_end(len: usize, end: i64) -> usize {
    usize::try_from(end).map_or(len, |end| end + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<Vec<String>> {
        vec![
            vec!["r0c0".into(), "r0c1".into()],
            vec!["r1c0".into()],
        ]
    }

    #[test]
    fn test_find_value() {
        let records = records();
        assert_eq!(find_value(&records, 0, 1), Ok("r0c1"));
        assert_eq!(
            find_value(&records, 2, 0),
            Err(LocateError::RowOutOfBounds { row: 2, rows: 2 })
        );
        assert_eq!(
            find_value(&records, 1, 1),
            Err(LocateError::ColumnOutOfBounds { row: 1, column: 1, columns: 1 })
        );
    }

    #[test]
    fn test_find_cell_rejects_sentinel() {
        let records = records();
        assert_eq!(find_cell(&records, Cell::new(1, 0)), Ok("r1c0"));
        assert!(find_cell(&records, Cell::new(0, -1)).is_err());
    }

    #[test]
    fn test_end_resolution() {
        assert_eq!(exclusive_end(5, -1), 5);
        assert_eq!(exclusive_end(5, 3), 3);
        assert_eq!(inclusive_end(5, -7), 5);
        assert_eq!(inclusive_end(5, 3), 4);
    }
}
