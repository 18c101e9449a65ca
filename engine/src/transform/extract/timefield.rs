//! Time field extraction.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, ExtractResult};
use crate::models::Cell;
use crate::transform::datatype::{parse_local, to_strftime};
use crate::transform::locate::find_cell;

/// Concatenates cells without a delimiter and parses them as a local time.
///
/// `layout` is either a strftime pattern or a reference-date layout such
/// as `060102T15:04:05`. A field without layout or cells is blank and is
/// skipped during assembly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TimeField {
    pub cells: Vec<Cell>,
    pub layout: String,
    pub name: String,
}

impl TimeField {
    pub fn is_blank(&self) -> bool {
        self.layout.is_empty() || self.cells.is_empty()
    }

    pub fn parse(&self, records: &[Vec<String>]) -> ExtractResult<DateTime<FixedOffset>> {
        let mut value = String::new();
        for &cell in &self.cells {
            let raw = find_cell(records, cell).map_err(|source| ExtractError::Value { cell, source })?;
            value.push_str(raw);
        }

        parse_local(&value, &to_strftime(&self.layout))
            .map_err(|source| ExtractError::Time { name: self.name.clone(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn records() -> Vec<Vec<String>> {
        vec![vec!["240910".into(), "T12:53:09".into(), "garbage".into()]]
    }

    #[test]
    fn test_parse_reference_layout() {
        let field = TimeField {
            cells: vec![Cell::new(0, 0), Cell::new(0, 1)],
            layout: "060102T15:04:05".into(),
            name: "@timestamp".into(),
        };
        let expected: DateTime<FixedOffset> = Local.with_ymd_and_hms(2024, 9, 10, 12, 53, 9).unwrap().into();
        assert_eq!(field.parse(&records()).unwrap(), expected);
    }

    #[test]
    fn test_parse_strftime_layout() {
        let field = TimeField {
            cells: vec![Cell::new(0, 0)],
            layout: "%y%m%d".into(),
            name: "day".into(),
        };
        let expected: DateTime<FixedOffset> = Local.with_ymd_and_hms(2024, 9, 10, 0, 0, 0).unwrap().into();
        assert_eq!(field.parse(&records()).unwrap(), expected);
    }

    #[test]
    fn test_layout_mismatch() {
        let field = TimeField {
            cells: vec![Cell::new(0, 2)],
            layout: "2006-01-02".into(),
            name: "bad".into(),
        };
        let err = field.parse(&records()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::LayoutMismatch);
    }

    #[test]
    fn test_blank() {
        assert!(TimeField::default().is_blank());
        let field = TimeField { layout: "15:04".into(), ..Default::default() };
        assert!(field.is_blank());
    }
}
