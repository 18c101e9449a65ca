//! Extraction configuration.
//!
//! A [`Csv`] describes everything needed to turn one CSV file into
//! documents: file path capture, record processors, extractors, id
//! building and the flags that shape the output. It is JSON on the wire
//! with PascalCase keys.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{ConfigError, ConfigResult};
use crate::models::Cell;
use crate::transform::datatype::DataType;
use crate::transform::extract::{CellLocation, ConcatCellLocation, TableLocation, TimeField};
use crate::transform::filepath::FilePathData;
use crate::transform::idfield::{IdField, IdFieldParameter, PathSegment};
use crate::transform::processors::{Processor, ProcessorType, RemoveCellLeft, TransposeRow};
use crate::validation::validate_config;

/// Environment variable naming the default configuration file.
pub const CONFIG_ENV: &str = "CSVSHAPE_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Csv {
    pub file_path_data: Vec<FilePathData>,
    pub pre_processor: Vec<Processor>,
    pub cell_locations: Vec<CellLocation>,
    pub concat_cell_locations: Vec<ConcatCellLocation>,
    pub table_locations: Vec<TableLocation>,
    pub time_fields: Vec<TimeField>,
    pub id_field: IdField,
    /// Abort when two fields resolve to the same key.
    pub fault_on_duplicate: bool,
    /// Keep spaces in names instead of replacing them with underscores.
    pub keep_spaces: bool,
    pub store_file_time: bool,
    pub file_time_name: String,
}

impl Csv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a configuration from JSON text.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let value: JsonValue = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Schema-check, decode and validate a configuration.
    pub fn from_value(value: &JsonValue) -> ConfigResult<Self> {
        validate_config(value).map_err(|errors| ConfigError::Schema { errors })?;
        check_processor_tags(value)?;
        let config: Csv = serde_json::from_value(value.clone())?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Whether there is anything to extract at all.
    pub fn has_settings(&self) -> bool {
        !(self.file_path_data.is_empty()
            && self.pre_processor.is_empty()
            && self.cell_locations.is_empty()
            && self.concat_cell_locations.is_empty()
            && self.table_locations.is_empty()
            && self.time_fields.is_empty())
    }

    /// Check the cross-field rules the schema cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |what: String, reason: String| ConfigError::Invariant(format!("{what}: {reason}"));

        if !self.has_settings() {
            return Err(ConfigError::Invariant("no settings to process".into()));
        }
        for (i, data) in self.file_path_data.iter().enumerate() {
            data.validate().map_err(|e| invalid(format!("FilePathData {i}"), e))?;
        }
        for (i, cell) in self.cell_locations.iter().enumerate() {
            cell.validate().map_err(|e| invalid(format!("CellLocations {i}"), e))?;
        }
        for (i, cell) in self.concat_cell_locations.iter().enumerate() {
            cell.validate().map_err(|e| invalid(format!("ConcatCellLocations {i}"), e))?;
        }
        for (i, table) in self.table_locations.iter().enumerate() {
            table.validate().map_err(|e| invalid(format!("TableLocations {i}"), e))?;
        }
        if self.separated_tables().count() > 1 {
            return Err(ConfigError::Invariant("at most one table can set ParseSeparated".into()));
        }
        for (i, field) in self.time_fields.iter().enumerate() {
            if !field.is_blank() && field.name.is_empty() {
                return Err(invalid(format!("TimeFields {i}"), "Name is required".into()));
            }
        }
        if self.store_file_time && self.file_time_name.is_empty() {
            return Err(ConfigError::Invariant("FileTimeName is required when StoreFileTime is set".into()));
        }
        Ok(())
    }

    pub fn separated_tables(&self) -> impl Iterator<Item = &TableLocation> {
        self.table_locations.iter().filter(|t| t.parse_separated)
    }

    /// Configuration for a die-casting machine shot export: a header block
    /// of name/value pairs, a wave summary stored row-wise that needs
    /// transposing, a section table and a wave data table.
    pub fn example() -> Self {
        Self {
            file_path_data: vec![FilePathData::captured(r".*/(?P<dcm>.+)/(?P<die>.+)/\w+/.+.csv$")],
            pre_processor: vec![
                Processor::RemoveCellLeft(RemoveCellLeft { name: "dropWaveSelPadding".into(), cell: Cell::new(5, 5) }),
                Processor::TransposeRow(TransposeRow { name: "transposeWaveSummary".into(), start_row: 5, end_row: 9 }),
            ],
            cell_locations: vec![
                CellLocation::named_by(Cell::new(0, 1), DataType::Float64, Cell::new(0, 0)),
                CellLocation::named_by(Cell::new(3, 1), DataType::String, Cell::new(3, 0)),
                CellLocation::named_by(Cell::new(4, 1), DataType::Int64, Cell::new(4, 0)),
            ],
            concat_cell_locations: vec![ConcatCellLocation {
                cells: vec![Cell::new(1, 1), Cell::new(2, 1)],
                delimiter: " ".into(),
                data_type: DataType::DateStyle1,
                name: "@timestamp".into(),
                name_cell: None,
            }],
            table_locations: vec![
                TableLocation {
                    name: "metrics".into(),
                    start_cell: Cell::new(5, 0),
                    end_cell: Cell::new(9, 3),
                    table_has_header: true,
                    column_data_types: vec![DataType::Int64, DataType::String, DataType::String, DataType::Float64],
                    ..Default::default()
                },
                TableLocation {
                    name: "section".into(),
                    start_cell: Cell::new(11, 0),
                    end_cell: Cell::new(17, -1),
                    table_has_header: true,
                    column_data_types: vec![
                        DataType::Int64,
                        DataType::Int64,
                        DataType::Float64,
                        DataType::Float64,
                        DataType::Int64,
                    ],
                    ..Default::default()
                },
                TableLocation {
                    name: "wave".into(),
                    start_cell: Cell::new(21, 0),
                    end_cell: Cell::new(-1, -1),
                    header_names: ["Time ms", "Speed m/s", "Pressure MPa", "Position mm", "Vac KPa", "Shot Sleeve Vac KPa"]
                        .map(String::from)
                        .to_vec(),
                    column_data_types: vec![
                        DataType::Int64,
                        DataType::Float64,
                        DataType::Float64,
                        DataType::Float64,
                        DataType::Float64,
                        DataType::Float64,
                    ],
                    ..Default::default()
                },
            ],
            id_field: IdField {
                parameters: vec![
                    IdFieldParameter::new([PathSegment::from("dcm")]),
                    IdFieldParameter::new([PathSegment::from("@timestamp")]),
                ],
                delimiter: "_".into(),
            },
            fault_on_duplicate: true,
            keep_spaces: true,
            ..Default::default()
        }
    }
}

/// Reject unregistered processor discriminators before typed decoding.
fn check_processor_tags(value: &JsonValue) -> ConfigResult<()> {
    let processors = value.get("PreProcessor").and_then(JsonValue::as_array);
    for processor in processors.into_iter().flatten() {
        if let Some(tag) = processor.get("Type").and_then(JsonValue::as_i64) {
            if ProcessorType::from_tag(tag).is_none() {
                return Err(ConfigError::UnknownProcessorType(tag));
            }
        }
    }
    Ok(())
}

/// Load a configuration from a file path.
pub fn load_config(path: &std::path::Path) -> ConfigResult<Csv> {
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Csv::from_json(&json)
}
