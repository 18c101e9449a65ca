//! Error types for the csvshape extraction pipeline.
//!
//! Errors are layered the same way the pipeline is:
//!
//! - [`LocateError`] - cell lookups against the record array
//! - [`CoerceError`] - string to scalar conversions
//! - [`ProcessorError`] - record rewriting steps
//! - [`ExtractError`] - cells, concatenated cells, time fields, tables, file paths
//! - [`IdError`] / [`PathError`] - document id building
//! - [`ConfigError`] - configuration decoding and validation
//! - [`ReadError`] - tokenizer and filesystem access
//! - [`ShapeError`] - top-level orchestration, adds positional context
//!
//! Conversion between layers is automatic via `From` implementations,
//! so `?` works across error boundaries. Every error can be classified
//! with [`ShapeError::kind`].

use thiserror::Error;

use crate::models::Cell;
use crate::transform::datatype::DataType;

// =============================================================================
// Error classification
// =============================================================================

/// Coarse classification of every failure the pipeline can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The configuration breaks one of its own invariants.
    ConfigInvariantViolated,
    /// A coordinate or band falls outside the record array.
    BoundsExceeded,
    /// Two fields resolved to the same key while `FaultOnDuplicate` is set.
    DuplicateName,
    /// A raw cell could not be converted to the requested data type.
    CoercionFailed,
    /// A file path did not match its capture regex.
    PathMatchFailed,
    /// A date or time string did not match its layout.
    LayoutMismatch,
    /// A processor carried an unregistered `Type` discriminator.
    UnknownProcessorType,
    /// The input file produced no records.
    EmptyFile,
    /// Filesystem access failed.
    Io,
    /// The tokenizer or serializer rejected its input.
    Malformed,
}

// =============================================================================
// Locator Errors
// =============================================================================

/// Errors while looking up a single cell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    #[error("row out of bounds. maxRow={rows}, requestedRow={row}")]
    RowOutOfBounds { row: usize, rows: usize },

    #[error("column out of bounds in row {row}. maxColumn={columns}, requestedColumn={column}")]
    ColumnOutOfBounds {
        row: usize,
        column: usize,
        columns: usize,
    },

    /// A negative sentinel reached a lookup that needs a concrete coordinate.
    #[error("cell ({row}, {column}) uses an end-of-dimension sentinel where a concrete coordinate is required")]
    Unresolved { row: i64, column: i64 },
}

// =============================================================================
// Coercion Errors
// =============================================================================

/// Errors converting raw cell text into a typed value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoerceError {
    #[error("'{value}' is not a valid int64: {source}")]
    Int {
        value: String,
        source: std::num::ParseIntError,
    },

    #[error("'{value}' is not a valid float64: {source}")]
    Float {
        value: String,
        source: std::num::ParseFloatError,
    },

    #[error("'{value}' is not a finite float64")]
    NonFinite { value: String },

    #[error("'{value}' does not match layout '{layout}': {source}")]
    Layout {
        value: String,
        layout: String,
        source: chrono::ParseError,
    },

    #[error("'{value}' does not exist in the local time zone")]
    LocalTime { value: String },
}

impl CoerceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoerceError::Layout { .. } | CoerceError::LocalTime { .. } => ErrorKind::LayoutMismatch,
            _ => ErrorKind::CoercionFailed,
        }
    }
}

// =============================================================================
// Processor Errors
// =============================================================================

/// Errors raised by a record processor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessorError {
    #[error("neither start row ({row}) nor column ({column}) can be < 0")]
    NegativeStart { row: i64, column: i64 },

    #[error("start row ({row}) cannot be < 0")]
    NegativeRow { row: i64 },

    #[error("end {axis} ({end}) cannot be less than start {axis} ({start}) unless less than zero")]
    EndBeforeStart {
        axis: &'static str,
        start: i64,
        end: i64,
    },

    #[error("{what} row ({row}) cannot be greater than the length of records ({rows})")]
    RowOutOfRange {
        what: &'static str,
        row: i64,
        rows: usize,
    },

    #[error("row {row}: {what} column ({column}) cannot be greater than the length of columns ({columns})")]
    ColumnOutOfRange {
        row: usize,
        what: &'static str,
        column: i64,
        columns: usize,
    },

    #[error("all rows in the band must be the same length. Row {row} length ({len}) does not match other rows ({expected})")]
    Ragged {
        row: usize,
        len: usize,
        expected: usize,
    },
}

impl ProcessorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessorError::NegativeStart { .. }
            | ProcessorError::NegativeRow { .. }
            | ProcessorError::EndBeforeStart { .. } => ErrorKind::ConfigInvariantViolated,
            _ => ErrorKind::BoundsExceeded,
        }
    }
}

// =============================================================================
// Extraction Errors
// =============================================================================

/// Errors raised while extracting fields from the record array.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{what} has neither a name nor a name cell")]
    Unnamed { what: &'static str },

    #[error("error finding name for {what}: {source}")]
    Name {
        what: &'static str,
        source: LocateError,
    },

    #[error("error finding value for cell {cell}: {source}")]
    Value { cell: Cell, source: LocateError },

    #[error("error converting {target} to {data_type}: {source}")]
    Coerce {
        target: String,
        data_type: DataType,
        source: CoerceError,
    },

    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error("table has {headers} header names but spans {columns} columns")]
    HeaderArity { headers: usize, columns: usize },

    #[error("table has {types} column data types but spans {columns} columns")]
    TypeArity { types: usize, columns: usize },

    #[error("error converting value to the layout of time field ({name}): {source}")]
    Time { name: String, source: CoerceError },

    #[error("error compiling capture regex '{pattern}': {source}")]
    Regex {
        pattern: String,
        source: regex::Error,
    },

    #[error("filePath must be at least {needed} long instead of {len}")]
    PathTooShort { needed: usize, len: usize },

    #[error("filePath range [{start}, {end}) does not fall on character boundaries")]
    PathRange { start: usize, end: usize },

    #[error("no matches found for capture regex '{pattern}' in '{path}'")]
    NoMatch { pattern: String, path: String },
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::Unnamed { .. }
            | ExtractError::HeaderArity { .. }
            | ExtractError::TypeArity { .. }
            | ExtractError::Regex { .. } => ErrorKind::ConfigInvariantViolated,
            ExtractError::Name { .. }
            | ExtractError::Value { .. }
            | ExtractError::Locate(_)
            | ExtractError::PathTooShort { .. }
            | ExtractError::PathRange { .. } => ErrorKind::BoundsExceeded,
            ExtractError::Coerce { source, .. } | ExtractError::Time { source, .. } => source.kind(),
            ExtractError::NoMatch { .. } => ErrorKind::PathMatchFailed,
        }
    }
}

// =============================================================================
// Id Errors
// =============================================================================

/// Errors walking a parameter path through a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("mapping is empty")]
    Empty,

    #[error("key '{key}' not found in map")]
    KeyMissing { key: String },

    #[error("index '{index}' out of bounds for sequence of length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("expected {expected} key for {container}, got '{got}'")]
    KindMismatch {
        container: &'static str,
        expected: &'static str,
        got: String,
    },

    #[error("unexpected {kind} value while processing parameter '{segment}'")]
    Scalar { kind: &'static str, segment: String },
}

/// Errors while building document ids.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("data is empty")]
    EmptyData,

    #[error("parameters should not be empty")]
    NoParameters,

    #[error("error finding result for mapping {path}: {source}")]
    Path { path: String, source: PathError },
}

impl IdError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IdError::Path {
                source: PathError::KeyMissing { .. } | PathError::IndexOutOfRange { .. },
                ..
            } => ErrorKind::BoundsExceeded,
            _ => ErrorKind::ConfigInvariantViolated,
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while decoding or validating a [`crate::Csv`] configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration failed schema validation: {errors:?}")]
    Schema { errors: Vec<String> },

    #[error("invalid processor type: {0}")]
    UnknownProcessorType(i64),

    #[error("invalid configuration: {0}")]
    Invariant(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::Read { .. } => ErrorKind::Io,
            ConfigError::Json(_) => ErrorKind::Malformed,
            ConfigError::UnknownProcessorType(_) => ErrorKind::UnknownProcessorType,
            _ => ErrorKind::ConfigInvariantViolated,
        }
    }
}

// =============================================================================
// Read Errors
// =============================================================================

/// Errors obtaining the record array or file metadata.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("error opening file at path {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("error reading records: {0}")]
    Csv(#[from] csv::Error),

    #[error("unsupported encoding: {0}")]
    Encoding(String),

    #[error("no records found")]
    EmptyFile,

    #[error("cannot get fileTime for {path}: {source}")]
    FileTime {
        path: String,
        source: std::io::Error,
    },
}

impl ReadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReadError::Open { .. } | ReadError::FileTime { .. } => ErrorKind::Io,
            ReadError::Csv(_) | ReadError::Encoding(_) => ErrorKind::Malformed,
            ReadError::EmptyFile => ErrorKind::EmptyFile,
        }
    }
}

// =============================================================================
// Shape Errors (top-level)
// =============================================================================

/// Top-level pipeline error.
///
/// This is the error returned by [`crate::Pipeline`]. It wraps all
/// lower-level errors and records where in the configuration they happened.
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("error getting records: {0}")]
    Read(#[from] ReadError),

    #[error("error preprocessing records with processor {index} ({name}): {source}")]
    Processor {
        index: usize,
        name: String,
        source: ProcessorError,
    },

    #[error("error parsing {what}: {source}")]
    Extract { what: String, source: ExtractError },

    #[error("error parsing table ({name}): {source}")]
    Table { name: String, source: ExtractError },

    #[error("error parsing filePath data {name}: {source}")]
    FilePath { name: String, source: ExtractError },

    #[error("duplicate data found for {origin} ({key})")]
    Duplicate { key: String, origin: &'static str },

    #[error("error processing IdField: {0}")]
    Id(#[from] IdError),

    #[error("unable to serialize documents: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("error parsing csv file {path}: {source}")]
    File {
        path: String,
        source: Box<ShapeError>,
    },
}

impl ShapeError {
    /// Classify this error, looking through any context wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShapeError::Config(e) => e.kind(),
            ShapeError::Read(e) => e.kind(),
            ShapeError::Processor { source, .. } => source.kind(),
            ShapeError::Extract { source, .. }
            | ShapeError::Table { source, .. }
            | ShapeError::FilePath { source, .. } => source.kind(),
            ShapeError::Duplicate { .. } => ErrorKind::DuplicateName,
            ShapeError::Id(e) => e.kind(),
            ShapeError::Serialize(_) => ErrorKind::Malformed,
            ShapeError::File { source, .. } => source.kind(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for tokenizer operations.
pub type ReadResult<T> = Result<T, ReadError>;

/// Result type for pipeline operations.
pub type ShapeResult<T> = Result<T, ShapeError>;
