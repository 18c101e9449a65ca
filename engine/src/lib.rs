//! # csvshape - declarative CSV to JSON document extraction
//!
//! csvshape reads CSV exports that are not simple tables (machine logs,
//! instrument reports, key/value headers followed by data blocks) and
//! turns them into JSON documents according to a JSON configuration.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│  Tokenizer  │────▶│ Processors  │────▶│ Extractors  │────▶│  Documents  │
//! │ (any enc.)  │     │ (auto-enc)  │     │ (reshape)   │     │ (cells/tbl) │     │  (+ ids)    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use csvshape::{load_config, Pipeline, ReadOptions};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("shot-export.json")).unwrap();
//! let pipeline = Pipeline::new(config).unwrap();
//! let output = pipeline.process_file(Path::new("DCM01/die7/wave/0001.csv"), &ReadOptions::default()).unwrap();
//! println!("{}", output.to_json_lines().unwrap());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`logs`] - Progress log broadcasting
//! - [`models`] - Document values and cell coordinates
//! - [`parser`] - CSV tokenizing with encoding detection
//! - [`transform`] - Processors, extractors and the pipeline
//! - [`validation`] - Configuration schema validation

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{
    ConfigError, ConfigResult, CoerceError, ErrorKind, ExtractError, ExtractResult, IdError, LocateError, PathError,
    ProcessorError, ReadError, ReadResult, ShapeError, ShapeResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Cell, Document, Float64, Records, Value};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{decode_content, detect_encoding, file_time, parse_records, read_records, ReadOptions};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use transform::{load_config, Csv, DataType, CONFIG_ENV};

// =============================================================================
// Re-exports - Processors
// =============================================================================

pub use transform::{
    processors_description, FillRight, MergeColumns, MergeRows, Processor, ProcessorType, RecordProcessor,
    RemoveCellLeft, ReplaceCell, TransposeRow,
};

// =============================================================================
// Re-exports - Extractors
// =============================================================================

pub use transform::{
    CellLocation, ConcatCellLocation, FilePathData, IdField, IdFieldParameter, PathSegment, TableData, TableLocation,
    TimeField,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{Assembler, Output, Pipeline, Segments};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{config_schema, is_valid, is_valid_config, validate, validate_config};
