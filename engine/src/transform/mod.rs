//! Transformation module.
//!
//! This module turns tokenized CSV records into documents:
//! - Data types: string coercion and date layouts
//! - Processors: in-place reshaping of the record array
//! - Extractors: cells, concatenated cells, time fields and tables
//! - File path capture and id building
//! - Config: the declarative description tying it all together
//! - Assembler and pipeline: running a config against a file

pub mod assembler;
pub mod config;
pub mod datatype;
pub mod extract;
pub mod filepath;
pub mod idfield;
pub mod locate;
pub mod pipeline;
pub mod processors;

pub use assembler::{Assembler, Segments};
pub use config::{load_config, Csv, CONFIG_ENV};
pub use datatype::DataType;
pub use extract::{CellLocation, ConcatCellLocation, TableData, TableLocation, TimeField};
pub use filepath::FilePathData;
pub use idfield::{IdField, IdFieldParameter, PathSegment};
pub use pipeline::{Output, Pipeline};
pub use processors::{
    processors_description, FillRight, MergeColumns, MergeRows, Processor, ProcessorType, RecordProcessor,
    RemoveCellLeft, ReplaceCell, TransposeRow,
};
