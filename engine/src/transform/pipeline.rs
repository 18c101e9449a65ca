//! High-level pipeline API: CSV file in, documents and ids out.
//!
//! Steps, in order:
//! 1. derive fields from the file path (and the file time if asked for)
//! 2. tokenize the file into records
//! 3. run the record processors
//! 4. assemble documents from the extractors
//! 5. overlay the file path fields onto every document
//! 6. build ids
//!
//! # Example
//!
//! ```rust,ignore
//! use csvshape::{Csv, Pipeline, ReadOptions};
//! use std::path::Path;
//!
//! let config = Csv::from_json(&std::fs::read_to_string("shot.json")?)?;
//! let pipeline = Pipeline::new(config)?;
//! let output = pipeline.process_file(Path::new("DCM 16/062b/241018/1234.csv"), &ReadOptions::default())?;
//! println!("{}", output.to_json_lines()?);
//! ```

use std::path::Path;

use serde::Serialize;

use super::assembler::Assembler;
use super::config::Csv;
use super::datatype::to_rfc3339;
use super::filepath::normalize_path;
use super::processors::RecordProcessor;
use crate::error::{ShapeError, ShapeResult};
use crate::logs::{log_error, log_info, log_info_indent, log_success, log_success_indent};
use crate::models::{Document, Records, Value};
use crate::parser::{file_time, read_records, ReadOptions};

/// Documents produced from one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Output {
    pub documents: Vec<Document>,
    /// One id per document, empty when no id parameters are configured.
    pub ids: Vec<String>,
}

impl Output {
    /// Each document serialized on its own.
    pub fn to_json_documents(&self) -> ShapeResult<Vec<String>> {
        self.documents
            .iter()
            .map(|document| serde_json::to_string(document).map_err(ShapeError::from))
            .collect()
    }

    /// Newline-delimited JSON, one document per line.
    pub fn to_json_lines(&self) -> ShapeResult<String> {
        Ok(self.to_json_documents()?.join("\n"))
    }

    pub fn to_json_array(&self) -> ShapeResult<String> {
        Ok(serde_json::to_string_pretty(&self.documents)?)
    }
}

/// A validated configuration ready to process files.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Csv,
}

impl Pipeline {
    pub fn new(config: Csv) -> ShapeResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Csv {
        &self.config
    }

    /// Process one CSV file.
    pub fn process_file(&self, path: &Path, options: &ReadOptions) -> ShapeResult<Output> {
        let display = path.display().to_string();
        self.process_file_inner(path, options).map_err(|source| {
            log_error(format!("{display}: {source}"));
            ShapeError::File { path: display, source: Box::new(source) }
        })
    }

    fn process_file_inner(&self, path: &Path, options: &ReadOptions) -> ShapeResult<Output> {
        log_info(format!("📖 Reading {}", path.display()));
        let metadata = self.file_fields(path)?;
        let records = read_records(path, options)?;
        log_success(format!("Read {} records", records.len()));
        self.shape(records, metadata)
    }

    /// Process records that were already tokenized from the file at `path`.
    ///
    /// The path is only used for file path capture and the file time.
    pub fn process_records(&self, records: Records, path: &Path) -> ShapeResult<Output> {
        let metadata = self.file_fields(path)?;
        self.shape(records, metadata)
    }

    /// Run the record processors in order.
    pub fn preprocess(&self, mut records: Records) -> ShapeResult<Records> {
        for (index, processor) in self.config.pre_processor.iter().enumerate() {
            records = processor.execute(records).map_err(|source| ShapeError::Processor {
                index,
                name: processor.name().to_string(),
                source,
            })?;
            log_info_indent(
                format!("#{index} {} ({}): {} rows", processor.processor_type(), processor.name(), records.len()),
                1,
            );
        }
        Ok(records)
    }

    /// Fields derived from the path, plus the file time when configured.
    pub fn file_fields(&self, path: &Path) -> ShapeResult<Document> {
        let path_text = normalize_path(&path.to_string_lossy());
        let mut fields = Document::new();

        for data in &self.config.file_path_data {
            let captured = data.parse(&path_text).map_err(|source| ShapeError::FilePath {
                name: data.label().to_string(),
                source,
            })?;
            for (key, value) in captured {
                self.overlay(&mut fields, key, Value::String(value), "filePath")?;
            }
        }

        if self.config.store_file_time {
            let time = file_time(path)?;
            self.overlay(&mut fields, self.config.file_time_name.clone(), Value::String(to_rfc3339(&time)), "fileTime")?;
        }
        Ok(fields)
    }

    fn overlay(&self, target: &mut Document, key: String, value: Value, origin: &'static str) -> ShapeResult<()> {
        if self.config.fault_on_duplicate && target.contains_key(&key) {
            return Err(ShapeError::Duplicate { key, origin });
        }
        target.insert(key, value);
        Ok(())
    }

    fn shape(&self, records: Records, metadata: Document) -> ShapeResult<Output> {
        let records = self.preprocess(records)?;

        log_info("🔄 Extracting fields...");
        let mut documents = Assembler::new(&self.config).assemble(&records)?;
        for document in &mut documents {
            for (key, value) in &metadata {
                self.overlay(document, key.clone(), value.clone(), "filePath")?;
            }
        }

        let ids = if self.config.id_field.is_enabled() && !documents.is_empty() {
            self.config.id_field.process(&documents)?
        } else {
            Vec::new()
        };

        log_success(format!("{} documents", documents.len()));
        if !ids.is_empty() {
            log_success_indent(format!("{} ids", ids.len()), 1);
        }
        Ok(Output { documents, ids })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::Cell;
    use crate::parser::parse_records;
    use crate::transform::datatype::DataType;
    use crate::transform::extract::TableLocation;
    use crate::transform::filepath::FilePathData;
    use crate::transform::idfield::{IdField, IdFieldParameter, PathSegment};
    use crate::transform::processors::{FillRight, MergeColumns, MergeRows, Processor, ReplaceCell};
    use chrono::{DateTime, FixedOffset, Local, TimeZone};
    use std::path::PathBuf;

    const WAVE_EXPORT: &str = "
WaveVersion,2.00
Date,2024/09/23
Time,09:39:10
Version,D8MJ1-C9
Shot,989392
WaveSel,0,0,0,1,2
WaveName,Spd,Pres,Pos,Vac
WaveUnit,m/s,MPa,mm,KPa
WaveMax,3.609,54.6,502.1,8.1
Section
Index,Offset,StartTime,SampleTime,Count
0,0,0.0,0.0,0
1,0,0.0,20.0,244
2,0,4880.0,4.0,31
3,0,5004.0,4.0,50
4,0,5204.0,200.0,13
5,1,7804.0,74.0,2
WaveData
Time,Spd,Pres,Pos,Vac
ms,m/s,MPa,mm,KPa
0,0.000,0.3,0.8,0.0,1.6
20,0.000,0.3,0.8,0.0,1.6
40,0.000,0.3,0.8,0.0,1.6
60,0.000,0.3,0.8,0.0,1.6
80,0.000,0.3,0.8,0.0,1.6
100,0.000,0.3,0.8,0.0,1.6
120,0.000,0.3,0.8,0.0,1.6
140,0.000,0.3,0.8,0.0,1.6
160,0.000,0.3,0.8,0.0,1.6
180,0.010,0.3,0.8,0.0,1.6
200,0.193,0.2,3.8,0.0,1.6
220,0.141,0.0,7.1,0.0,1.6
";

    const SHOT_LOG: &str = "\
Date,Time,Shot,Alarm1,Alarm2,Cycle Time          ,Spray,,,Total Cycle
YYYY/MM/DD, hh:mm:ss,No.,,,sec,1st,1ed,Cycle,
2024/09/23,08:04:18,989301,0,2,55.3,0.0,0.0,0.0,55.3
2024/09/23,08:05:14,989302,0,0,55.9,1.2,0.8,2.0,57.9
2024/09/23,08:06:10,989303,1,0,56.0,1.1,0.9,2.0,58.0
";

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> String {
        let time: DateTime<FixedOffset> = Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap().into();
        to_rfc3339(&time)
    }

    fn write_machine_file(dir: &Path, content: &str) -> PathBuf {
        let set_dir = dir.join("DCM 16").join("062b").join("241018");
        std::fs::create_dir_all(&set_dir).unwrap();
        let path = set_dir.join("1234_shot.csv");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn utf8() -> ReadOptions {
        ReadOptions { encoding: Some("utf-8".into()), ..Default::default() }
    }

    #[test]
    fn test_wave_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_machine_file(dir.path(), WAVE_EXPORT);

        let pipeline = Pipeline::new(Csv::example()).unwrap();
        let output = pipeline.process_file(&path, &utf8()).unwrap();
        assert_eq!(output.documents.len(), 1);

        let document = &output.documents[0];
        assert_eq!(document["dcm"], Value::from("DCM 16"));
        assert_eq!(document["die"], Value::from("062b"));
        assert_eq!(document["WaveVersion"], Value::from(2.0));
        assert_eq!(document["Version"], Value::from("D8MJ1-C9"));
        assert_eq!(document["Shot"], Value::Int64(989392));
        assert_eq!(document["@timestamp"], Value::String(local(2024, 9, 23, 9, 39, 10)));

        let metrics = document["metrics"].as_array().unwrap();
        assert_eq!(metrics.len(), 4);
        assert_eq!(metrics[0].get("WaveName"), Some(&Value::from("Spd")));
        assert_eq!(metrics[3].get("WaveSel"), Some(&Value::Int64(1)));
        assert_eq!(metrics[3].get("WaveMax"), Some(&Value::from(8.1)));

        let section = document["section"].as_array().unwrap();
        assert_eq!(section.len(), 6);
        assert_eq!(section[5].get("StartTime"), Some(&Value::from(7804.0)));
        assert_eq!(section[1].get("Count"), Some(&Value::Int64(244)));

        let wave = document["wave"].as_array().unwrap();
        assert_eq!(wave.len(), 12);
        assert_eq!(wave[11].get("Time ms"), Some(&Value::Int64(220)));
        assert_eq!(wave[10].get("Speed m/s"), Some(&Value::from(0.193)));
        assert_eq!(wave[0].get("Shot Sleeve Vac KPa"), Some(&Value::from(1.6)));

        assert_eq!(output.ids, vec![format!("DCM 16_{}", local(2024, 9, 23, 9, 39, 10))]);

        let line = output.to_json_lines().unwrap();
        assert!(line.contains(r#""WaveVersion":2.0"#));
        assert!(!line.contains('\n'));
    }

    fn shot_log_config() -> Csv {
        Csv {
            file_path_data: vec![FilePathData::captured(r".*/(?P<dcm>.+)/(?P<die>.+)/\w+/.+.csv$")],
            pre_processor: vec![
                Processor::MergeColumns(MergeColumns {
                    name: "mergeDateTime".into(),
                    start: Cell::new(0, 0),
                    end: Cell::new(-1, 2),
                    delimiter: " ".into(),
                }),
                Processor::FillRight(FillRight {
                    name: "fillHeaderGroups".into(),
                    start: Cell::new(0, 0),
                    end: Cell::new(1, -1),
                }),
                Processor::MergeRows(MergeRows {
                    name: "mergeHeaderAndUnits".into(),
                    start_row: 0,
                    end_row: 2,
                    delimiter: " ".into(),
                    trim_whitespace: true,
                }),
                Processor::ReplaceCell(ReplaceCell {
                    name: "timestampHeader".into(),
                    cell: Cell::new(0, 0),
                    value: "@timestamp".into(),
                }),
            ],
            table_locations: vec![TableLocation {
                name: "shot".into(),
                start_cell: Cell::new(0, 0),
                end_cell: Cell::new(-1, -1),
                table_has_header: true,
                column_data_types: vec![
                    DataType::DateStyle1,
                    DataType::Int64,
                    DataType::Int64,
                    DataType::Int64,
                    DataType::Float64,
                    DataType::Float64,
                    DataType::Float64,
                    DataType::Float64,
                    DataType::Float64,
                ],
                skip_blank_data: true,
                parse_separated: true,
                ignore_nesting: true,
                ..Default::default()
            }],
            id_field: IdField {
                parameters: vec![
                    IdFieldParameter::new([PathSegment::from("dcm")]),
                    IdFieldParameter::new([PathSegment::from("@timestamp")]),
                ],
                delimiter: "_".into(),
            },
            fault_on_duplicate: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_shot_log_separated() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_machine_file(dir.path(), SHOT_LOG);

        let pipeline = Pipeline::new(shot_log_config()).unwrap();
        let output = pipeline.process_file(&path, &utf8()).unwrap();
        assert_eq!(output.documents.len(), 3);

        let first = &output.documents[0];
        assert_eq!(first["@timestamp"], Value::String(local(2024, 9, 23, 8, 4, 18)));
        assert_eq!(first["Shot_No."], Value::Int64(989301));
        assert_eq!(first["Alarm2"], Value::Int64(2));
        assert_eq!(first["Cycle_Time_sec"], Value::from(55.3));
        assert_eq!(first["Spray_1st"], Value::from(0.0));
        assert_eq!(first["Spray_Cycle"], Value::from(0.0));
        assert_eq!(first["Total_Cycle"], Value::from(55.3));
        assert_eq!(first["dcm"], Value::from("DCM 16"));

        let last = &output.documents[2];
        assert_eq!(last["Alarm1"], Value::Int64(1));
        assert_eq!(last["Spray_1ed"], Value::from(0.9));

        assert_eq!(
            output.ids,
            vec![
                format!("DCM 16_{}", local(2024, 9, 23, 8, 4, 18)),
                format!("DCM 16_{}", local(2024, 9, 23, 8, 5, 14)),
                format!("DCM 16_{}", local(2024, 9, 23, 8, 6, 10)),
            ]
        );
    }

    #[test]
    fn test_preprocess_shot_log_header() {
        let pipeline = Pipeline::new(shot_log_config()).unwrap();
        let records = pipeline.preprocess(parse_records(SHOT_LOG, b',').unwrap()).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(
            records[0],
            vec![
                "@timestamp",
                "Shot No.",
                "Alarm1",
                "Alarm2",
                "Cycle Time sec",
                "Spray 1st",
                "Spray 1ed",
                "Spray Cycle",
                "Total Cycle",
            ]
        );
        assert_eq!(records[1][0], "2024/09/23 08:04:18");
    }

    #[test]
    fn test_processor_error_context() {
        let mut config = shot_log_config();
        config.pre_processor.push(Processor::ReplaceCell(ReplaceCell {
            name: "outOfRange".into(),
            cell: Cell::new(40, 0),
            value: String::new(),
        }));
        let pipeline = Pipeline::new(config).unwrap();
        let err = pipeline
            .process_records(parse_records(SHOT_LOG, b',').unwrap(), Path::new("/x/DCM 1/d/1/a.csv"))
            .unwrap_err();
        assert!(err.to_string().contains("processor 4 (outOfRange)"));
        assert_eq!(err.kind(), ErrorKind::BoundsExceeded);
    }

    #[test]
    fn test_file_path_mismatch() {
        let pipeline = Pipeline::new(shot_log_config()).unwrap();
        let err = pipeline
            .process_records(parse_records(SHOT_LOG, b',').unwrap(), Path::new("shot.csv"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathMatchFailed);
    }

    #[test]
    fn test_file_time_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_machine_file(dir.path(), SHOT_LOG);

        let mut config = shot_log_config();
        config.store_file_time = true;
        config.file_time_name = "fileTime".into();
        let output = Pipeline::new(config.clone()).unwrap().process_file(&path, &utf8()).unwrap();
        assert!(output.documents.iter().all(|d| d.contains_key("fileTime")));

        config.file_time_name = "dcm".into();
        let err = Pipeline::new(config).unwrap().process_file(&path, &utf8()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);
        assert!(err.to_string().contains("1234_shot.csv"));
    }

    #[test]
    fn test_empty_file_and_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_machine_file(dir.path(), "\n\n");
        let err = Pipeline::new(shot_log_config()).unwrap().process_file(&path, &utf8()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyFile);

        let err = Pipeline::new(Csv::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvariantViolated);
    }

    #[test]
    fn test_output_formats() {
        let mut document = Document::new();
        document.insert("a".into(), Value::from(1.0));
        let output = Output { documents: vec![document.clone(), document], ids: Vec::new() };
        assert_eq!(output.to_json_lines().unwrap(), "{\"a\":1.0}\n{\"a\":1.0}");
        let array: serde_json::Value = serde_json::from_str(&output.to_json_array().unwrap()).unwrap();
        assert_eq!(array.as_array().map(Vec::len), Some(2));
    }
}
