//! CSV tokenizer with encoding auto-detection.
//!
//! Turns a file into [`Records`]: a ragged grid of strings, one entry per
//! non-blank line. No header handling happens here; every line is data.

use std::path::Path;

use chrono::{DateTime, FixedOffset, Local};
use encoding_rs::Encoding;

use crate::error::{ReadError, ReadResult};
use crate::logs::{log_info_indent, log_warning};
use crate::models::Records;

/// How to tokenize an input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    pub delimiter: u8,
    /// Encoding label; `None` detects it from the content.
    pub encoding: Option<String>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { delimiter: b',', encoding: None }
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        "shift_jis" | "sjis" | "cp932" => "shift_jis".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using an encoding label.
pub fn decode_content(bytes: &[u8], encoding: &str) -> ReadResult<String> {
    let encoding = Encoding::for_label(encoding.trim().as_bytes())
        .ok_or_else(|| ReadError::Encoding(encoding.to_string()))?;
    Ok(encoding.decode(bytes).0.into_owned())
}

/// Tokenize CSV text into records.
///
/// Rows may differ in length. Blank lines are skipped.
pub fn parse_records(content: &str, delimiter: u8) -> ReadResult<Records> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        records.push(record.iter().map(str::to_string).collect());
    }

    if records.is_empty() {
        return Err(ReadError::EmptyFile);
    }
    Ok(records)
}

/// Read and tokenize a file.
pub fn read_records(path: &Path, options: &ReadOptions) -> ReadResult<Records> {
    let bytes = std::fs::read(path).map_err(|source| ReadError::Open {
        path: path.display().to_string(),
        source,
    })?;

    let content = match &options.encoding {
        Some(label) => decode_content(&bytes, label)?,
        None => {
            let detected = detect_encoding(&bytes);
            log_info_indent(format!("Encoding: {detected}"), 1);
            decode_content(&bytes, &detected).unwrap_or_else(|e| {
                log_warning(format!("{e}, falling back to lossy UTF-8"));
                String::from_utf8_lossy(&bytes).into_owned()
            })
        }
    };

    parse_records(&content, options.delimiter)
}

/// Creation time on Windows, last modification time elsewhere.
pub fn file_time(path: &Path) -> ReadResult<DateTime<FixedOffset>> {
    let err = |source| ReadError::FileTime { path: path.display().to_string(), source };
    let metadata = std::fs::metadata(path).map_err(err)?;

    #[cfg(windows)]
    let time = metadata.created().map_err(err)?;
    #[cfg(not(windows))]
    let time = metadata.modified().map_err(err)?;

    let local: DateTime<Local> = time.into();
    Ok(local.into())
}
