//! Data types and string coercion.
//!
//! A [`DataType`] turns the raw text of one cell into a typed [`Value`].
//! Empty text reads as null for the inferring types and for bools, stays an
//! empty string for strings, and fails for numbers and dates. Date styles
//! are interpreted in the local time zone and emitted as RFC 3339 strings.

use std::fmt;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoerceError;
use crate::models::{Float64, Value};

/// Target type of a cell conversion.
///
/// The wire form is the index (`0..=7`); the lowercase name is also
/// accepted when decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Infer: int64, then float64, then bool, then string.
    #[default]
    Auto,
    /// Like `Auto`, and table keys get a `_<type>` suffix.
    Split,
    String,
    Int64,
    Float64,
    Bool,
    /// `YYYY-MM-DD HH:MM:SS`
    DateStyle0,
    /// `YYYY/MM/DD HH:MM:SS`
    DateStyle1,
}

impl DataType {
    pub const ALL: [DataType; 8] = [
        DataType::Auto,
        DataType::Split,
        DataType::String,
        DataType::Int64,
        DataType::Float64,
        DataType::Bool,
        DataType::DateStyle0,
        DataType::DateStyle1,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u64) -> Option<Self> {
        Self::ALL.get(usize::try_from(index).ok()?).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Auto => "auto",
            DataType::Split => "split",
            DataType::String => "string",
            DataType::Int64 => "int64",
            DataType::Float64 => "float64",
            DataType::Bool => "bool",
            DataType::DateStyle0 => "date_style0",
            DataType::DateStyle1 => "date_style1",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// strftime layout of the date styles.
    pub fn date_layout(self) -> Option<&'static str> {
        match self {
            DataType::DateStyle0 => Some("%Y-%m-%d %H:%M:%S"),
            DataType::DateStyle1 => Some("%Y/%m/%d %H:%M:%S"),
            _ => None,
        }
    }

    /// Convert raw cell text into a value of this type.
    pub fn read(self, value: &str) -> Result<Value, CoerceError> {
        match self {
            DataType::Auto | DataType::Split => Ok(read_auto(value)),
            DataType::String => Ok(Value::String(value.to_string())),
            DataType::Int64 => value
                .parse::<i64>()
                .map(Value::Int64)
                .map_err(|source| CoerceError::Int { value: value.to_string(), source }),
            DataType::Float64 => read_float(value).map(|f| Value::Float64(Float64(f))),
            DataType::Bool => Ok(read_bool(value).map_or(Value::Null, Value::Bool)),
            DataType::DateStyle0 | DataType::DateStyle1 => {
                let layout = self.date_layout().unwrap_or_default();
                parse_local(value, layout).map(|t| Value::String(to_rfc3339(&t)))
            }
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.index())
    }
}

struct DataTypeVisitor;

impl<'de> Visitor<'de> for DataTypeVisitor {
    type Value = DataType;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a data type index (0-7) or name")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<DataType, E> {
        DataType::from_index(v).ok_or_else(|| E::custom(format!("unknown data type index {v}")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<DataType, E> {
        let index = u64::try_from(v).map_err(|_| E::custom(format!("unknown data type index {v}")))?;
        self.visit_u64(index)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<DataType, E> {
        DataType::from_name(&v.to_lowercase()).ok_or_else(|| E::custom(format!("unknown data type '{v}'")))
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DataTypeVisitor)
    }
}

// =============================================================================
// Scalar readers
// =============================================================================

fn read_auto(value: &str) -> Value {
    if value.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = value.parse::<i64>() {
        return Value::Int64(i);
    }
    if let Ok(f) = value.parse::<f64>() {
        if f.is_finite() {
            return Value::Float64(Float64(f));
        }
    }
    match parse_bool_literal(value) {
        Some(b) => Value::Bool(b),
        None => Value::String(value.to_string()),
    }
}

fn read_float(value: &str) -> Result<f64, CoerceError> {
    let f = value
        .parse::<f64>()
        .map_err(|source| CoerceError::Float { value: value.to_string(), source })?;
    if !f.is_finite() {
        return Err(CoerceError::NonFinite { value: value.to_string() });
    }
    Ok(f)
}

fn parse_bool_literal(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Boolean literals plus the inspection verdicts `ok` and `ng`.
fn read_bool(value: &str) -> Option<bool> {
    parse_bool_literal(value).or_else(|| match value.to_lowercase().as_str() {
        "ok" => Some(true),
        "ng" => Some(false),
        _ => None,
    })
}

// =============================================================================
// Time handling
// =============================================================================

/// Parse `value` with a strftime `layout`, interpreting it in local time.
///
/// Layouts carrying an offset (`%z`, `%:z`) keep the parsed offset, and a
/// trailing `Z` satisfies `%:z` as UTC. Layouts without a time of day
/// resolve to local midnight.
pub fn parse_local(value: &str, layout: &str) -> Result<DateTime<FixedOffset>, CoerceError> {
    let mismatch = |source| CoerceError::Layout {
        value: value.to_string(),
        layout: layout.to_string(),
        source,
    };

    if layout.contains("%z") || layout.contains("%:z") {
        return DateTime::parse_from_str(value, layout).or_else(|err| match value.strip_suffix('Z') {
            Some(utc) if layout.contains("%:z") => {
                DateTime::parse_from_str(&format!("{utc}+00:00"), layout).map_err(|_| mismatch(err))
            }
            _ => Err(mismatch(err)),
        });
    }

    let naive = match NaiveDateTime::parse_from_str(value, layout) {
        Ok(naive) => naive,
        Err(err) => NaiveDate::parse_from_str(value, layout)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .ok_or_else(|| mismatch(err))?,
    };

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(DateTime::<FixedOffset>::from)
        .ok_or_else(|| CoerceError::LocalTime { value: value.to_string() })
}

/// RFC 3339 with second precision, `Z` for a zero offset.
pub fn to_rfc3339(time: &DateTime<FixedOffset>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Reference-date tokens and their strftime equivalents, longest first.
const REFERENCE_TOKENS: &[(&str, &str)] = &[
    ("January", "%B"),
    ("Monday", "%A"),
    (".000000000", "%.9f"),
    (".000000", "%.6f"),
    (".000", "%.3f"),
    ("Z07:00", "%:z"),
    ("-07:00", "%:z"),
    ("-0700", "%z"),
    ("2006", "%Y"),
    ("Jan", "%b"),
    ("Mon", "%a"),
    ("15", "%H"),
    ("06", "%y"),
    ("01", "%m"),
    ("02", "%d"),
    ("_2", "%e"),
    ("03", "%I"),
    ("04", "%M"),
    ("05", "%S"),
    ("PM", "%p"),
    ("pm", "%p"),
    ("1", "%m"),
    ("2", "%d"),
    ("3", "%I"),
    ("4", "%M"),
    ("5", "%S"),
];

/// Translate a time layout to strftime.
///
/// Layouts containing `%` are already strftime and pass through. Anything
/// else is read as a reference-date layout where `2006-01-02 15:04:05`
/// spells out the fields.
pub fn to_strftime(layout: &str) -> String {
    if layout.contains('%') {
        return layout.to_string();
    }

    let mut out = String::with_capacity(layout.len() * 2);
    let mut rest = layout;
    'scan: while !rest.is_empty() {
        for (token, directive) in REFERENCE_TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(directive);
                rest = tail;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}
