//! File path capture.
//!
//! Derives fields from the path of the input file, either by slicing a
//! fixed character range or through the named groups of a regex.

use std::collections::BTreeMap;

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, ExtractResult};

/// Forward slashes only.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FilePathData {
    /// Field receiving the `[start_location, end_location)` slice.
    pub name: String,
    pub start_location: usize,
    /// Slicing is off while this is zero.
    pub end_location: usize,
    /// Every named group becomes a field.
    pub capture_regex: String,
    #[serde(skip)]
    compiled: OnceCell<Regex>,
}

impl PartialEq for FilePathData {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.start_location == other.start_location
            && self.end_location == other.end_location
            && self.capture_regex == other.capture_regex
    }
}

impl FilePathData {
    pub fn sliced(name: impl Into<String>, start_location: usize, end_location: usize) -> Self {
        Self { name: name.into(), start_location, end_location, ..Default::default() }
    }

    pub fn captured(capture_regex: impl Into<String>) -> Self {
        Self { capture_regex: capture_regex.into(), ..Default::default() }
    }

    /// Label used in error context.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.capture_regex
        } else {
            &self.name
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.end_location > 0 {
            if self.name.is_empty() {
                return Err("Name is required when EndLocation is set".into());
            }
            if self.start_location > self.end_location {
                return Err(format!(
                    "StartLocation ({}) is after EndLocation ({})",
                    self.start_location, self.end_location
                ));
            }
        }
        if !self.capture_regex.is_empty() {
            self.regex().map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    fn regex(&self) -> ExtractResult<&Regex> {
        self.compiled.get_or_try_init(|| {
            Regex::new(&self.capture_regex).map_err(|source| ExtractError::Regex {
                pattern: self.capture_regex.clone(),
                source,
            })
        })
    }

    /// Fields derived from `path`.
    pub fn parse(&self, path: &str) -> ExtractResult<BTreeMap<String, String>> {
        let path = normalize_path(path);
        let mut fields = BTreeMap::new();

        if self.end_location > 0 {
            if path.len() < self.end_location {
                return Err(ExtractError::PathTooShort { needed: self.end_location, len: path.len() });
            }
            let slice = path.get(self.start_location..self.end_location).ok_or(ExtractError::PathRange {
                start: self.start_location,
                end: self.end_location,
            })?;
            fields.insert(self.name.clone(), slice.to_string());
        }

        if !self.capture_regex.is_empty() {
            let regex = self.regex()?;
            let captures = regex.captures(&path).ok_or_else(|| ExtractError::NoMatch {
                pattern: self.capture_regex.clone(),
                path: path.clone(),
            })?;
            for group in regex.capture_names().flatten() {
                let value = captures.name(group).map_or("", |m| m.as_str());
                fields.insert(group.to_string(), value.to_string());
            }
        }

        Ok(fields)
    }
}
