//! Document id building.
//!
//! An id is the delimiter-joined text of values picked out of a document
//! by one path per parameter.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IdError, PathError};
use crate::models::{Document, Value};

/// One step of a path: a key into an object or an index into an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(i64),
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "{i}"),
            PathSegment::Key(k) => f.write_str(k),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<i64> for PathSegment {
    fn from(index: i64) -> Self {
        PathSegment::Index(index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct IdFieldParameter {
    pub mapping: Vec<PathSegment>,
}

impl IdFieldParameter {
    pub fn new(mapping: impl IntoIterator<Item = PathSegment>) -> Self {
        Self { mapping: mapping.into_iter().collect() }
    }

    fn path(&self) -> String {
        let segments: Vec<String> = self.mapping.iter().map(ToString::to_string).collect();
        format!("[{}]", segments.join(" "))
    }

    /// Walk the mapping through `document`.
    pub fn resolve<'a>(&self, document: &'a Document) -> Result<&'a Value, PathError> {
        let (first, rest) = self.mapping.split_first().ok_or(PathError::Empty)?;
        let mut current = match first {
            PathSegment::Key(key) => document
                .get(key)
                .ok_or_else(|| PathError::KeyMissing { key: key.clone() })?,
            PathSegment::Index(index) => {
                return Err(PathError::KindMismatch {
                    container: "map",
                    expected: "string",
                    got: index.to_string(),
                })
            }
        };
        for segment in rest {
            current = descend(current, segment)?;
        }
        Ok(current)
    }
}

fn descend<'a>(value: &'a Value, segment: &PathSegment) -> Result<&'a Value, PathError> {
    match (value, segment) {
        (Value::Object(map), PathSegment::Key(key)) => {
            map.get(key).ok_or_else(|| PathError::KeyMissing { key: key.clone() })
        }
        (Value::Array(items), PathSegment::Index(index)) => usize::try_from(*index)
            .ok()
            .and_then(|i| items.get(i))
            .ok_or(PathError::IndexOutOfRange { index: *index, len: items.len() }),
        (Value::Object(_), PathSegment::Index(index)) => Err(PathError::KindMismatch {
            container: "map",
            expected: "string",
            got: index.to_string(),
        }),
        (Value::Array(_), PathSegment::Key(key)) => Err(PathError::KindMismatch {
            container: "slice",
            expected: "integer",
            got: key.clone(),
        }),
        (scalar, segment) => Err(PathError::Scalar {
            kind: scalar.type_name(),
            segment: segment.to_string(),
        }),
    }
}

/// Builds one id string per document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct IdField {
    pub parameters: Vec<IdFieldParameter>,
    pub delimiter: String,
}

impl IdField {
    pub fn is_enabled(&self) -> bool {
        !self.parameters.is_empty()
    }

    pub fn process(&self, documents: &[Document]) -> Result<Vec<String>, IdError> {
        if documents.is_empty() {
            return Err(IdError::EmptyData);
        }
        if self.parameters.is_empty() {
            return Err(IdError::NoParameters);
        }

        documents
            .iter()
            .map(|document| -> Result<String, IdError> {
                let parts = self
                    .parameters
                    .iter()
                    .map(|parameter| {
                        parameter
                            .resolve(document)
                            .map(ToString::to_string)
                            .map_err(|source| IdError::Path { path: parameter.path(), source })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(parts.join(&self.delimiter))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> Document {
        let value = Value::from(serde_json::json!({
            "dcm": "DCM 16",
            "shot": 989392,
            "shot_string": "989392",
            "data": {"nested": "success0"},
            "sequence": ["test", {"internalTest": "success1"}],
        }));
        match value {
            Value::Object(document) => document,
            _ => unreachable!(),
        }
    }

    fn id_field(mappings: Vec<Vec<PathSegment>>) -> IdField {
        IdField {
            parameters: mappings.into_iter().map(IdFieldParameter::new).collect(),
            delimiter: "_".into(),
        }
    }

    #[test]
    fn test_flat_keys() {
        let ids = id_field(vec![vec!["dcm".into()], vec!["shot".into()]])
            .process(&[document()])
            .unwrap();
        assert_eq!(ids, vec!["DCM 16_989392"]);
    }

    #[test]
    fn test_nested_paths() {
        let ids = id_field(vec![
            vec!["data".into(), "nested".into()],
            vec!["sequence".into(), PathSegment::Index(1), "internalTest".into()],
            vec!["shot_string".into()],
        ])
        .process(&[document(), document()])
        .unwrap();
        assert_eq!(ids, vec!["success0_success1_989392"; 2]);
    }

    #[test]
    fn test_container_leaf_renders_as_json() {
        let ids = id_field(vec![vec!["sequence".into()]]).process(&[document()]).unwrap();
        assert_eq!(ids[0], r#"["test",{"internalTest":"success1"}]"#);
    }

    #[test]
    fn test_errors() {
        assert_eq!(id_field(vec![vec!["dcm".into()]]).process(&[]), Err(IdError::EmptyData));
        assert_eq!(id_field(vec![]).process(&[document()]), Err(IdError::NoParameters));

        let missing = id_field(vec![vec!["nope".into()]]).process(&[document()]).unwrap_err();
        assert!(matches!(missing, IdError::Path { source: PathError::KeyMissing { .. }, .. }));

        let out_of_range = id_field(vec![vec!["sequence".into(), PathSegment::Index(5)]]).process(&[document()]).unwrap_err();
        assert!(matches!(out_of_range, IdError::Path { source: PathError::IndexOutOfRange { index: 5, len: 2 }, .. }));

        let mismatch = id_field(vec![vec!["data".into(), PathSegment::Index(0)]]).process(&[document()]).unwrap_err();
        assert!(matches!(mismatch, IdError::Path { source: PathError::KindMismatch { .. }, .. }));

        let scalar = id_field(vec![vec!["dcm".into(), "x".into()]]).process(&[document()]).unwrap_err();
        assert!(matches!(scalar, IdError::Path { source: PathError::Scalar { kind: "string", .. }, .. }));
    }

    #[test]
    fn test_wire_format() {
        let json = r#"{"Parameters": [{"Mapping": ["sequence", 1, "internalTest"]}], "Delimiter": "-"}"#;
        let field: IdField = serde_json::from_str(json).unwrap();
        assert_eq!(
            field.parameters[0].mapping,
            vec![PathSegment::from("sequence"), PathSegment::Index(1), PathSegment::from("internalTest")]
        );
    }
}
