//! JSON Schema validation for csvshape configurations.
//!
//! The configuration schema (Draft 7) is embedded at compile time from
//! `schemas/csv-config.json`. It checks the wire shape only: key names,
//! value types and data type codes. Cross-field rules live in
//! [`crate::Csv::validate`].
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use csvshape::validation::validate_config;
//!
//! let config = json!({
//!     "CellLocations": [
//!         { "Location": { "Row": 4, "Column": 1 }, "DataType": 3, "Name": "shot" }
//!     ]
//! });
//! assert!(validate_config(&config).is_ok());
//! assert!(validate_config(&json!({ "CellLocation": [] })).is_err());
//! ```

use serde_json::Value;

const CONFIG_SCHEMA: &str = include_str!("../../schemas/csv-config.json");

/// Validate a JSON value against a JSON schema.
///
/// Returns every validation error message on failure.
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema).map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// The embedded configuration schema.
pub fn config_schema() -> Result<Value, Vec<String>> {
    serde_json::from_str(CONFIG_SCHEMA).map_err(|e| vec![format!("Invalid embedded schema: {}", e)])
}

/// Validate a raw configuration against the embedded schema.
pub fn validate_config(data: &Value) -> Result<(), Vec<String>> {
    validate(&config_schema()?, data)
}

pub fn is_valid_config(data: &Value) -> bool {
    config_schema().map(|schema| is_valid(&schema, data)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embedded_schema_parses() {
        assert!(config_schema().is_ok());
    }

    #[test]
    fn test_valid_config() {
        let config = json!({
            "FilePathData": [{ "CaptureRegex": "(?P<dcm>.+)/" }],
            "PreProcessor": [{ "Type": 3, "Cell": { "Row": 0, "Column": 0 }, "Value": "@timestamp" }],
            "CellLocations": [
                { "Location": { "Row": 4, "Column": 1 }, "DataType": "int64", "NameCell": { "Row": 4, "Column": 0 } }
            ],
            "TableLocations": [{
                "Name": "wave",
                "StartCell": { "Row": 21, "Column": 0 },
                "EndCell": { "Row": -1, "Column": -1 },
                "HeaderNames": ["Time ms"],
                "ColumnDataTypes": [3],
                "NameLocation": null
            }],
            "IdField": { "Parameters": [{ "Mapping": ["sequence", 1] }], "Delimiter": "_" },
            "KeepSpaces": true
        });
        assert!(validate_config(&config).is_ok());
        assert!(is_valid_config(&config));
    }

    #[test]
    fn test_invalid_configs() {
        // Unknown top-level key
        assert!(validate_config(&json!({ "CellLocation": [] })).is_err());
        // Data type code out of range
        let config = json!({ "CellLocations": [{ "DataType": 8 }] });
        assert!(validate_config(&config).is_err());
        // Processor without a Type
        let config = json!({ "PreProcessor": [{ "Name": "x" }] });
        let errors = validate_config(&config).unwrap_err();
        assert!(!errors.is_empty());
        // Mapping segments must be strings or integers
        let config = json!({ "IdField": { "Parameters": [{ "Mapping": [true] }] } });
        assert!(!is_valid_config(&config));
    }

    #[test]
    fn test_generic_validate() {
        let schema = json!({
            "type": "object",
            "required": ["name"],
            "properties": { "name": { "type": "string" } }
        });
        assert!(validate(&schema, &json!({ "name": "test" })).is_ok());
        assert!(validate(&schema, &json!({ "age": 42 })).is_err());
    }
}
