//! JSON Schema check of output person records.
//!
//! The embedded `schemas/hunter.json` lists the fields the registry import
//! requires to be non-empty. Failures are reported as warnings only.

use serde_json::Value;

use crate::models::PersonRecord;

const HUNTER_SCHEMA: &str = include_str!("../../schemas/hunter.json");

/// Validate a JSON value against a JSON schema (draft 7).
///
/// # Example
/// ```ignore
/// use serde_json::json;
/// use hunterload::validation::validate;
///
/// let schema = json!({
///     "type": "object",
///     "required": ["surname"],
///     "properties": { "surname": { "type": "string" } }
/// });
///
/// assert!(validate(&schema, &json!({ "surname": "Иванов" })).is_ok());
/// assert!(validate(&schema, &json!({ "age": 42 })).is_err());
/// ```
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator =
        jsonschema::draft7::new(schema).map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Boolean form of [`validate`].
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// The embedded person schema.
pub fn hunter_schema() -> Result<Value, String> {
    serde_json::from_str(HUNTER_SCHEMA).map_err(|e| format!("Invalid embedded schema: {}", e))
}

/// Field names the person schema requires.
pub fn required_fields(schema: &Value) -> Vec<String> {
    schema["required"]
        .as_array()
        .map(|fields| {
            fields
                .iter()
                .filter_map(|f| f.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Check a person record; the error lists each empty required field.
pub fn validate_person(schema: &Value, person: &PersonRecord) -> Result<(), Vec<String>> {
    let data = serde_json::to_value(person).map_err(|e| vec![e.to_string()])?;
    if is_valid(schema, &data) {
        return Ok(());
    }

    let empty: Vec<String> = required_fields(schema)
        .into_iter()
        .filter(|field| data[field.as_str()].as_str().map(str::is_empty).unwrap_or(true))
        .map(|field| format!("required field '{}' is empty", field))
        .collect();

    if empty.is_empty() {
        validate(schema, &data)
    } else {
        Err(empty)
    }
}
