//! Output schema for generated profiles and the validation boundary
//!
//! The schema sent to the backend is derived from [`GeneratedProfile`]. Responses
//! are checked here and come back as a tagged [`SchemaCheck`]; nothing from the
//! backend reaches a profile without passing through [`check`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const MIN_CORE_FUNCTIONS: usize = 3;
pub const MAX_CORE_FUNCTIONS: usize = 6;

/// Profile fields extracted by the generative backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[schemars(title = "CompanyProfile")]
pub struct GeneratedProfile {
    /// Organization name
    pub name: String,
    /// Industry sector, e.g. "Banking" or "Healthcare"
    pub sector: String,
    /// Main business functions of the organization
    #[schemars(length(min = 3, max = 6))]
    pub core_functions: Vec<String>,
    /// Regulatory frameworks that apply, e.g. "GDPR" or "PCI-DSS"
    #[schemars(length(min = 1))]
    pub regulatory_requirements: Vec<String>,
}

/// JSON schema describing [`GeneratedProfile`]
pub fn output_schema() -> Value {
    schemars::schema_for!(GeneratedProfile).to_value()
}

/// Why a backend response was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaViolation {
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` must be {expected}, got {found}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("coreFunctions must hold between 3 and 6 distinct entries, got {0}")]
    CoreFunctionCount(usize),
}

/// Result of validating a backend response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaCheck {
    Valid(GeneratedProfile),
    Violation(SchemaViolation),
}

impl From<Result<GeneratedProfile, SchemaViolation>> for SchemaCheck {
    fn from(result: Result<GeneratedProfile, SchemaViolation>) -> Self {
        match result {
            Ok(profile) => SchemaCheck::Valid(profile),
            Err(violation) => SchemaCheck::Violation(violation),
        }
    }
}

/// Validate a backend response.
///
/// Strings are trimmed and list entries de-duplicated before bounds are
/// checked, so three copies of one function do not pass as three functions.
/// Unknown fields are ignored.
pub fn check(value: &Value) -> SchemaCheck {
    validate(value).into()
}

fn validate(value: &Value) -> Result<GeneratedProfile, SchemaViolation> {
    let object = value
        .as_object()
        .ok_or_else(|| SchemaViolation::NotAnObject(kind(value)))?;

    let name = required_string(object, "name")?;
    let sector = required_string(object, "sector")?;

    let core_functions = string_list(object, "coreFunctions")?;
    if !(MIN_CORE_FUNCTIONS..=MAX_CORE_FUNCTIONS).contains(&core_functions.len()) {
        return Err(SchemaViolation::CoreFunctionCount(core_functions.len()));
    }

    let regulatory_requirements = string_list(object, "regulatoryRequirements")?;
    if regulatory_requirements.is_empty() {
        return Err(SchemaViolation::EmptyField("regulatoryRequirements"));
    }

    Ok(GeneratedProfile {
        name,
        sector,
        core_functions,
        regulatory_requirements,
    })
}

fn required_string(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<String, SchemaViolation> {
    let value = object.get(field).ok_or(SchemaViolation::MissingField(field))?;
    let text = value.as_str().ok_or(SchemaViolation::WrongType {
        field,
        expected: "a string",
        found: kind(value),
    })?;

    let text = text.trim();
    if text.is_empty() {
        return Err(SchemaViolation::EmptyField(field));
    }
    Ok(text.to_string())
}

/// Trimmed, non-empty, de-duplicated entries of a string array
fn string_list(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Vec<String>, SchemaViolation> {
    let value = object.get(field).ok_or(SchemaViolation::MissingField(field))?;
    let items = value.as_array().ok_or(SchemaViolation::WrongType {
        field,
        expected: "an array of strings",
        found: kind(value),
    })?;

    let mut entries: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let text = item.as_str().ok_or(SchemaViolation::WrongType {
            field,
            expected: "an array of strings",
            found: kind(item),
        })?;
        let text = text.trim();
        if !text.is_empty() && !entries.iter().any(|e| e == text) {
            entries.push(text.to_string());
        }
    }
    Ok(entries)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
