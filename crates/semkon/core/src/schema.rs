//! Strict validation of structured oracle output.
//!
//! Values are decoded into typed structs. Missing fields, unknown fields and
//! out-of-range values are rejected; nothing is coerced.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::SchemaError;
use crate::types::{CorrectnessExplanation, Proposition};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PropositionsResponse {
    data: Vec<Proposition>,
}

/// Validate an extraction response.
pub fn parse_propositions(value: &Value) -> Result<Vec<Proposition>, SchemaError> {
    let response: PropositionsResponse = decode(value, "propositions response")?;
    if let Some(bad) = response.data.iter().find(|p| p.line_number == 0) {
        return Err(SchemaError::Mismatch {
            what: "propositions response",
            reason: format!("line_num must be at least 1 (statement {:?})", bad.statement_text),
        });
    }
    Ok(response.data)
}

/// Validate a checking verdict.
pub fn parse_verdict(value: &Value) -> Result<CorrectnessExplanation, SchemaError> {
    decode(value, "verdict")
}

fn decode<T: DeserializeOwned>(value: &Value, what: &'static str) -> Result<T, SchemaError> {
    if !value.is_object() {
        return Err(SchemaError::NotAnObject { what });
    }
    T::deserialize(value).map_err(|e| SchemaError::Mismatch {
        what,
        reason: e.to_string(),
    })
}
