//! ERP search domains
//!
//! A domain is a list of `(field, operator, value)` triples, implicitly
//! AND-ed by the server. Field paths may be dotted for joined filters
//! (e.g. `location_id.usage`).

use serde::Serialize;
use serde_json::{Value, json};

/// One `(field, operator, value)` triple, serialized as a JSON array
#[derive(Debug, Clone, Serialize)]
pub struct Condition(pub String, pub String, pub Value);

pub type Domain = Vec<Condition>;

pub fn eq(field: &str, value: impl Into<Value>) -> Condition {
    Condition(field.to_string(), "=".to_string(), value.into())
}

pub fn ne(field: &str, value: impl Into<Value>) -> Condition {
    Condition(field.to_string(), "!=".to_string(), value.into())
}

pub fn is_in(field: &str, values: impl IntoIterator<Item = impl Into<Value>>) -> Condition {
    let values: Vec<Value> = values.into_iter().map(Into::into).collect();
    Condition(field.to_string(), "in".to_string(), json!(values))
}

pub fn not_in(field: &str, values: impl IntoIterator<Item = impl Into<Value>>) -> Condition {
    let values: Vec<Value> = values.into_iter().map(Into::into).collect();
    Condition(field.to_string(), "not in".to_string(), json!(values))
}
