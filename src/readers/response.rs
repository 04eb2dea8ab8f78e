//! Envelope of a CKAN `datastore_search_sql` response.

use crate::error::{BulletinError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row as returned by the datastore, before any type coercion.
///
/// The datastore is loose about types: ids arrive as numbers or strings,
/// values as numbers, numeric strings or null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub station_id: Value,
    #[serde(default)]
    pub variable_id: Value,
    #[serde(default)]
    pub reftime: Value,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Deserialize)]
struct DatastoreResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Option<DatastoreResult>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct DatastoreResult {
    #[serde(default)]
    records: Vec<RawRecord>,
}

/// Extracts `result.records` from a response body.
///
/// An empty body, or a successful response without a result, yields no
/// records. `success: false` is an API error.
pub fn parse_records(body: &str) -> Result<Vec<RawRecord>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let response: DatastoreResponse = serde_json::from_str(body)?;

    if !response.success {
        let message = response
            .error
            .as_ref()
            .map(describe_error)
            .unwrap_or_else(|| "request was not successful".to_string());
        return Err(BulletinError::Api(message));
    }

    Ok(response.result.map(|r| r.records).unwrap_or_default())
}

/// CKAN errors look like `{"__type": "Validation Error", "query": ["..."]}`
fn describe_error(error: &Value) -> String {
    let Some(obj) = error.as_object() else {
        return error.to_string();
    };

    let kind = obj
        .get("__type")
        .and_then(Value::as_str)
        .unwrap_or("Error");

    let details: Vec<String> = obj
        .iter()
        .filter(|(k, _)| k.as_str() != "__type")
        .map(|(k, v)| match v {
            Value::Array(items) => format!(
                "{}: {}",
                k,
                items
                    .iter()
                    .map(|i| i.as_str().map(str::to_string).unwrap_or_else(|| i.to_string()))
                    .collect::<Vec<_>>()
                    .join("; ")
            ),
            Value::String(s) => format!("{}: {}", k, s),
            other => format!("{}: {}", k, other),
        })
        .collect();

    if details.is_empty() {
        kind.to_string()
    } else {
        format!("{} ({})", kind, details.join(", "))
    }
}
