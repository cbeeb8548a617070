use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{BatchEntry, OperationTag, Record, OBJECT_ID};
use crate::options::render_param;

/// Fail with `InvalidInput` unless every record carries an `objectID`
pub fn ensure_object_ids(records: &[Record], message: &str) -> Result<()> {
    if records.iter().all(|record| record.contains_key(OBJECT_ID)) {
        Ok(())
    } else {
        Err(Error::InvalidInput(message.to_string()))
    }
}

/// Build batch entries tagging each record with `operation`.
///
/// The whole input is validated before any entry is produced: one record
/// without an `objectID` rejects the batch. Order and record bodies are
/// preserved exactly.
pub fn build_batch(records: Vec<Record>, operation: OperationTag) -> Result<Vec<BatchEntry>> {
    ensure_object_ids(
        &records,
        "All records must have an unique objectID (like a primary key) to be valid.",
    )?;

    Ok(records
        .into_iter()
        .map(|body| BatchEntry {
            action: operation,
            body,
        })
        .collect())
}

/// Encode flat parameters as an `application/x-www-form-urlencoded` string
pub fn build_query(args: &Record) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in args {
        serializer.append_pair(key, &render_param(value));
    }
    serializer.finish()
}

/// Convert a serializable value into a record, rejecting non-objects
pub fn to_record<T: serde::Serialize + ?Sized>(value: &T) -> Result<Record> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidInput(format!(
            "records must serialize to JSON objects, got {}",
            json_kind(&other)
        ))),
    }
}

/// Convert a slice of serializable values into records
pub fn to_records<T: serde::Serialize>(values: &[T]) -> Result<Vec<Record>> {
    values.iter().map(to_record).collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
