//! Per-request options
//!
//! Every facade call accepts a [`RequestOptions`]. Internally the facade
//! builds its own defaults (for example `forwardToReplicas=true` or the
//! browse cursor) and merges the caller's options on top, so anything the
//! caller sets explicitly wins.

use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::models::Record;

/// Query parameters, body parameters, headers and timeouts for one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    query: Record,
    body: Record,
    headers: BTreeMap<String, String>,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_query_parameter(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_query_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_query_parameter(key, value);
        self
    }

    pub fn set_body_parameter(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.body.insert(key.into(), value.into());
        self
    }

    pub fn with_body_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_body_parameter(key, value);
        self
    }

    pub fn remove_query_parameter(&mut self, key: &str) -> Option<Value> {
        self.query.remove(key)
    }

    pub fn remove_body_parameter(&mut self, key: &str) -> Option<Value> {
        self.body.remove(key)
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    pub fn query_parameters(&self) -> &Record {
        &self.query
    }

    pub fn body_parameters(&self) -> &Record {
        &self.body
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout
    }

    /// Layer these options over `defaults`; values set here take precedence
    pub fn merged_over(&self, defaults: RequestOptions) -> RequestOptions {
        let mut merged = defaults;
        for (key, value) in &self.query {
            merged.query.insert(key.clone(), value.clone());
        }
        for (key, value) in &self.body {
            merged.body.insert(key.clone(), value.clone());
        }
        for (name, value) in &self.headers {
            merged.headers.insert(name.clone(), value.clone());
        }
        merged.read_timeout = self.read_timeout.or(merged.read_timeout);
        merged.write_timeout = self.write_timeout.or(merged.write_timeout);
        merged
    }

    /// Query parameters rendered as URL-ready string pairs.
    ///
    /// Strings are used verbatim; every other JSON value is rendered with
    /// its JSON text (`true`, `2`, `["a","b"]`).
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .iter()
            .map(|(key, value)| (key.clone(), render_param(value)))
            .collect()
    }

    /// Combine a request body with the body parameters.
    ///
    /// Object bodies receive the parameters (parameters overwrite matching
    /// keys), a null body becomes an object of just the parameters, and any
    /// other body (e.g. a JSON array) is returned untouched.
    pub fn apply_to_body(&self, body: Value) -> Value {
        match body {
            Value::Object(mut map) => {
                for (key, value) in &self.body {
                    map.insert(key.clone(), value.clone());
                }
                Value::Object(map)
            }
            Value::Null => Value::Object(self.body.clone()),
            other => other,
        }
    }
}

pub(crate) fn render_param(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_caller_values_override_defaults() {
        let defaults = RequestOptions::new()
            .with_query_parameter("forwardToReplicas", true)
            .with_body_parameter("cursor", "internal");
        let caller = RequestOptions::new()
            .with_query_parameter("forwardToReplicas", false)
            .with_body_parameter("cursor", "caller");

        let merged = caller.merged_over(defaults);
        assert_eq!(merged.query_parameters()["forwardToReplicas"], json!(false));
        assert_eq!(merged.body_parameters()["cursor"], json!("caller"));
    }

    #[test]
    fn test_defaults_survive_when_caller_is_silent() {
        let defaults = RequestOptions::new()
            .with_query_parameter("getVersion", 2)
            .with_read_timeout(Duration::from_secs(3));
        let caller = RequestOptions::new().with_header("X-Forwarded-For", "10.0.0.1");

        let merged = caller.merged_over(defaults);
        assert_eq!(merged.query_parameters()["getVersion"], json!(2));
        assert_eq!(merged.read_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(
            merged.headers().get("X-Forwarded-For").map(String::as_str),
            Some("10.0.0.1")
        );
    }

    #[test]
    fn test_query_pairs_render_json_scalars() {
        let options = RequestOptions::new()
            .with_query_parameter("forwardToReplicas", true)
            .with_query_parameter("getVersion", 2)
            .with_query_parameter("attributesToRetrieve", "title,price");

        let mut pairs = options.query_pairs();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("attributesToRetrieve".to_string(), "title,price".to_string()),
                ("forwardToReplicas".to_string(), "true".to_string()),
                ("getVersion".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_apply_to_body() {
        let options = RequestOptions::new().with_body_parameter("hitsPerPage", 5);

        assert_eq!(
            options.apply_to_body(json!({"query": "shoes", "hitsPerPage": 20})),
            json!({"query": "shoes", "hitsPerPage": 5})
        );
        assert_eq!(options.apply_to_body(json!(null)), json!({"hitsPerPage": 5}));
        assert_eq!(
            options.apply_to_body(json!([{"objectID": "1"}])),
            json!([{"objectID": "1"}])
        );
    }
}
