//! Recording transport for tests

use async_trait::async_trait;
use quarry_core::{ApiWrapper, Method, RequestOptions, Result};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Read,
    Write,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub kind: CallKind,
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub options: RequestOptions,
}

/// Replays scripted responses in order and records every call.
///
/// Once the script is exhausted each call answers `{"taskID": 1}`.
pub struct RecordingApi {
    responses: Mutex<VecDeque<Result<Value>>>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::with_results(Vec::new())
    }

    pub fn with_responses(responses: Vec<Value>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(results: Vec<Result<Value>>) -> Self {
        Self {
            responses: Mutex::new(results.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(&self, call: Call) -> Result<Value> {
        self.calls.lock().unwrap().push(call);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({"taskID": 1})))
    }
}

#[async_trait]
impl ApiWrapper for RecordingApi {
    async fn read(&self, method: Method, path: &str, options: &RequestOptions) -> Result<Value> {
        self.respond(Call {
            kind: CallKind::Read,
            method,
            path: path.to_string(),
            body: None,
            options: options.clone(),
        })
    }

    async fn write(
        &self,
        method: Method,
        path: &str,
        body: Value,
        options: &RequestOptions,
    ) -> Result<Value> {
        self.respond(Call {
            kind: CallKind::Write,
            method,
            path: path.to_string(),
            body: Some(body),
            options: options.clone(),
        })
    }
}
