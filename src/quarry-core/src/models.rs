use serde::{Deserialize, Serialize};
use std::fmt;

/// Record is one indexed document, rule or synonym: a JSON object
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Key every record must carry before it is saved or updated
pub const OBJECT_ID: &str = "objectID";

/// TaskId identifies an asynchronous server-side operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        TaskId(id)
    }
}

/// TaskState is the binary view of a task: published or not yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Published,
}

/// TaskStatus is the payload returned by a task status query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        rename = "pendingTask",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pending_task: Option<bool>,
    #[serde(flatten)]
    pub extra: Record,
}

impl TaskStatus {
    /// Anything other than `"published"`, including a missing field, is pending
    pub fn state(&self) -> TaskState {
        match self.status.as_deref() {
            Some("published") => TaskState::Published,
            _ => TaskState::Pending,
        }
    }

    pub fn is_published(&self) -> bool {
        self.state() == TaskState::Published
    }
}

/// OperationTag names the action a batch entry performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationTag {
    AddObject,
    PartialUpdateObjectNoCreate,
    PartialUpdateObject,
    DeleteObject,
}

/// BatchEntry is one tagged operation inside a batch request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub action: OperationTag,
    pub body: Record,
}

/// WriteReceipt is returned by every asynchronous write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteReceipt {
    #[serde(rename = "taskID")]
    pub task_id: TaskId,
    #[serde(flatten)]
    pub extra: Record,
}

/// BatchResponse acknowledges each entry of a batch, in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(rename = "taskID")]
    pub task_id: TaskId,
    #[serde(rename = "objectIDs", default)]
    pub object_ids: Vec<String>,
}

/// SearchResponse holds one page of hits from a search endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Vec<Record>,
    #[serde(rename = "nbHits", default)]
    pub nb_hits: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(rename = "nbPages", default)]
    pub nb_pages: u32,
    #[serde(rename = "hitsPerPage", default, skip_serializing_if = "Option::is_none")]
    pub hits_per_page: Option<u32>,
    #[serde(flatten)]
    pub extra: Record,
}
