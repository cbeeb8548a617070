//! Quarry Core Library
//!
//! This crate provides the transport-independent pieces of the Quarry
//! search client, including:
//! - Record, batch and task data model
//! - Request options with merge-over-defaults semantics
//! - Batch building with objectID enforcement
//! - Task polling with stepped backoff
//! - Lazy cursor browsing over paginated endpoints
//! - Client configuration

pub mod api;
pub mod batch;
pub mod browse;
pub mod config;
pub mod error;
pub mod models;
pub mod options;
pub mod task;

// Re-export commonly used types
pub use api::{api_path, ApiWrapper, Method};
pub use batch::{build_batch, build_query, ensure_object_ids, to_record, to_records};
pub use browse::{Browser, Page, PageSource};
pub use config::{default_wait_task_retries, set_default_wait_task_retries, Config};
pub use error::{Error, Result};
pub use models::*;
pub use options::RequestOptions;
pub use task::{backoff_delay, TaskPoller, TaskStatusSource};
