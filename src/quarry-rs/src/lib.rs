//! Quarry Client Library
//!
//! HTTP client for hosted search indexes: an [`Index`] facade over a
//! reqwest transport, plus the page sources used to browse objects, rules
//! and synonyms.

mod client;
mod index;
pub mod pages;
pub mod transport;

#[cfg(test)]
mod mock;

pub use client::SearchClient;
pub use index::{FreshObjectsOutcome, Index};
pub use pages::{ObjectPages, PagedResource, SearchPages, DEFAULT_HITS_PER_PAGE};
pub use transport::HttpApiWrapper;

pub use quarry_core;
pub use quarry_core::{
    Browser, Config, Error, Record, RequestOptions, Result, TaskId, TaskPoller, TaskStatus,
};
