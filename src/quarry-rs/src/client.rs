use quarry_core::{ApiWrapper, Config, Result};
use std::sync::Arc;
use tracing::info;

use crate::index::Index;
use crate::transport::HttpApiWrapper;

/// Entry point: owns the transport and hands out index handles
#[derive(Clone)]
pub struct SearchClient {
    api: Arc<dyn ApiWrapper>,
    wait_task_retries: Option<u32>,
}

impl SearchClient {
    /// Create a client talking HTTP to the hosts named in `config`
    pub fn new(config: &Config) -> Result<Self> {
        let api = HttpApiWrapper::new(config)?;
        info!(
            app_id = %config.app_id,
            read_host = %config.read_host(),
            write_host = %config.write_host(),
            "Search client initialized"
        );
        Ok(Self {
            api: Arc::new(api),
            wait_task_retries: config.wait_task_retries,
        })
    }

    /// Create a client over any transport, e.g. a test double
    pub fn with_api(api: Arc<dyn ApiWrapper>) -> Self {
        Self {
            api,
            wait_task_retries: None,
        }
    }

    pub fn with_wait_task_retries(mut self, retries: u32) -> Self {
        self.wait_task_retries = Some(retries);
        self
    }

    /// Handle on the index called `name`; no request is made
    pub fn init_index(&self, name: impl Into<String>) -> Index {
        let index = Index::new(name, self.api.clone());
        match self.wait_task_retries {
            Some(retries) => index.with_wait_task_retries(retries),
            None => index,
        }
    }
}
