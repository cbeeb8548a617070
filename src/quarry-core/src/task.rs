//! Waiting for asynchronous tasks
//!
//! Writes return a task id immediately and are applied later by the server.
//! [`TaskPoller`] queries the task status until it reports `published` or
//! the attempt budget runs out, sleeping a stepped backoff between queries.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::default_wait_task_retries;
use crate::error::{Error, Result};
use crate::models::{TaskId, TaskStatus};
use crate::options::RequestOptions;

/// Source of task status payloads
#[async_trait]
pub trait TaskStatusSource: Send + Sync {
    async fn task_status(&self, task_id: TaskId, options: &RequestOptions) -> Result<TaskStatus>;
}

/// Sleep between attempt `n` and attempt `n + 1`: 100ms per started block of ten attempts
pub fn backoff_delay(attempt: u32) -> Duration {
    let factor = u64::from(attempt.max(1)).div_ceil(10);
    Duration::from_millis(factor * 100)
}

/// Polls a task until it is published
#[derive(Debug, Clone)]
pub struct TaskPoller {
    max_attempts: u32,
    cancel: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl Default for TaskPoller {
    fn default() -> Self {
        Self::new(default_wait_task_retries())
    }
}

impl TaskPoller {
    /// Create a poller making at most `max_attempts` status queries (at least one)
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            cancel: None,
            deadline: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait for `task_id` to be published, returning the last status payload
    pub async fn wait<S>(
        &self,
        source: &S,
        task_id: TaskId,
        options: &RequestOptions,
    ) -> Result<TaskStatus>
    where
        S: TaskStatusSource + ?Sized,
    {
        let mut attempt: u32 = 1;

        loop {
            self.check_cancelled()?;

            let status = source.task_status(task_id, options).await?;
            if status.is_published() {
                debug!(task_id = %task_id, attempt, "Task published");
                return Ok(status);
            }

            if attempt >= self.max_attempts {
                warn!(
                    task_id = %task_id,
                    attempts = attempt,
                    "Task still pending after exhausting retry budget"
                );
                return Err(Error::TaskTimeout {
                    task_id,
                    attempts: attempt,
                });
            }

            let delay = backoff_delay(attempt);
            debug!(task_id = %task_id, attempt, ?delay, "Task pending, backing off");
            self.sleep(delay).await?;
            attempt += 1;
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.as_ref().is_some_and(|token| token.is_cancelled()) {
            return Err(Error::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    async fn sleep(&self, delay: Duration) -> Result<()> {
        self.check_cancelled()?;

        let wake = Instant::now() + delay;
        let cut_short = self.deadline.is_some_and(|deadline| deadline < wake);
        let until = match self.deadline {
            Some(deadline) if cut_short => deadline,
            _ => wake,
        };

        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep_until(until) => {}
                }
            }
            None => tokio::time::sleep_until(until).await,
        }

        if cut_short {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}
