use crate::models::TaskId;

/// Errors surfaced by every Quarry operation
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Task {task_id} was not published after {attempts} attempts")]
    TaskTimeout { task_id: TaskId, attempts: u32 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether a transport may safely repeat the request that produced this error.
    ///
    /// Only network-level failures and server-side (5xx) errors qualify; 4xx
    /// responses and local failures never do.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Transport("connection reset".into()).is_retryable());
        assert!(Error::Api {
            status: 503,
            message: "unavailable".into()
        }
        .is_retryable());
        assert!(!Error::Api {
            status: 404,
            message: "Index does not exist".into()
        }
        .is_retryable());
        assert!(!Error::InvalidInput("missing objectID".into()).is_retryable());
        assert!(!Error::Cancelled.is_retryable());
    }

    #[test]
    fn test_task_timeout_message_names_task() {
        let err = Error::TaskTimeout {
            task_id: TaskId(42),
            attempts: 7,
        };
        assert_eq!(
            err.to_string(),
            "Task 42 was not published after 7 attempts"
        );
    }
}
