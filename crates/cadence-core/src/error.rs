use thiserror::Error;

use crate::models::TaskStatus;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Malformed task data")]
    Json(#[from] serde_json::Error),

    #[error("Invalid timestamp: {0}")]
    Parse(String),

    #[error("{label} end must be later than {label} start")]
    InvalidRange { label: &'static str },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Task not found: {0}")]
    NotFound(i64),

    #[error("Cannot move task from '{from}' to '{to}'")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CoreError {
    /// Whether the error was caused by the caller's input rather than the store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CoreError::Parse(_)
                | CoreError::InvalidRange { .. }
                | CoreError::MissingField(_)
                | CoreError::InvalidTransition { .. }
                | CoreError::InvalidInput(_)
        )
    }
}
