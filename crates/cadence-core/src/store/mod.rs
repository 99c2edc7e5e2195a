//! Persistence of the whole task collection.
//!
//! A store hands out the full ordered collection and accepts a full
//! replacement; there are no partial writes.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::Task;

pub mod json;
pub mod sqlite;

pub use json::JsonFileStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Every stored task, normalized, in id order.
    async fn load(&self) -> Result<Vec<Task>, CoreError>;

    /// Atomically swaps the stored collection for `tasks`.
    async fn replace(&self, tasks: Vec<Task>) -> Result<(), CoreError>;
}
