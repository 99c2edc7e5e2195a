use crate::error::CoreError;
use crate::models::{DeleteOutcome, NewTaskData, Task, UpdateTaskData};
use crate::recurrence::{MaterializationManager, Window};
use crate::store::TaskStore;
use crate::time::{Clock, SystemClock};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tokio::sync::Mutex;

pub mod materialization;
pub mod tasks;

/// Operations on the task collection. Every call reconciles the recurring
/// templates it touches against the rolling window before returning.
#[async_trait]
pub trait TaskRepository {
    /// All tasks by planned start, unscheduled ones last.
    async fn list_tasks(&self, include_templates: bool) -> Result<Vec<Task>, CoreError>;
    /// Tasks whose actual-or-planned interval overlaps `day`, by effective start.
    async fn list_tasks_for_day(&self, day: NaiveDate, include_templates: bool) -> Result<Vec<Task>, CoreError>;
    async fn find_task_by_id(&self, id: i64) -> Result<Option<Task>, CoreError>;
    async fn add_task(&self, data: NewTaskData) -> Result<Task, CoreError>;
    async fn update_task(&self, id: i64, data: UpdateTaskData) -> Result<Task, CoreError>;
    /// Deleting a template also deletes its instances.
    async fn delete_task(&self, id: i64) -> Result<DeleteOutcome, CoreError>;
    /// Marks a task done at `done_at` (default now). Already-done tasks are returned unchanged.
    async fn complete_task(&self, id: i64, done_at: Option<NaiveDateTime>) -> Result<Task, CoreError>;
    async fn start_task(&self, id: i64, at: Option<NaiveDateTime>) -> Result<Task, CoreError>;
    async fn skip_task(&self, id: i64) -> Result<Task, CoreError>;
    /// Upcoming occurrence starts of a template, without materializing them.
    async fn preview_occurrences(&self, id: i64, count: usize) -> Result<Vec<NaiveDateTime>, CoreError>;
}

/// Repository over any [`TaskStore`]
pub struct Repository<S> {
    store: S,
    clock: Arc<dyn Clock>,
    materialization_manager: MaterializationManager,
    // Serializes load-modify-replace cycles within the process
    write_lock: Mutex<()>,
}

impl<S: TaskStore> Repository<S> {
    pub fn new(store: S, materialization_manager: MaterializationManager) -> Self {
        Self::with_clock(store, materialization_manager, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, materialization_manager: MaterializationManager, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            materialization_manager,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// The materialization window as of now
    pub(crate) fn window(&self) -> Window {
        self.materialization_manager.window_at(self.now())
    }
}
