use crate::error::CoreError;
use crate::models::{DeleteOutcome, NewTaskData, Task, TaskStatus, UpdateTaskData};
use crate::recurrence::RecurrenceManager;
use crate::repository::materialization::{reconcile_all, reconcile_in_place};
use crate::repository::Repository;
use crate::store::TaskStore;
use crate::time::start_of_day;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

#[async_trait]
impl<S: TaskStore> super::TaskRepository for Repository<S> {
    async fn list_tasks(&self, include_templates: bool) -> Result<Vec<Task>, CoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tasks = self.load_reconciled().await?;

        tasks.retain(|task| include_templates || !task.is_recurring_template);
        tasks.sort_by_key(|task| (task.planned_start_at.is_none(), task.planned_start_at));
        Ok(tasks)
    }

    async fn list_tasks_for_day(&self, day: NaiveDate, include_templates: bool) -> Result<Vec<Task>, CoreError> {
        let _guard = self.write_lock.lock().await;
        let tasks = self.load_reconciled().await?;

        let day_start = start_of_day(day);
        let day_end = day_start + Duration::days(1);
        let mut on_day: Vec<(NaiveDateTime, Task)> = tasks
            .into_iter()
            .filter(|task| include_templates || !task.is_recurring_template)
            .filter_map(|task| {
                let start = task.effective_start()?;
                let end = task.effective_end().unwrap_or(start);
                // A task with no usable end occupies the instant it starts at.
                let overlaps = if end > start {
                    start < day_end && end > day_start
                } else {
                    day_start <= start && start < day_end
                };
                overlaps.then_some((start, task))
            })
            .collect();

        on_day.sort_by_key(|(start, _)| *start);
        Ok(on_day.into_iter().map(|(_, task)| task).collect())
    }

    async fn find_task_by_id(&self, id: i64) -> Result<Option<Task>, CoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tasks = self.store.load().await?;
        let Some(task) = tasks.iter().find(|task| task.id == id).cloned() else {
            return Ok(None);
        };

        if task.is_recurring_template && reconcile_in_place(&mut tasks, &task, self.window(), true) {
            self.store.replace(tasks).await?;
        }
        Ok(Some(task))
    }

    async fn add_task(&self, data: NewTaskData) -> Result<Task, CoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tasks = self.store.load().await?;

        let id = next_id(&tasks);
        let task = data.into_task(id, self.now());
        task.validate()?;

        tasks.push(task.clone());
        if task.is_recurring_template {
            reconcile_in_place(&mut tasks, &task, self.window(), true);
        }
        self.store.replace(tasks).await?;

        info!(task_id = id, template = task.is_recurring_template, "Created task");
        Ok(task)
    }

    async fn update_task(&self, id: i64, data: UpdateTaskData) -> Result<Task, CoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tasks = self.store.load().await?;
        let index = position(&tasks, id)?;

        if data.is_empty() {
            debug!(task_id = id, "Empty update, nothing to do");
            return Ok(tasks[index].clone());
        }

        let mut updated = data.apply(&tasks[index]);
        updated.settle_completion(self.now());
        updated.validate()?;

        tasks[index] = updated.clone();
        if updated.is_recurring_template {
            // Drop stale projections of the old schedule; done history stays.
            reconcile_in_place(&mut tasks, &updated, self.window(), false);
        }
        self.store.replace(tasks).await?;

        info!(task_id = id, "Updated task");
        Ok(updated)
    }

    async fn delete_task(&self, id: i64) -> Result<DeleteOutcome, CoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tasks = self.store.load().await?;
        let index = position(&tasks, id)?;
        let cascade = tasks[index].is_recurring_template;

        let before = tasks.len();
        tasks.retain(|task| task.id != id && !(cascade && task.is_instance_of(id)));
        let removed = before - tasks.len();
        self.store.replace(tasks).await?;

        info!(task_id = id, removed, "Deleted task");
        Ok(DeleteOutcome { id, removed })
    }

    async fn complete_task(&self, id: i64, done_at: Option<NaiveDateTime>) -> Result<Task, CoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tasks = self.store.load().await?;
        let index = position(&tasks, id)?;
        reject_template(&tasks[index])?;

        if tasks[index].status == TaskStatus::Done {
            return Ok(tasks[index].clone());
        }

        let task = &mut tasks[index];
        let mut finished_at = done_at.unwrap_or_else(|| self.now());
        if let Some(started) = task.actual_start_at {
            finished_at = finished_at.max(started);
        }
        task.status = TaskStatus::Done;
        task.completed_at = Some(finished_at);
        task.actual_end_at = Some(finished_at);
        let task = task.clone();

        self.store.replace(tasks).await?;
        info!(task_id = id, "Marked task done");
        Ok(task)
    }

    async fn start_task(&self, id: i64, at: Option<NaiveDateTime>) -> Result<Task, CoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tasks = self.store.load().await?;
        let index = position(&tasks, id)?;
        reject_template(&tasks[index])?;

        let mut task = tasks[index].clone();
        if task.status != TaskStatus::Todo {
            return Err(CoreError::InvalidTransition {
                from: task.status,
                to: TaskStatus::InProgress,
            });
        }
        task.status = TaskStatus::InProgress;
        task.actual_start_at.get_or_insert(at.unwrap_or_else(|| self.now()));
        task.validate()?;

        tasks[index] = task.clone();
        self.store.replace(tasks).await?;
        info!(task_id = id, "Started task");
        Ok(task)
    }

    async fn skip_task(&self, id: i64) -> Result<Task, CoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tasks = self.store.load().await?;
        let index = position(&tasks, id)?;
        reject_template(&tasks[index])?;

        let task = &mut tasks[index];
        if !matches!(task.status, TaskStatus::Todo | TaskStatus::InProgress) {
            return Err(CoreError::InvalidTransition {
                from: task.status,
                to: TaskStatus::Skipped,
            });
        }
        task.status = TaskStatus::Skipped;
        task.completed_at = None;
        let task = task.clone();

        self.store.replace(tasks).await?;
        info!(task_id = id, "Skipped task");
        Ok(task)
    }

    async fn preview_occurrences(&self, id: i64, count: usize) -> Result<Vec<NaiveDateTime>, CoreError> {
        let tasks = self.store.load().await?;
        let index = position(&tasks, id)?;
        let manager = RecurrenceManager::for_template(&tasks[index]).ok_or_else(|| {
            CoreError::InvalidInput(format!("Task {} is not a recurring template", id))
        })?;
        Ok(manager.preview_occurrences(self.now(), count))
    }
}

impl<S: TaskStore> Repository<S> {
    /// Loads the collection and materializes every template, persisting only
    /// when instances were added. Callers hold the write lock.
    async fn load_reconciled(&self) -> Result<Vec<Task>, CoreError> {
        let mut tasks = self.store.load().await?;
        if reconcile_all(&mut tasks, self.window()) {
            self.store.replace(tasks.clone()).await?;
            info!(tasks = tasks.len(), "Persisted materialized instances");
        }
        Ok(tasks)
    }
}

fn next_id(tasks: &[Task]) -> i64 {
    tasks.iter().map(|task| task.id).max().unwrap_or(0) + 1
}

fn position(tasks: &[Task], id: i64) -> Result<usize, CoreError> {
    tasks
        .iter()
        .position(|task| task.id == id)
        .ok_or(CoreError::NotFound(id))
}

fn reject_template(task: &Task) -> Result<(), CoreError> {
    if task.is_recurring_template {
        return Err(CoreError::InvalidInput(format!(
            "Task {} is a recurring template; act on one of its instances instead",
            task.id
        )));
    }
    Ok(())
}
