use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::FromRow;
use std::path::Path;
use tracing::info;

use super::json::read_task_file;
use super::TaskStore;
use crate::db::{establish_connection, DbPool};
use crate::error::CoreError;
use crate::models::{RecurrenceRule, Task, TaskKind, TaskStatus};

/// Tasks kept in a SQLite `tasks` table. The recurrence rule lives in a JSON text column.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

#[derive(Debug, FromRow)]
struct TaskRecord {
    id: i64,
    title: String,
    category: String,
    importance: String,
    kind: TaskKind,
    status: TaskStatus,
    planned_start_at: Option<NaiveDateTime>,
    planned_end_at: Option<NaiveDateTime>,
    actual_start_at: Option<NaiveDateTime>,
    actual_end_at: Option<NaiveDateTime>,
    completed_at: Option<NaiveDateTime>,
    note: Option<String>,
    is_recurring_template: bool,
    recurrence_json: Option<String>,
    template_id: Option<i64>,
}

impl TryFrom<TaskRecord> for Task {
    type Error = CoreError;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        let recurrence: Option<RecurrenceRule> = record
            .recurrence_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(Task {
            id: record.id,
            title: record.title,
            category: record.category,
            importance: record.importance,
            kind: record.kind,
            status: record.status,
            planned_start_at: record.planned_start_at,
            planned_end_at: record.planned_end_at,
            actual_start_at: record.actual_start_at,
            actual_end_at: record.actual_end_at,
            completed_at: record.completed_at,
            note: record.note,
            is_recurring_template: record.is_recurring_template,
            recurrence,
            template_id: record.template_id,
        })
    }
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Connects to `db_path`, then imports `legacy_import` if the table is still empty.
    pub async fn open(db_path: impl AsRef<Path>, legacy_import: Option<&Path>) -> Result<Self, CoreError> {
        let store = Self::new(establish_connection(db_path).await?);
        if let Some(legacy) = legacy_import {
            store.bootstrap_from(legacy).await?;
        }
        Ok(store)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// One-shot import of a JSON task file into an empty table.
    /// Returns the number of imported rows; a populated table is left alone.
    pub async fn bootstrap_from(&self, legacy: &Path) -> Result<usize, CoreError> {
        let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks")
            .fetch_one(&self.pool)
            .await?;
        if existing > 0 {
            return Ok(0);
        }

        let tasks = read_task_file(legacy).await?;
        if tasks.is_empty() {
            return Ok(0);
        }
        let imported = tasks.len();
        self.replace(tasks).await?;
        info!(path = %legacy.display(), imported, "Imported legacy task file");
        Ok(imported)
    }
}

#[async_trait]
impl TaskStore for SqliteStore {
    async fn load(&self) -> Result<Vec<Task>, CoreError> {
        let records: Vec<TaskRecord> = sqlx::query_as(
            r#"SELECT id, title, category, importance, kind, status,
                      planned_start_at, planned_end_at, actual_start_at, actual_end_at, completed_at,
                      note, is_recurring_template, recurrence_json, template_id
               FROM tasks
               ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        records.into_iter().map(Task::try_from).collect()
    }

    async fn replace(&self, tasks: Vec<Task>) -> Result<(), CoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM tasks").execute(&mut *tx).await?;

        for task in &tasks {
            let recurrence_json = task
                .recurrence
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            sqlx::query(
                r#"INSERT INTO tasks (id, title, category, importance, kind, status,
                                      planned_start_at, planned_end_at, actual_start_at, actual_end_at, completed_at,
                                      note, is_recurring_template, recurrence_json, template_id)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"#,
            )
            .bind(task.id)
            .bind(&task.title)
            .bind(&task.category)
            .bind(&task.importance)
            .bind(task.kind)
            .bind(task.status)
            .bind(task.planned_start_at)
            .bind(task.planned_end_at)
            .bind(task.actual_start_at)
            .bind(task.actual_end_at)
            .bind(task.completed_at)
            .bind(&task.note)
            .bind(task.is_recurring_template)
            .bind(recurrence_json)
            .bind(task.template_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
