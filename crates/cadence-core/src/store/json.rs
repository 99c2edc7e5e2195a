use async_trait::async_trait;
use serde_json::Value;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use super::TaskStore;
use crate::error::CoreError;
use crate::legacy::normalize_rows;
use crate::models::Task;

/// Tasks kept as a single JSON array on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_atomically(&self, contents: &[u8]) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut temp_name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("tasks.json"));
        temp_name.push(".tmp");
        let temp_path = self.path.with_file_name(temp_name);

        tokio::fs::write(&temp_path, contents).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

/// Reads and normalizes a task file. A missing or blank file holds no tasks.
pub async fn read_task_file(path: &Path) -> Result<Vec<Task>, CoreError> {
    parse_tasks(&read_or_empty(path).await?)
}

async fn read_or_empty(path: &Path) -> Result<String, CoreError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

fn parse_tasks(text: &str) -> Result<Vec<Task>, CoreError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let rows: Vec<Value> = serde_json::from_str(text)?;
    let mut tasks = normalize_rows(rows)?;
    tasks.sort_by_key(|task| task.id);
    Ok(tasks)
}

#[async_trait]
impl TaskStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<Task>, CoreError> {
        let _guard = self.lock.lock().await;
        let text = read_or_empty(&self.path).await?;
        if text.trim().is_empty() {
            debug!(path = %self.path.display(), "Initializing empty task file");
            self.write_atomically(b"[]").await?;
            return Ok(Vec::new());
        }
        parse_tasks(&text)
    }

    async fn replace(&self, mut tasks: Vec<Task>) -> Result<(), CoreError> {
        let _guard = self.lock.lock().await;
        tasks.sort_by_key(|task| task.id);
        let contents = serde_json::to_vec_pretty(&tasks)?;
        self.write_atomically(&contents).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTaskData, TaskStatus};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn task(id: i64, title: &str) -> Task {
        let now = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        NewTaskData {
            title: title.to_string(),
            ..Default::default()
        }
        .into_task(id, now)
    }

    #[tokio::test]
    async fn test_missing_file_is_initialized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("tasks.json");
        let store = JsonFileStore::new(&path);

        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_blank_file_is_initialized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, "  \n").unwrap();
        let store = JsonFileStore::new(&path);

        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_replace_then_load_sorted_by_id() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("tasks.json"));
        store
            .replace(vec![task(3, "c"), task(1, "a"), task(2, "b")])
            .await
            .unwrap();

        let loaded = store.load().await.unwrap();
        let ids: Vec<i64> = loaded.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(loaded[0].title, "a");
        assert!(!dir.path().join("tasks.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_legacy_rows_are_normalized_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(
            &path,
            r#"[{"id": 1, "title": "Old", "start_at": "2025-12-01T09:00:00Z", "status": "archived"}]"#,
        )
        .unwrap();

        let loaded = JsonFileStore::new(&path).load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].status, TaskStatus::Todo);
        assert!(loaded[0].planned_start_at.is_some());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, "{not json").unwrap();

        let result = JsonFileStore::new(&path).load().await;
        assert!(matches!(result, Err(CoreError::Json(_))));
    }
}
