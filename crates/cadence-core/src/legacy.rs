//! Coercion of stored rows, including ones written by older versions of the
//! task file, into the current [`Task`] shape.
//!
//! Applying the normalizer to its own serialized output is a no-op.

use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::CoreError;
use crate::models::{RecurrenceRule, Task, TaskKind, TaskStatus, DEFAULT_IMPORTANCE};
use crate::time::parse_timestamp;

/// Category label that marks a row as sleep when it carries no explicit kind.
pub const SLEEP_CATEGORY: &str = "睡眠";

/// Category given to stored rows that have none. Rows created through the
/// repository use [`crate::models::DEFAULT_CATEGORY`] instead.
pub const LEGACY_DEFAULT_CATEGORY: &str = "日常";

const TIMESTAMP_FIELDS: [&str; 3] = ["actual_start_at", "actual_end_at", "completed_at"];

pub fn normalize_rows(rows: Vec<Value>) -> Result<Vec<Task>, CoreError> {
    rows.into_iter().map(normalize_row).collect()
}

pub fn normalize_row(row: Value) -> Result<Task, CoreError> {
    let Value::Object(mut fields) = row else {
        return Err(CoreError::InvalidInput(
            "task row must be a JSON object".to_string(),
        ));
    };

    let id = match fields.remove("id") {
        None | Some(Value::Null) => return Err(CoreError::MissingField("id".to_string())),
        Some(value) => value
            .as_i64()
            .ok_or_else(|| CoreError::InvalidInput(format!("task id must be an integer, got {}", value)))?,
    };

    // Old files stored the plan as start_at/end_at.
    let planned_start_at = match take_timestamp(&mut fields, "planned_start_at")? {
        Some(at) => Some(at),
        None => take_timestamp(&mut fields, "start_at")?,
    };
    let planned_end_at = match take_timestamp(&mut fields, "planned_end_at")? {
        Some(at) => Some(at),
        None => take_timestamp(&mut fields, "end_at")?,
    };

    let category = take_string(&mut fields, "category").unwrap_or_else(|| LEGACY_DEFAULT_CATEGORY.to_string());
    let kind = match take_string(&mut fields, "type").or_else(|| take_string(&mut fields, "task_type")) {
        Some(raw) => raw.parse::<TaskKind>().unwrap_or_else(|_| {
            warn!(task_id = id, kind = %raw, "Unknown task kind, treating as task");
            TaskKind::Task
        }),
        None if category == SLEEP_CATEGORY => TaskKind::Sleep,
        None => TaskKind::Task,
    };

    let status = match take_string(&mut fields, "status") {
        Some(raw) => raw.parse::<TaskStatus>().unwrap_or_else(|_| {
            warn!(task_id = id, status = %raw, "Unknown task status, resetting to todo");
            TaskStatus::Todo
        }),
        None => TaskStatus::Todo,
    };

    let mut stamps = [None; 3];
    for (slot, key) in stamps.iter_mut().zip(TIMESTAMP_FIELDS) {
        *slot = take_timestamp(&mut fields, key)?;
    }
    let [actual_start_at, actual_end_at, completed_at] = stamps;
    let completed_at = match (status, completed_at) {
        (TaskStatus::Done, None) => {
            let stamp = actual_end_at
                .or(planned_end_at)
                .or(actual_start_at)
                .or(planned_start_at);
            warn!(task_id = id, stamp = ?stamp, "Done task without completion time");
            stamp
        }
        (TaskStatus::Done, stamp) => stamp,
        (_, None) => None,
        (_, Some(stamp)) => {
            warn!(task_id = id, %stamp, "Dropping completion time of unfinished task");
            None
        }
    };

    let recurrence = match fields.remove("recurrence") {
        None | Some(Value::Null) => None,
        Some(Value::Object(rule)) => Some(normalize_rule(id, rule)?),
        Some(other) => {
            return Err(CoreError::InvalidInput(format!(
                "task {} has a malformed recurrence: {}",
                id, other
            )))
        }
    };

    Ok(Task {
        id,
        title: take_string(&mut fields, "title").unwrap_or_default(),
        category,
        importance: take_string(&mut fields, "importance")
            .unwrap_or_else(|| DEFAULT_IMPORTANCE.to_string()),
        kind,
        status,
        planned_start_at,
        planned_end_at,
        actual_start_at,
        actual_end_at,
        completed_at,
        note: take_string(&mut fields, "note"),
        is_recurring_template: fields
            .remove("is_recurring_template")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        recurrence,
        template_id: fields.remove("template_id").and_then(|v| v.as_i64()),
    })
}

fn normalize_rule(id: i64, mut rule: Map<String, Value>) -> Result<RecurrenceRule, CoreError> {
    // Null members mean "use the default".
    rule.retain(|_, value| !value.is_null());
    if let Some(Value::String(until)) = rule.get("until") {
        let until = parse_timestamp(until)?;
        rule.insert("until".to_string(), serde_json::to_value(until)?);
    }
    serde_json::from_value(Value::Object(rule))
        .map_err(|e| CoreError::InvalidInput(format!("task {} has an invalid recurrence: {}", id, e)))
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(text)) => Some(text),
        _ => None,
    }
}

fn take_timestamp(
    fields: &mut Map<String, Value>,
    key: &str,
) -> Result<Option<NaiveDateTime>, CoreError> {
    match fields.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
        Some(Value::String(text)) => parse_timestamp(&text).map(Some),
        Some(other) => Err(CoreError::InvalidInput(format!(
            "{} must be a timestamp string, got {}",
            key, other
        ))),
    }
}
