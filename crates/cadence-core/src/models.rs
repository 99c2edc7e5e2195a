use chrono::{Duration, NaiveDateTime, Weekday};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DeserializeAs, SerializeAs};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::CoreError;

pub const DEFAULT_CATEGORY: &str = "general";
pub const DEFAULT_IMPORTANCE: &str = "medium";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Skipped,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
            TaskStatus::Skipped => "skipped",
        }
    }

    /// `done` and `skipped` end an instance's lifecycle; only an explicit update reopens them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Skipped)
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Todo
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task status: {0}")]
pub struct ParseTaskStatusError(String);

impl FromStr for TaskStatus {
    type Err = ParseTaskStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            "skipped" => Ok(TaskStatus::Skipped),
            _ => Err(ParseTaskStatusError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum TaskKind {
    Task,
    Sleep,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Task => "task",
            TaskKind::Sleep => "sleep",
        }
    }
}

impl Default for TaskKind {
    fn default() -> Self {
        TaskKind::Task
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task kind: {0}")]
pub struct ParseTaskKindError(String);

impl FromStr for TaskKind {
    type Err = ParseTaskKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "task" => Ok(TaskKind::Task),
            "sleep" => Ok(TaskKind::Sleep),
            _ => Err(ParseTaskKindError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Yearly => write!(f, "yearly"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid recurrence frequency: {0}")]
pub struct ParseFrequencyError(String);

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            _ => Err(ParseFrequencyError(s.to_string())),
        }
    }
}

/// Serializes a weekday as its index from Monday (0) to Sunday (6).
/// Deserialization also accepts names such as `"mon"` or `"Monday"`.
pub struct WeekdayIndex;

pub fn weekday_from_index(index: i64) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

impl SerializeAs<Weekday> for WeekdayIndex {
    fn serialize_as<S>(source: &Weekday, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(source.num_days_from_monday() as u8)
    }
}

impl<'de> DeserializeAs<'de, Weekday> for WeekdayIndex {
    fn deserialize_as<D>(deserializer: D) -> Result<Weekday, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawWeekday {
            Index(i64),
            Name(String),
        }

        match RawWeekday::deserialize(deserializer)? {
            RawWeekday::Index(index) => weekday_from_index(index)
                .ok_or_else(|| de::Error::custom(format!("weekday index out of range: {}", index))),
            RawWeekday::Name(name) => name
                .parse::<Weekday>()
                .map_err(|_| de::Error::custom(format!("unknown weekday: {}", name))),
        }
    }
}

fn default_interval() -> i64 {
    1
}

/// One periodic pattern attached to a template task.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub freq: Frequency,
    /// Step between occurrences in the rule's unit. Values below 1 expand as 1.
    #[serde(default = "default_interval")]
    pub interval: i64,
    /// Only consulted for weekly rules; defaults to the seed's weekday.
    #[serde_as(as = "Option<Vec<WeekdayIndex>>")]
    #[serde(default)]
    pub weekdays: Option<Vec<Weekday>>,
    /// Inclusive upper bound on generated occurrence starts.
    #[serde(default)]
    pub until: Option<NaiveDateTime>,
}

impl RecurrenceRule {
    pub fn new(freq: Frequency) -> Self {
        Self {
            freq,
            interval: 1,
            weekdays: None,
            until: None,
        }
    }

    pub fn every(mut self, interval: i64) -> Self {
        self.interval = interval;
        self
    }

    pub fn on(mut self, weekdays: Vec<Weekday>) -> Self {
        self.weekdays = Some(weekdays);
        self
    }

    pub fn until(mut self, until: NaiveDateTime) -> Self {
        self.until = Some(until);
        self
    }

    #[inline]
    pub fn effective_interval(&self) -> i64 {
        self.interval.max(1)
    }
}

/// A schedulable unit of work, or the template that generates such units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub importance: String,
    #[serde(rename = "type", alias = "task_type")]
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub planned_start_at: Option<NaiveDateTime>,
    pub planned_end_at: Option<NaiveDateTime>,
    pub actual_start_at: Option<NaiveDateTime>,
    pub actual_end_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub note: Option<String>,
    pub is_recurring_template: bool,
    pub recurrence: Option<RecurrenceRule>,
    /// Set on instances only: the template that materialized this row.
    pub template_id: Option<i64>,
}

impl Task {
    pub fn is_instance_of(&self, template_id: i64) -> bool {
        self.template_id == Some(template_id)
    }

    /// Seed and rule, if this row can drive materialization.
    pub fn schedule(&self) -> Option<(NaiveDateTime, &RecurrenceRule)> {
        if !self.is_recurring_template {
            return None;
        }
        Some((self.planned_start_at?, self.recurrence.as_ref()?))
    }

    pub fn planned_duration(&self) -> Option<Duration> {
        Some(self.planned_end_at? - self.planned_start_at?)
    }

    /// Actual start when recorded, else planned start.
    pub fn effective_start(&self) -> Option<NaiveDateTime> {
        self.actual_start_at.or(self.planned_start_at)
    }

    /// Actual end when recorded, else planned end.
    pub fn effective_end(&self) -> Option<NaiveDateTime> {
        self.actual_end_at.or(self.planned_end_at)
    }

    /// Enforces "`completed_at` present iff done", stamping `now` when a
    /// done task has no completion time.
    pub fn settle_completion(&mut self, now: NaiveDateTime) {
        if self.status == TaskStatus::Done {
            self.completed_at.get_or_insert(now);
        } else {
            self.completed_at = None;
        }
    }

    /// Checks the write-path invariants, in the order clients see them.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_time_range(self.planned_start_at, self.planned_end_at, "planned")?;
        validate_time_range(self.actual_start_at, self.actual_end_at, "actual")?;
        if self.is_recurring_template {
            if self.recurrence.is_none() {
                return Err(CoreError::MissingField(
                    "recurrence is required for a recurring template".to_string(),
                ));
            }
            if self.planned_start_at.is_none() || self.planned_end_at.is_none() {
                return Err(CoreError::MissingField(
                    "planned_start_at and planned_end_at are required for a recurring template"
                        .to_string(),
                ));
            }
        }
        Ok(())
    }
}

pub fn validate_time_range(
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    label: &'static str,
) -> Result<(), CoreError> {
    match (start, end) {
        (Some(start), Some(end)) if end <= start => Err(CoreError::InvalidRange { label }),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewTaskData {
    pub title: String,
    pub category: Option<String>,
    pub importance: Option<String>,
    pub kind: Option<TaskKind>,
    pub status: Option<TaskStatus>,
    pub planned_start_at: Option<NaiveDateTime>,
    pub planned_end_at: Option<NaiveDateTime>,
    pub actual_start_at: Option<NaiveDateTime>,
    pub actual_end_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub note: Option<String>,
    /// When true the task becomes a template and `recurrence` is required
    pub is_recurring_template: bool,
    pub recurrence: Option<RecurrenceRule>,
}

impl NewTaskData {
    pub fn into_task(self, id: i64, now: NaiveDateTime) -> Task {
        let mut task = Task {
            id,
            title: self.title,
            category: self.category.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            importance: self.importance.unwrap_or_else(|| DEFAULT_IMPORTANCE.to_string()),
            kind: self.kind.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            planned_start_at: self.planned_start_at,
            planned_end_at: self.planned_end_at,
            actual_start_at: self.actual_start_at,
            actual_end_at: self.actual_end_at,
            completed_at: self.completed_at,
            note: self.note,
            is_recurring_template: self.is_recurring_template,
            recurrence: self.recurrence,
            template_id: None,
        };
        task.settle_completion(now);
        task
    }
}

/// A partial update. `None` leaves a field untouched; for nullable fields
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct UpdateTaskData {
    pub title: Option<String>,
    pub category: Option<String>,
    pub importance: Option<String>,
    pub kind: Option<TaskKind>,
    pub status: Option<TaskStatus>,
    pub planned_start_at: Option<Option<NaiveDateTime>>,
    pub planned_end_at: Option<Option<NaiveDateTime>>,
    pub actual_start_at: Option<Option<NaiveDateTime>>,
    pub actual_end_at: Option<Option<NaiveDateTime>>,
    pub completed_at: Option<Option<NaiveDateTime>>,
    pub note: Option<Option<String>>,
    pub is_recurring_template: Option<bool>,
    pub recurrence: Option<Option<RecurrenceRule>>,
}

impl UpdateTaskData {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.category.is_none()
            && self.importance.is_none()
            && self.kind.is_none()
            && self.status.is_none()
            && self.planned_start_at.is_none()
            && self.planned_end_at.is_none()
            && self.actual_start_at.is_none()
            && self.actual_end_at.is_none()
            && self.completed_at.is_none()
            && self.note.is_none()
            && self.is_recurring_template.is_none()
            && self.recurrence.is_none()
    }

    /// Merges this patch over `current`. Identity fields (`id`, `template_id`) never change.
    pub fn apply(&self, current: &Task) -> Task {
        let mut next = current.clone();
        if let Some(title) = &self.title {
            next.title = title.clone();
        }
        if let Some(category) = &self.category {
            next.category = category.clone();
        }
        if let Some(importance) = &self.importance {
            next.importance = importance.clone();
        }
        if let Some(kind) = self.kind {
            next.kind = kind;
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        if let Some(value) = self.planned_start_at {
            next.planned_start_at = value;
        }
        if let Some(value) = self.planned_end_at {
            next.planned_end_at = value;
        }
        if let Some(value) = self.actual_start_at {
            next.actual_start_at = value;
        }
        if let Some(value) = self.actual_end_at {
            next.actual_end_at = value;
        }
        if let Some(value) = self.completed_at {
            next.completed_at = value;
        }
        if let Some(note) = &self.note {
            next.note = note.clone();
        }
        if let Some(flag) = self.is_recurring_template {
            next.is_recurring_template = flag;
        }
        if let Some(recurrence) = &self.recurrence {
            next.recurrence = recurrence.clone();
        }
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub id: i64,
    /// Rows removed, including cascaded instances
    pub removed: usize,
}

/// Configuration for materialization behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterializationConfig {
    /// Length of the rolling window, in days from the start of today
    pub horizon_days: i64,
}

impl Default for MaterializationConfig {
    fn default() -> Self {
        Self { horizon_days: 30 }
    }
}
