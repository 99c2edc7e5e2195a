//! # Cadence Core Library
//!
//! Task storage and recurring-task materialization for a personal planner.
//!
//! A recurring *template* carries a [`models::RecurrenceRule`]. Whenever the
//! collection is read or written, each template is expanded into concrete
//! *instances* inside a rolling window (start of today plus
//! `horizon_days`). Reconciliation never duplicates an occurrence and never
//! discards completed history.
//!
//! ## Core Modules
//!
//! - [`time`]: Timestamp normalization to naive UTC and the injectable clock
//! - [`models`]: Tasks, recurrence rules and the create/update transfer objects
//! - [`legacy`]: Coercion of old or sparse stored rows
//! - [`recurrence`]: Occurrence generation and the materialization window
//! - [`repository`]: The task operation surface and the template reconciler
//! - [`store`]: JSON file and SQLite persistence
//! - [`db`]: SQLite connection and migration management
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cadence_core::{
//!     models::{Frequency, NewTaskData, RecurrenceRule},
//!     recurrence::MaterializationManager,
//!     repository::{Repository, TaskRepository},
//!     store::JsonFileStore,
//!     time::parse_timestamp,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = JsonFileStore::new("cadence.json");
//!     let repo = Repository::new(store, MaterializationManager::with_defaults());
//!
//!     let standup = repo
//!         .add_task(NewTaskData {
//!             title: "Daily standup".to_string(),
//!             planned_start_at: Some(parse_timestamp("2026-02-02T09:00:00")?),
//!             planned_end_at: Some(parse_timestamp("2026-02-02T09:15:00")?),
//!             is_recurring_template: true,
//!             recurrence: Some(RecurrenceRule::new(Frequency::Daily)),
//!             ..Default::default()
//!         })
//!         .await?;
//!     println!("Created template {}", standup.id);
//!
//!     for task in repo.list_tasks(false).await? {
//!         println!("{} {:?}", task.title, task.planned_start_at);
//!     }
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
pub mod legacy;
pub mod models;
pub mod recurrence;
pub mod repository;
pub mod store;
pub mod time;
