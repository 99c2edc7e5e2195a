use anyhow::{anyhow, bail, Result};
use cadence_core::error::CoreError;
use cadence_core::models::{RecurrenceRule, UpdateTaskData};
use cadence_core::repository::TaskRepository;
use chrono::NaiveDateTime;
use owo_colors::OwoColorize;

use crate::cli::EditCommand;
use crate::commands::recurrence::build_rule;
use crate::parser::parse_datetime;

pub async fn edit_task(repo: &impl TaskRepository, command: EditCommand) -> Result<()> {
    let mut update = UpdateTaskData {
        title: command.title.clone(),
        category: command.category.clone(),
        importance: command.importance.clone(),
        kind: command.kind,
        status: command.status,
        planned_start_at: timestamp_patch(command.start.as_deref(), command.start_clear)?,
        planned_end_at: timestamp_patch(command.end.as_deref(), command.end_clear)?,
        actual_start_at: timestamp_patch(command.actual_start.as_deref(), command.actual_start_clear)?,
        actual_end_at: timestamp_patch(command.actual_end.as_deref(), command.actual_end_clear)?,
        completed_at: timestamp_patch(command.completed_at.as_deref(), command.completed_at_clear)?,
        note: if command.note_clear {
            Some(None)
        } else {
            command.note.clone().map(Some)
        },
        ..Default::default()
    };

    if command.recurrence_clear {
        update.recurrence = Some(None);
        update.is_recurring_template = Some(false);
    } else if !command.recurrence.is_empty() || command.until_clear {
        let current = repo
            .find_task_by_id(command.id)
            .await?
            .ok_or_else(|| anyhow!(CoreError::NotFound(command.id)))?;
        let rule = merged_rule(&command, current.recurrence.as_ref())?;
        if !current.is_recurring_template {
            update.is_recurring_template = Some(true);
        }
        update.recurrence = Some(Some(rule));
    }

    if update.is_empty() {
        println!("{}", "Nothing to change.".yellow());
        return Ok(());
    }

    let task = repo.update_task(command.id, update).await?;
    println!("Updated task: '{}'", task.title);
    if task.is_recurring_template {
        println!("  {}", "Upcoming instances were regenerated; finished ones were kept.".bright_black());
    }
    Ok(())
}

fn merged_rule(command: &EditCommand, base: Option<&RecurrenceRule>) -> Result<RecurrenceRule> {
    let mut rule = match build_rule(&command.recurrence, base)? {
        Some(rule) => rule,
        None => match base {
            Some(base) => base.clone(),
            None => bail!("Task {} has no recurrence to change", command.id),
        },
    };
    if command.until_clear {
        rule.until = None;
    }
    Ok(rule)
}

fn timestamp_patch(value: Option<&str>, clear: bool) -> Result<Option<Option<NaiveDateTime>>> {
    if clear {
        return Ok(Some(None));
    }
    Ok(value.map(parse_datetime).transpose()?.map(Some))
}
