use anyhow::Result;
use cadence_core::models::NewTaskData;
use cadence_core::repository::TaskRepository;
use chrono::Duration;
use owo_colors::{OwoColorize, Style};

use crate::cli::AddCommand;
use crate::commands::recurrence::build_rule;
use crate::parser::{parse_datetime, parse_optional_datetime};

pub async fn add_task(repo: &impl TaskRepository, command: AddCommand) -> Result<()> {
    let planned_start_at = parse_optional_datetime(command.start.as_deref())?;
    let planned_end_at = match (command.duration, planned_start_at) {
        (Some(minutes), Some(start)) => Some(start + Duration::minutes(minutes)),
        _ => command.end.as_deref().map(parse_datetime).transpose()?,
    };
    let recurrence = build_rule(&command.recurrence, None)?;

    let data = NewTaskData {
        title: command.title,
        category: command.category,
        importance: command.importance,
        kind: command.kind,
        planned_start_at,
        planned_end_at,
        note: command.note,
        is_recurring_template: recurrence.is_some(),
        recurrence,
        ..Default::default()
    };

    let task = repo.add_task(data).await?;

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();
    let subtle_style = Style::new().bright_black();

    if task.is_recurring_template {
        println!(
            "{} Created recurring template: {}",
            "✓".style(success_style),
            task.title.bright_white().bold()
        );
        println!("  {} Task ID: {}", "→".style(info_style), task.id.to_string().yellow());
        if let Some(rule) = &task.recurrence {
            println!("  {} Repeats {}", "→".style(info_style), rule.freq);
        }
        println!(
            "  {} Use 'cadence preview {}' to see upcoming occurrences",
            "💡".style(subtle_style),
            task.id
        );
    } else {
        println!(
            "{} Created task: {}",
            "✓".style(success_style),
            task.title.bright_white().bold()
        );
        println!("  {} Task ID: {}", "→".style(info_style), task.id.to_string().yellow());
        if let Some(start) = task.planned_start_at {
            println!(
                "  {} Starts: {}",
                "→".style(info_style),
                start.format("%Y-%m-%d %H:%M").to_string().cyan()
            );
        }
    }

    Ok(())
}
