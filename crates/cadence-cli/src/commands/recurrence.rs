use anyhow::{bail, Result};
use cadence_core::models::RecurrenceRule;
use cadence_core::repository::TaskRepository;
use owo_colors::{OwoColorize, Style};

use crate::cli::{PreviewCommand, RecurrenceArgs};
use crate::parser::parse_datetime;

/// Builds a rule from the recurrence flags, layered over `base` when editing.
/// Returns `None` when no flag was given.
pub fn build_rule(args: &RecurrenceArgs, base: Option<&RecurrenceRule>) -> Result<Option<RecurrenceRule>> {
    if args.is_empty() {
        return Ok(None);
    }

    let mut rule = match (args.every, base) {
        (Some(shortcut), _) => {
            let mut rule = RecurrenceRule::new(shortcut.frequency());
            rule.weekdays = shortcut.weekdays();
            if let Some(base) = base.filter(|base| base.freq == rule.freq) {
                rule.interval = base.interval;
                rule.until = base.until;
                if rule.weekdays.is_none() {
                    rule.weekdays = base.weekdays.clone();
                }
            } else if let Some(base) = base {
                rule.until = base.until;
            }
            rule
        }
        (None, Some(base)) => base.clone(),
        (None, None) => bail!("--interval, --on and --until need --every to pick a frequency"),
    };

    if let Some(interval) = args.interval {
        if interval < 1 {
            bail!("--interval must be at least 1");
        }
        rule.interval = interval;
    }
    if !args.on.is_empty() {
        rule.weekdays = Some(args.on.clone());
    }
    if let Some(until) = &args.until {
        rule.until = Some(parse_datetime(until)?);
    }
    Ok(Some(rule))
}

pub async fn preview(repo: &impl TaskRepository, command: PreviewCommand) -> Result<()> {
    let occurrences = repo.preview_occurrences(command.id, command.count).await?;
    let header_style = Style::new().cyan().bold();

    if occurrences.is_empty() {
        println!("No upcoming occurrences for task {}.", command.id);
        return Ok(());
    }

    println!(
        "{} Next {} occurrences of task {}:",
        "↻".style(header_style),
        occurrences.len(),
        command.id.to_string().yellow()
    );
    for (i, at) in occurrences.iter().enumerate() {
        println!("  {}. {}", i + 1, at.format("%a %Y-%m-%d %H:%M"));
    }
    Ok(())
}
