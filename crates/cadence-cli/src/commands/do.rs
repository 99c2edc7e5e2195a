use anyhow::Result;
use cadence_core::repository::TaskRepository;
use owo_colors::OwoColorize;

use crate::cli::{DoCommand, SkipCommand, StartCommand};
use crate::parser::parse_optional_datetime;

pub async fn do_task(repo: &impl TaskRepository, command: DoCommand) -> Result<()> {
    let done_at = parse_optional_datetime(command.at.as_deref())?;
    let task = repo.complete_task(command.id, done_at).await?;

    print!("{} Completed task: '{}'", "✓".green().bold(), task.title);
    match task.completed_at {
        Some(at) => println!(" at {}", at.format("%Y-%m-%d %H:%M")),
        None => println!(),
    }
    Ok(())
}

pub async fn start_task(repo: &impl TaskRepository, command: StartCommand) -> Result<()> {
    let at = parse_optional_datetime(command.at.as_deref())?;
    let task = repo.start_task(command.id, at).await?;
    println!("{} Started task: '{}'", "▶".cyan().bold(), task.title);
    Ok(())
}

pub async fn skip_task(repo: &impl TaskRepository, command: SkipCommand) -> Result<()> {
    let task = repo.skip_task(command.id).await?;
    println!("Skipped task: '{}'", task.title);
    Ok(())
}
