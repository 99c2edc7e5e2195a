use anyhow::Result;
use cadence_core::repository::TaskRepository;
use chrono::Utc;

use crate::cli::{DayCommand, ListCommand};
use crate::config::Config;
use crate::parser::parse_date;
use crate::views::table::{display_tasks, print_json};

pub async fn list_tasks(repo: &impl TaskRepository, command: ListCommand, config: &Config) -> Result<()> {
    let include_templates = command.templates || config.default_include_templates;
    let tasks = repo.list_tasks(include_templates).await?;

    if command.json {
        print_json(&tasks)
    } else {
        display_tasks(&tasks);
        Ok(())
    }
}

pub async fn list_day(repo: &impl TaskRepository, command: DayCommand, config: &Config) -> Result<()> {
    let day = match command.date.as_deref() {
        Some(input) => parse_date(input)?,
        None => Utc::now().date_naive(),
    };
    let include_templates = command.templates || config.default_include_templates;
    let tasks = repo.list_tasks_for_day(day, include_templates).await?;

    if command.json {
        print_json(&tasks)
    } else {
        println!("{}", day.format("%A, %Y-%m-%d"));
        display_tasks(&tasks);
        Ok(())
    }
}
