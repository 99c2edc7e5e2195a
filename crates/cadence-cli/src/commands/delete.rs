use anyhow::{anyhow, Result};
use cadence_core::error::CoreError;
use cadence_core::repository::TaskRepository;
use dialoguer::Confirm;

use crate::cli::DeleteCommand;

pub async fn delete_task(repo: &impl TaskRepository, command: DeleteCommand) -> Result<()> {
    let task = repo
        .find_task_by_id(command.id)
        .await?
        .ok_or_else(|| anyhow!(CoreError::NotFound(command.id)))?;

    if !command.force {
        let prompt = if task.is_recurring_template {
            format!(
                "Delete template '{}' and all of its instances?",
                task.title
            )
        } else {
            format!("Are you sure you want to delete task '{}'?", task.title)
        };
        let confirmation = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirmation {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    let outcome = repo.delete_task(command.id).await?;
    if outcome.removed > 1 {
        println!(
            "Deleted task '{}' and {} instances",
            task.title,
            outcome.removed - 1
        );
    } else {
        println!("Deleted task: '{}'", task.title);
    }
    Ok(())
}
