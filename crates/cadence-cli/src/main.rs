use clap::Parser;
use cadence_core::error::CoreError;
use cadence_core::recurrence::MaterializationManager;
use cadence_core::repository::{Repository, TaskRepository};
use cadence_core::store::{JsonFileStore, SqliteStore};
use owo_colors::{OwoColorize, Style};

mod cli;
mod commands;
mod config;
mod logging;
mod parser;
mod views;

use config::{Backend, Config};

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let config = match Config::new() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} Invalid configuration: {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    logging::init_logging(&config.log_level);

    let manager = MaterializationManager::new(config.recurrence.clone());
    let data_path = config.data_path();
    tracing::debug!(backend = ?config.backend, path = %data_path.display(), "Opening task store");

    let result = match config.backend {
        Backend::Json => {
            let repository = Repository::new(JsonFileStore::new(data_path), manager);
            run(&repository, cli.command, &config).await
        }
        Backend::Sqlite => match SqliteStore::open(&data_path, config.legacy_import.as_deref()).await {
            Ok(store) => {
                let repository = Repository::new(store, manager);
                run(&repository, cli.command, &config).await
            }
            Err(e) => Err(e.into()),
        },
    };

    if let Err(e) = result {
        handle_error(e);
        std::process::exit(1);
    }
}

async fn run(repo: &impl TaskRepository, command: cli::Commands, config: &Config) -> anyhow::Result<()> {
    match command {
        cli::Commands::Add(command) => commands::add::add_task(repo, command).await,
        cli::Commands::List(command) => commands::list::list_tasks(repo, command, config).await,
        cli::Commands::Day(command) => commands::list::list_day(repo, command, config).await,
        cli::Commands::Edit(command) => commands::edit::edit_task(repo, command).await,
        cli::Commands::Start(command) => commands::r#do::start_task(repo, command).await,
        cli::Commands::Do(command) => commands::r#do::do_task(repo, command).await,
        cli::Commands::Skip(command) => commands::r#do::skip_task(repo, command).await,
        cli::Commands::Delete(command) => commands::delete::delete_task(repo, command).await,
        cli::Commands::Preview(command) => commands::recurrence::preview(repo, command).await,
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();
    let core_error = err.chain().find_map(|cause| cause.downcast_ref::<CoreError>());

    match core_error {
        Some(CoreError::NotFound(id)) => {
            eprintln!("{} Task with ID '{}' not found.", "Error:".style(error_style), id);
        }
        Some(CoreError::InvalidTransition { from, to }) => {
            eprintln!(
                "{} Cannot move a task from {} to {}",
                "Error:".style(error_style),
                from.yellow(),
                to.yellow()
            );
        }
        Some(e @ CoreError::InvalidRange { .. }) => {
            eprintln!("{} Invalid input: {}", "Error:".style(error_style), e);
        }
        Some(CoreError::InvalidInput(s)) | Some(CoreError::MissingField(s)) => {
            eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
        }
        Some(e @ (CoreError::Database(_) | CoreError::Migration(_))) => {
            eprintln!("{} {}: {}", "Error:".style(error_style), e, err.root_cause());
        }
        Some(e) => eprintln!("{} {}", "Error:".style(error_style), e),
        None => eprintln!("{} {}", "Error:".style(error_style), err),
    }
}
