use anyhow::Result;
use cadence_core::models::{Task, TaskKind, TaskStatus};
use chrono::{NaiveDateTime, TimeZone, Utc};
use chrono_humanize::Humanize;
use comfy_table::{Attribute, Cell, Color, Row, Table};

pub fn display_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }

    let now = Utc::now().naive_utc();
    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Status", "Category", "Start", "End"]);

    for task in tasks {
        let mut row = Row::new();
        row.add_cell(Cell::new(task.id));

        let mut title = String::new();
        if task.template_id.is_some() {
            title.push_str("↻ ");
        }
        if task.kind == TaskKind::Sleep {
            title.push_str("☾ ");
        }
        title.push_str(&task.title);
        if task.is_recurring_template {
            title.push_str(" (Template)");
        }

        let mut title_cell = Cell::new(title);
        title_cell = match task.status {
            TaskStatus::Done | TaskStatus::Skipped => title_cell
                .add_attribute(Attribute::CrossedOut)
                .fg(Color::DarkGrey),
            TaskStatus::InProgress => title_cell.fg(Color::Cyan).add_attribute(Attribute::Bold),
            TaskStatus::Todo => match task.importance.as_str() {
                "high" => title_cell.fg(Color::Red).add_attribute(Attribute::Bold),
                "low" => title_cell.fg(Color::Green),
                _ => title_cell,
            },
        };
        row.add_cell(title_cell);

        let status_cell = Cell::new(task.status.as_str());
        row.add_cell(match task.status {
            TaskStatus::Done => status_cell.fg(Color::Green),
            TaskStatus::InProgress => status_cell.fg(Color::Cyan),
            TaskStatus::Skipped => status_cell.fg(Color::DarkGrey),
            TaskStatus::Todo => status_cell,
        });

        row.add_cell(Cell::new(&task.category));

        let start_cell = match task.effective_start() {
            Some(start) => {
                let cell = Cell::new(format!("{} ({})", start.format("%Y-%m-%d %H:%M"), humanize(start)));
                if task.status == TaskStatus::Todo && !task.is_recurring_template && start < now {
                    cell.fg(Color::Red)
                } else if start.date() == now.date() {
                    cell.fg(Color::Yellow)
                } else {
                    cell
                }
            }
            None => Cell::new("-"),
        };
        row.add_cell(start_cell);

        row.add_cell(match task.effective_end() {
            Some(end) => Cell::new(end.format("%H:%M")),
            None => Cell::new("-"),
        });

        table.add_row(row);
    }

    println!("{table}");
}

pub fn print_json(tasks: &[Task]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(tasks)?);
    Ok(())
}

fn humanize(at: NaiveDateTime) -> String {
    Utc.from_utc_datetime(&at).humanize()
}
