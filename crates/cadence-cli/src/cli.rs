use cadence_core::models::{Frequency, TaskKind, TaskStatus};
use chrono::Weekday;
use clap::{Parser, Subcommand, ValueEnum};

/// Cadence: a planner with recurring task templates
#[derive(Parser, Debug)]
#[command(name = "cadence", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add a task, or a recurring template with --every
    Add(AddCommand),
    /// List tasks ordered by planned start
    List(ListCommand),
    /// List the tasks that overlap one day
    Day(DayCommand),
    /// Edit a task
    Edit(EditCommand),
    /// Start working on a task
    Start(StartCommand),
    /// Mark a task as done
    Do(DoCommand),
    /// Skip a task
    Skip(SkipCommand),
    /// Delete a task; deleting a template deletes its instances
    Delete(DeleteCommand),
    /// Show the next occurrences of a recurring template
    Preview(PreviewCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// The title of the task
    pub title: String,
    #[clap(short, long)]
    pub category: Option<String>,
    /// Free text, conventionally low, medium or high
    #[clap(short, long)]
    pub importance: Option<String>,
    /// task or sleep
    #[clap(long)]
    pub kind: Option<TaskKind>,
    /// Planned start (e.g., '2026-02-01T08:00', 'tomorrow 9am')
    #[clap(short, long)]
    pub start: Option<String>,
    /// Planned end
    #[clap(short, long, conflicts_with = "duration")]
    pub end: Option<String>,
    /// Planned length in minutes, counted from --start
    #[clap(short, long, requires = "start")]
    pub duration: Option<i64>,
    #[clap(short, long)]
    pub note: Option<String>,
    #[clap(flatten)]
    pub recurrence: RecurrenceArgs,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct RecurrenceArgs {
    /// Repeat the task; makes it a recurring template
    #[clap(long, value_enum)]
    pub every: Option<RecurrenceShortcut>,
    /// Step between occurrences, in units of --every
    #[clap(long)]
    pub interval: Option<i64>,
    /// Days of week for weekly recurrence (mon,tue,wed,thu,fri,sat,sun)
    #[clap(long, value_delimiter = ',')]
    pub on: Vec<Weekday>,
    /// Last moment an occurrence may start (e.g., '2026-12-31')
    #[clap(long)]
    pub until: Option<String>,
}

impl RecurrenceArgs {
    pub fn is_empty(&self) -> bool {
        self.every.is_none() && self.interval.is_none() && self.on.is_empty() && self.until.is_none()
    }
}

/// Human-friendly recurrence patterns
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceShortcut {
    /// Every day
    Daily,
    /// Every week (same weekday unless --on is given)
    Weekly,
    /// Every month (same day of month, clamped to short months)
    Monthly,
    /// Every year (same date)
    Yearly,
    /// Monday to Friday
    Weekdays,
    /// Saturday and Sunday
    Weekends,
}

impl RecurrenceShortcut {
    pub fn frequency(&self) -> Frequency {
        match self {
            RecurrenceShortcut::Daily => Frequency::Daily,
            RecurrenceShortcut::Weekly | RecurrenceShortcut::Weekdays | RecurrenceShortcut::Weekends => {
                Frequency::Weekly
            }
            RecurrenceShortcut::Monthly => Frequency::Monthly,
            RecurrenceShortcut::Yearly => Frequency::Yearly,
        }
    }

    /// Weekdays implied by the shortcut itself
    pub fn weekdays(&self) -> Option<Vec<Weekday>> {
        match self {
            RecurrenceShortcut::Weekdays => Some(vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ]),
            RecurrenceShortcut::Weekends => Some(vec![Weekday::Sat, Weekday::Sun]),
            _ => None,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// Include recurring templates
    #[clap(short, long)]
    pub templates: bool,
    /// Print JSON instead of a table
    #[clap(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct DayCommand {
    /// The day to show (defaults to today)
    pub date: Option<String>,
    /// Include recurring templates
    #[clap(short, long)]
    pub templates: bool,
    /// Print JSON instead of a table
    #[clap(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct EditCommand {
    /// The ID of the task to edit
    pub id: i64,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub importance: Option<String>,

    #[arg(long)]
    pub kind: Option<TaskKind>,

    #[arg(long)]
    pub status: Option<TaskStatus>,

    #[arg(long)]
    pub start: Option<String>,
    #[arg(long, conflicts_with = "start")]
    pub start_clear: bool,

    #[arg(long)]
    pub end: Option<String>,
    #[arg(long, conflicts_with = "end")]
    pub end_clear: bool,

    #[arg(long)]
    pub actual_start: Option<String>,
    #[arg(long, conflicts_with = "actual_start")]
    pub actual_start_clear: bool,

    #[arg(long)]
    pub actual_end: Option<String>,
    #[arg(long, conflicts_with = "actual_end")]
    pub actual_end_clear: bool,

    #[arg(long)]
    pub completed_at: Option<String>,
    #[arg(long, conflicts_with = "completed_at")]
    pub completed_at_clear: bool,

    #[arg(long)]
    pub note: Option<String>,
    #[arg(long, conflicts_with = "note")]
    pub note_clear: bool,

    #[clap(flatten)]
    pub recurrence: RecurrenceArgs,
    /// Remove the recurrence (turns a template into a one-time task)
    #[arg(long, conflicts_with_all = ["every", "interval", "on", "until"])]
    pub recurrence_clear: bool,
    /// Remove the recurrence end date
    #[arg(long, conflicts_with = "until")]
    pub until_clear: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct StartCommand {
    /// The ID of the task to start
    pub id: i64,
    /// When work started (defaults to now)
    #[clap(long)]
    pub at: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct DoCommand {
    /// The ID of the task to mark as done
    pub id: i64,
    /// When the task was finished (defaults to now)
    #[clap(long)]
    pub at: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct SkipCommand {
    /// The ID of the task to skip
    pub id: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    /// The ID of the task to delete
    pub id: i64,
    /// Force deletion without confirmation
    #[clap(short, long)]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct PreviewCommand {
    /// The ID of the recurring template
    pub id: i64,
    /// Number of occurrences to show
    #[clap(long, short, default_value = "5")]
    pub count: usize,
}
