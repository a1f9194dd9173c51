//! timeboard command line.
//!
//! Thin collaborator over the planner: every subcommand maps to one planner
//! operation and prints the result as markdown or JSON.

use anyhow::{Result, anyhow};
use clap::Parser;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;
use timeboard::cli::entry::EntryCommand;
use timeboard::cli::template::TemplateCommand;
use timeboard::cli::{Cli, Command};
use timeboard::config::Config;
use timeboard::db::Database;
use timeboard::error::PlannerError;
use timeboard::format::{self, OutputFormat};
use timeboard::planner::Planner;
use timeboard::types::{EntryUpdate, Frequency, NewEntry, NewTask, TemplateInput};
use timeboard::week::{parse_date, parse_time};
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    let format = OutputFormat::from_str(&cli.format)
        .ok_or_else(|| anyhow!("Unknown format '{}', expected json or markdown", cli.format))?;

    let mut config = Config::resolve(cli.config.as_deref().map(Path::new))?;
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    config.ensure_db_dir()?;

    let zones = config.timezones()?;
    debug!(db = %config.server.db_path.display(), "Opening database");
    let db = Database::open(&config.server.db_path)?;
    let planner = Planner::with_system_clock(db, zones);

    let owner = cli.owner_id();
    run_command(&planner, &owner, format, cli.command)
}

/// Initialize logging based on the --log option.
fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose { "debug" } else { "info" };
    // RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

/// Print a value as JSON, or through its markdown renderer.
fn emit<T: Serialize>(format: OutputFormat, value: &T, markdown: impl FnOnce(&T) -> String) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Markdown => print!("{}", markdown(value)),
    }
    Ok(())
}

fn date_or_today(planner: &Planner, owner: &str, date: Option<&str>) -> Result<chrono::NaiveDate> {
    Ok(match date {
        Some(date) => parse_date(date)?,
        None => planner.today(owner),
    })
}

fn run_command(planner: &Planner, owner: &str, format: OutputFormat, command: Command) -> Result<()> {
    let tz = planner.timezones().for_owner(owner);

    match command {
        Command::Add {
            content,
            date,
            backlog,
            priority,
            status,
        } => {
            let date = if backlog {
                None
            } else {
                Some(date_or_today(planner, owner, date.as_deref())?)
            };
            let task = planner.create_task(
                owner,
                NewTask {
                    content,
                    date,
                    status,
                    priority,
                },
            )?;
            emit(format, &task, format::format_task_markdown)
        }
        Command::Show { task_id } => {
            let task = planner.get_task(owner, &task_id)?;
            let minutes = planner.total_time_spent(owner, &task_id)?;
            let started = planner.working_started_at(owner, &task_id)?;
            match format {
                OutputFormat::Json => emit(
                    format,
                    &serde_json::json!({
                        "task": task,
                        "total_minutes": minutes,
                        "working_since": started,
                    }),
                    |_| String::new(),
                ),
                OutputFormat::Markdown => {
                    print!("{}", format::format_task_markdown(&task));
                    println!("- **tracked**: {:02}:{:02}", minutes / 60, minutes % 60);
                    if let Some(started) = started {
                        println!("- **working since**: {}", started);
                    }
                    Ok(())
                }
            }
        }
        Command::Status { task_id, status } => {
            let task = planner.change_status(owner, &task_id, &status)?;
            emit(format, &task, format::format_task_markdown)
        }
        Command::Complete { task_id, undo } => {
            let task = planner.set_completion(owner, &task_id, !undo)?;
            emit(format, &task, format::format_task_markdown)
        }
        Command::Delete { task_id } => {
            planner.delete_task(owner, &task_id)?;
            emit(format, &serde_json::json!({ "deleted": task_id }), |_| {
                format!("Deleted {}\n", task_id)
            })
        }
        Command::Start { task_id } => {
            let entry = planner.start_timer(owner, &task_id)?;
            emit(format, &entry, |e| format::format_entry_markdown(e, tz))
        }
        Command::Stop { task_id } => {
            let entry = planner.stop_timer(owner, &task_id)?;
            emit(format, &entry, |e| match e {
                Some(e) => format::format_entry_markdown(e, tz),
                None => "No running timer\n".to_string(),
            })
        }
        Command::StopAll => {
            let stopped = planner.stop_all(owner)?;
            emit(format, &stopped, |ids| format!("Stopped {} timer(s)\n", ids.len()))
        }
        Command::Log { date } => {
            let date = date_or_today(planner, owner, date.as_deref())?;
            let entries = planner.entries_for_date(owner, date)?;
            emit(format, &entries, |e| format::format_entries_markdown(e, tz))
        }
        Command::Assign {
            task_id,
            week_key,
            weekday,
        } => {
            let task = planner.assign_to_day(owner, &task_id, &week_key, weekday)?;
            emit(format, &task, format::format_task_markdown)
        }
        Command::Backlog { task_id } => {
            let task = planner.move_to_backlog(owner, &task_id)?;
            emit(format, &task, format::format_task_markdown)
        }
        Command::Reorder {
            week_key,
            weekday,
            orders,
        } => {
            planner.reorder_slot(owner, &week_key, weekday, &orders)?;
            let placements = planner.slot_placements(owner, &week_key, weekday)?;
            emit(format, &placements, |p| format!("Reordered {} placement(s)\n", p.len()))
        }
        Command::Board { week_key } => {
            let week_key = week_key.unwrap_or_else(|| planner.current_week_key(owner));
            let board = planner.get_week_board(owner, &week_key)?;
            emit(format, &board, format::format_board_markdown)
        }
        Command::CarryOverWeek { week_key } => {
            let result = planner.carry_over_week(owner, &week_key)?;
            emit(format, &result, |r| {
                format!("Moved {} task(s) to {}\n", r.moved_count, r.next_week_key)
            })
        }
        Command::CarryOver { date, task_ids } => {
            let date = parse_date(&date)?;
            let result = planner.carry_over_selected(owner, &task_ids, date)?;
            emit(format, &result, |r| {
                format::format_tasks_markdown(&format!("Moved to {}", date), &r.tasks)
            })
        }
        Command::Pending { date } => {
            let date = date_or_today(planner, owner, date.as_deref())?;
            let tasks = planner.pending_from_previous_dates(owner, date)?;
            emit(format, &tasks, |t| {
                format::format_tasks_markdown(&format!("Pending before {}", date), t)
            })
        }
        Command::GenerateRecurring { date } => {
            let date = date_or_today(planner, owner, date.as_deref())?;
            let summary = planner.generate_for_date(owner, date)?;
            emit(format, &summary, format::format_generation_markdown)
        }
        Command::Entry(args) => run_entry(planner, owner, format, args.command),
        Command::Template(args) => run_template(planner, owner, format, args.command),
    }
}

fn run_entry(planner: &Planner, owner: &str, format: OutputFormat, command: EntryCommand) -> Result<()> {
    let tz = planner.timezones().for_owner(owner);

    match command {
        EntryCommand::Add {
            start,
            end,
            date,
            task,
            description,
            category,
        } => {
            let input = NewEntry {
                start: parse_time("start", &start)?,
                end: end.as_deref().map(|end| parse_time("end", end)).transpose()?,
                log_date: date.as_deref().map(parse_date).transpose()?,
                task_id: task,
                description,
                category_id: category,
            };
            let entry = planner.create_entry(owner, input)?;
            emit(format, &entry, |e| format::format_entry_markdown(e, tz))
        }
        EntryCommand::Edit {
            entry_id,
            start,
            end,
            reopen,
            description,
            category,
        } => {
            let end = if reopen {
                Some(None)
            } else {
                end.as_deref()
                    .map(|end| parse_time("end", end))
                    .transpose()?
                    .map(Some)
            };
            let update = EntryUpdate {
                start: start.as_deref().map(|start| parse_time("start", start)).transpose()?,
                end,
                description,
                category_id: category,
            };
            let entry = planner.update_entry(owner, &entry_id, update)?;
            emit(format, &entry, |e| format::format_entry_markdown(e, tz))
        }
        EntryCommand::Delete { entry_id } => {
            planner.delete_entry(owner, &entry_id)?;
            emit(format, &serde_json::json!({ "deleted": entry_id }), |_| {
                format!("Deleted entry {}\n", entry_id)
            })
        }
    }
}

fn run_template(
    planner: &Planner,
    owner: &str,
    format: OutputFormat,
    command: TemplateCommand,
) -> Result<()> {
    match command {
        TemplateCommand::Add {
            content,
            frequency,
            weekdays,
            inactive,
        } => {
            let frequency = Frequency::parse(&frequency).ok_or_else(|| {
                PlannerError::invalid_value(
                    "frequency",
                    format!("Unknown frequency '{}', expected daily or weekly", frequency),
                )
            })?;
            let template = planner.create_template(
                owner,
                TemplateInput {
                    content,
                    frequency,
                    weekdays,
                    active: !inactive,
                },
            )?;
            emit(format, &template, |t| {
                format::format_templates_markdown(std::slice::from_ref(t))
            })
        }
        TemplateCommand::List => {
            let templates = planner.list_templates(owner)?;
            emit(format, &templates, |t| format::format_templates_markdown(t))
        }
        TemplateCommand::Toggle { template_id } => {
            let template = planner.toggle_template(owner, &template_id)?;
            emit(format, &template, |t| {
                format::format_templates_markdown(std::slice::from_ref(t))
            })
        }
        TemplateCommand::Delete { template_id } => {
            planner.delete_template(owner, &template_id)?;
            emit(format, &serde_json::json!({ "deleted": template_id }), |_| {
                format!("Deleted template {}\n", template_id)
            })
        }
    }
}
