//! CLI command definitions for timeboard
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod entry;
pub mod template;

use clap::{Parser, Subcommand};
use entry::EntryArgs;
use template::TemplateArgs;

/// Owner used when neither `--owner` nor `$USER` is set.
pub const DEFAULT_OWNER: &str = "default";

/// Personal task board with time tracking and recurring tasks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Owner to act as (default: $USER)
    #[arg(short, long, global = true)]
    pub owner: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Output format: json or markdown
    #[arg(short, long, default_value = "markdown", global = true)]
    pub format: String,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// The acting owner: `--owner`, else `$USER`, else `default`.
    pub fn owner_id(&self) -> String {
        self.owner
            .clone()
            .or_else(|| std::env::var("USER").ok().filter(|u| !u.is_empty()))
            .unwrap_or_else(|| DEFAULT_OWNER.to_string())
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a task
    Add {
        content: String,

        /// Calendar date (YYYY-MM-DD); defaults to today
        #[arg(long, conflicts_with = "backlog")]
        date: Option<String>,

        /// Put the task in the backlog instead of on a date
        #[arg(long)]
        backlog: bool,

        /// Priority 1 (lowest) to 5 (highest)
        #[arg(short, long)]
        priority: Option<i32>,

        /// Initial status: backlog, todo, in_progress or done
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show one task with its tracked time
    Show { task_id: String },

    /// Change a task's status
    Status { task_id: String, status: String },

    /// Mark a task done (or reopen it with --undo)
    Complete {
        task_id: String,

        #[arg(long)]
        undo: bool,
    },

    /// Delete a task, stopping its timer first
    Delete { task_id: String },

    /// Start the timer on a task, stopping any other running timer
    Start { task_id: String },

    /// Stop the timer on a task
    Stop { task_id: String },

    /// Stop every running timer
    StopAll,

    /// Time entries for a date (default: today)
    Log {
        #[arg(long)]
        date: Option<String>,
    },

    /// Put a task on a weekday (1 = Monday .. 5 = Friday) of a week
    Assign {
        task_id: String,
        week_key: String,
        weekday: i64,
    },

    /// Move a task to the backlog
    Backlog { task_id: String },

    /// Set intra-day order of placements, as placement-id=order pairs
    Reorder {
        week_key: String,
        weekday: i64,

        #[arg(required = true, value_parser = parse_order_pair)]
        orders: Vec<(String, i64)>,
    },

    /// Show the weekly board (default: current week)
    Board { week_key: Option<String> },

    /// Move incomplete tasks of a week to the same weekday of the next week
    CarryOverWeek { week_key: String },

    /// Move selected tasks to a date
    CarryOver {
        date: String,

        #[arg(required = true)]
        task_ids: Vec<String>,
    },

    /// Incomplete tasks dated before a date (default: today)
    Pending {
        #[arg(long)]
        date: Option<String>,
    },

    /// Create today's tasks from recurring templates
    GenerateRecurring {
        #[arg(long)]
        date: Option<String>,
    },

    /// Log, edit or delete time entries by hand
    Entry(EntryArgs),

    /// Manage recurring templates
    Template(TemplateArgs),
}

/// Parse `placement-id=order`.
pub fn parse_order_pair(value: &str) -> Result<(String, i64), String> {
    let (id, order) = value
        .rsplit_once('=')
        .ok_or_else(|| format!("expected placement-id=order, got '{}'", value))?;
    if id.is_empty() {
        return Err(format!("missing placement id in '{}'", value));
    }
    let order = order
        .parse::<i64>()
        .map_err(|e| format!("invalid order in '{}': {}", value, e))?;
    Ok((id.to_string(), order))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_pairs_parse() {
        assert_eq!(
            parse_order_pair("0190-abc=3").unwrap(),
            ("0190-abc".to_string(), 3)
        );
        assert!(parse_order_pair("0190-abc").is_err());
        assert!(parse_order_pair("=3").is_err());
        assert!(parse_order_pair("abc=x").is_err());
    }

    #[test]
    fn reorder_command_collects_pairs() {
        let cli = Cli::try_parse_from([
            "timeboard", "reorder", "2026-W05", "2", "a=1", "b=0",
        ])
        .unwrap();
        match cli.command {
            Command::Reorder {
                week_key,
                weekday,
                orders,
            } => {
                assert_eq!(week_key, "2026-W05");
                assert_eq!(weekday, 2);
                assert_eq!(orders, vec![("a".to_string(), 1), ("b".to_string(), 0)]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn date_and_backlog_conflict() {
        let result = Cli::try_parse_from([
            "timeboard", "add", "x", "--date", "2026-01-26", "--backlog",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn entry_edit_cannot_end_and_reopen() {
        let cli = Cli::try_parse_from([
            "timeboard", "entry", "edit", "e1", "--end", "10:00",
        ])
        .unwrap();
        match cli.command {
            Command::Entry(args) => match args.command {
                entry::EntryCommand::Edit { entry_id, end, reopen, .. } => {
                    assert_eq!(entry_id, "e1");
                    assert_eq!(end.as_deref(), Some("10:00"));
                    assert!(!reopen);
                }
                other => panic!("unexpected entry command {:?}", other),
            },
            other => panic!("unexpected command {:?}", other),
        }

        let result = Cli::try_parse_from([
            "timeboard", "entry", "edit", "e1", "--end", "10:00", "--reopen",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn explicit_owner_wins() {
        let cli = Cli::try_parse_from(["timeboard", "--owner", "alice", "stop-all"]).unwrap();
        assert_eq!(cli.owner_id(), "alice");
    }
}
