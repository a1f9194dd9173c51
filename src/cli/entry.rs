//! Manual time entry subcommands.

use clap::{Args, Subcommand};

/// Arguments for the entry subcommand
#[derive(Args, Debug)]
pub struct EntryArgs {
    #[command(subcommand)]
    pub command: EntryCommand,
}

#[derive(Subcommand, Debug)]
pub enum EntryCommand {
    /// Log time by hand; without --end the entry starts running
    Add {
        /// Start time (HH:MM)
        start: String,

        /// End time (HH:MM), after the start
        #[arg(long)]
        end: Option<String>,

        /// Log date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<String>,

        /// Task the time was spent on
        #[arg(long)]
        task: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Edit an entry; an empty --description or --category clears it
    Edit {
        entry_id: String,

        /// New start time (HH:MM)
        #[arg(long)]
        start: Option<String>,

        /// New end time (HH:MM)
        #[arg(long, conflicts_with = "reopen")]
        end: Option<String>,

        /// Clear the end time so the entry runs again
        #[arg(long)]
        reopen: bool,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Delete an entry
    Delete { entry_id: String },
}
