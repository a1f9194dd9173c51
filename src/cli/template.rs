//! Recurring template subcommands.

use clap::{Args, Subcommand};

/// Arguments for the template subcommand
#[derive(Args, Debug)]
pub struct TemplateArgs {
    #[command(subcommand)]
    pub command: TemplateCommand,
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    /// Create a recurring template
    Add {
        content: String,

        /// daily or weekly
        #[arg(long, default_value = "daily")]
        frequency: String,

        /// Comma-separated ISO weekdays for weekly templates (1 = Monday .. 7 = Sunday)
        #[arg(long, value_delimiter = ',')]
        weekdays: Vec<u8>,

        /// Create the template paused
        #[arg(long)]
        inactive: bool,
    },

    /// List templates, newest first
    List,

    /// Pause or resume a template
    Toggle { template_id: String },

    /// Delete a template
    Delete { template_id: String },
}
