use crate::core::records::{RecordFilter, RecordView};
use crate::core::Category;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "hsse-etl")]
#[command(about = "HSSE records: workbook import, dashboard, records, users and assistant")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    /// TOML config file
    #[arg(long, global = true, default_value = "hsse-etl.toml")]
    pub config: PathBuf,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log CPU and memory usage during imports")]
    pub monitor: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub log_json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import every recognised sheet of a workbook (.xlsx, .xls, .xlsb, .ods, .csv)
    Import {
        file: PathBuf,

        /// Import every sheet as this category instead of detecting it
        /// (incidents, inspections, risk_assessments, training)
        #[arg(long = "as", value_name = "CATEGORY")]
        category: Option<Category>,

        /// Classify and normalize without inserting anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show aggregate counts for incidents, near misses, audits and training
    Dashboard {
        #[arg(long)]
        json: bool,
    },

    /// List records of one view
    Records {
        /// incidents, near_miss, audits, inspections, risk_assessments or training_records
        view: RecordView,

        #[command(flatten)]
        filter: FilterArgs,

        #[arg(long)]
        json: bool,
    },

    /// Set the status of one record
    SetStatus {
        view: RecordView,
        id: String,
        status: String,
    },

    /// Delete records by id (admin only)
    Delete {
        view: RecordView,
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },

    /// Manage user profiles (admin only)
    Users {
        #[command(subcommand)]
        action: UserCommand,
    },

    /// Ask the HSSE assistant a question
    Ask {
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
        /// Send the message alone, skipping local lookups and history
        #[arg(long)]
        once: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    List,
    ToggleRole { user_id: String },
    ToggleActive { user_id: String },
    Delete { user_id: String },
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Free-text search over every field
    #[arg(long)]
    pub search: Option<String>,

    #[arg(long)]
    pub status: Option<String>,

    /// Location name or location id
    #[arg(long)]
    pub location: Option<String>,

    #[arg(long)]
    pub severity: Option<String>,

    /// Earliest record date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Latest record date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

impl From<FilterArgs> for RecordFilter {
    fn from(args: FilterArgs) -> Self {
        RecordFilter {
            search: args.search,
            status: args.status,
            location: args.location,
            severity: args.severity,
            date_from: args.from,
            date_to: args.to,
        }
    }
}
