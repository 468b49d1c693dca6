use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tasksync_core::Resolution;

#[derive(Parser)]
#[command(name = "tasksync")]
#[command(about = "Edit Linear tasks with local drafts and conflict checks")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local draft store
    #[arg(long, global = true, value_name = "PATH")]
    pub store_path: Option<PathBuf>,

    /// CLI profile name
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show, edit and move tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// List, inspect or discard local drafts
    Draft {
        #[command(subcommand)]
        command: DraftCommands,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Manage the Linear API key for a profile
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Print a task as the server has it
    Show {
        /// Task UUID or key like ENG-123
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit fields and save them with a conflict check
    Edit {
        /// Task UUID or key like ENG-123
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description (markdown)
        #[arg(long)]
        description: Option<String>,
        /// New due date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_due_date, conflicts_with = "clear_due")]
        due: Option<NaiveDate>,
        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
        /// What to do when the task changed on the server meanwhile
        #[arg(long, value_enum, default_value_t = ConflictChoice::Cancel)]
        on_conflict: ConflictChoice,
    },
    /// Move a task to another workflow state of its team
    Move {
        /// Task UUID or key like ENG-123
        id: String,
        /// Target state name, e.g. "In Progress"
        state: String,
    },
}

#[derive(Subcommand)]
pub enum DraftCommands {
    /// List tasks with unsynced local drafts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the local draft of a task
    Show {
        /// Task UUID or key like ENG-123
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Discard the local draft of a task
    Clear {
        /// Task UUID or key like ENG-123
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the resolved profile configuration
    Show,
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// GraphQL endpoint
        #[arg(long, value_name = "URL")]
        api_url: Option<String>,
        /// Local draft store location
        #[arg(long, value_name = "PATH")]
        store_path: Option<PathBuf>,
        /// Edit inactivity before a draft is written
        #[arg(long, value_name = "MS")]
        draft_debounce_ms: Option<u64>,
        /// Upper bound for each remote call
        #[arg(long, value_name = "SECS")]
        request_timeout_secs: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Store a Linear personal API key in the keychain
    Login {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Linear personal API key
        #[arg(long, value_name = "KEY")]
        api_key: String,
    },
    /// Show where the API key for a profile comes from
    Status {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
    /// Remove the stored API key
    Logout {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ConflictChoice {
    /// Overwrite the server with local changes
    Mine,
    /// Drop local changes and take the server version
    Theirs,
    /// Leave the conflict unresolved and keep the draft
    Cancel,
}

impl From<ConflictChoice> for Resolution {
    fn from(choice: ConflictChoice) -> Self {
        match choice {
            ConflictChoice::Mine => Self::KeepMine,
            ConflictChoice::Theirs => Self::KeepTheirs,
            ConflictChoice::Cancel => Self::Cancel,
        }
    }
}

pub fn parse_due_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("'{value}' is not a date like 2024-01-31"))
}
