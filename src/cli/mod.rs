//! Command-line interface for tasksync
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use crate::api::{HttpTaskApi, TaskApi};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::feedback::{FeedbackLevel, FeedbackMessage, RecordingFeedback};
use crate::output::{HumanOutput, OutputOptions};
use crate::store::TaskStore;

mod config;
mod status;
mod task;
mod watch;

/// tasksync - task list client
///
/// Reads and edits tasks on a task server and follows the server's push
/// notifications.
#[derive(Parser, Debug)]
#[command(name = "tasksync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Server base URL (overrides server.base_url)
    #[arg(long, global = true, env = "TASKSYNC_SERVER")]
    pub server: Option<String>,

    /// User id the session runs as
    #[arg(long, global = true, env = "TASKSYNC_USER")]
    pub user: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Write notification events as JSONL to a file, or "-" for stdout
    #[arg(long, global = true)]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which completion state `list` shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    Active,
    Completed,
    All,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List tasks
    List {
        /// Priority to show: all, low, medium, high
        #[arg(long, default_value = "all")]
        priority: String,

        /// Completion state to show
        #[arg(long, value_enum, default_value = "all")]
        status: StatusFilter,
    },

    /// Show one task
    Show {
        /// Task id
        id: String,
    },

    /// Create a task
    Add {
        /// Task title
        #[arg(long)]
        title: String,

        /// Task description
        #[arg(long)]
        description: Option<String>,

        /// Priority: low, medium, high
        #[arg(long)]
        priority: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },

    /// Edit a task; fields not given keep their current value
    Edit {
        /// Task id
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Priority: low, medium, high
        #[arg(long)]
        priority: Option<String>,

        /// Due date (YYYY-MM-DD), empty to clear
        #[arg(long)]
        due: Option<String>,

        /// true or false
        #[arg(long)]
        completed: Option<String>,
    },

    /// Mark a task completed
    Done {
        /// Task id
        id: String,
    },

    /// Delete a task
    Rm {
        /// Task id
        id: String,
    },

    /// Show the server's task statistics
    Status,

    /// Follow push notifications
    Watch {
        /// Stop after this many notifications
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Write a default .tasksync.toml in the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Resolved global options shared by every command.
pub(crate) struct Context {
    pub config: Config,
    pub dir: PathBuf,
    pub user: Option<String>,
    pub events: Option<String>,
    pub json: bool,
    pub quiet: bool,
}

impl Context {
    fn load(cli: &Cli) -> Result<Self> {
        let dir = std::env::current_dir()?;
        let mut config = Config::load_from_dir(&dir)?;
        if let Some(server) = &cli.server {
            config.server.base_url = server.clone();
            config.validate()?;
        }
        let user = cli
            .user
            .as_deref()
            .map(str::trim)
            .filter(|user| !user.is_empty())
            .map(str::to_string);
        Ok(Self {
            config,
            dir,
            user,
            events: cli.events.clone(),
            json: cli.json,
            quiet: cli.quiet,
        })
    }

    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }

    pub fn api(&self) -> Result<Arc<dyn TaskApi>> {
        let api = HttpTaskApi::new(
            self.config.server.base_url.clone(),
            self.config.server.request_timeout(),
        )?;
        Ok(Arc::new(api))
    }

    /// Store whose feedback is collected for the command's output.
    pub fn store(&self) -> Result<(TaskStore, RecordingFeedback)> {
        let feedback = RecordingFeedback::new();
        let store = TaskStore::new(
            self.api()?,
            Arc::new(feedback.clone()),
            self.config.sync.merge_policy(),
        );
        Ok((store, feedback))
    }
}

/// Fold collected feedback into human output.
pub(crate) fn attach_feedback(human: &mut HumanOutput, messages: &[FeedbackMessage]) {
    for message in messages {
        match message.level {
            FeedbackLevel::Success => human.push_detail(message.message.clone()),
            FeedbackLevel::Error => human.push_warning(message.message.clone()),
        }
    }
}

/// Error feedback is shown even though the command itself fails.
pub(crate) fn report_failed_feedback(ctx: &Context, messages: &[FeedbackMessage]) {
    if ctx.json || ctx.quiet {
        return;
    }
    for message in messages
        .iter()
        .filter(|message| message.level == FeedbackLevel::Error)
    {
        eprintln!("{}", message.message);
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };
        // Must work even when the existing config does not load.
        if let Commands::Config(ConfigCommands::Init { force }) = &self.command {
            return config::run_init(&std::env::current_dir()?, *force, output);
        }

        let ctx = Context::load(&self)?;
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|err| Error::OperationFailed(format!("failed to start runtime: {err}")))?;

        match self.command {
            Commands::List { priority, status } => {
                let filter = priority.parse()?;
                runtime.block_on(task::run_list(&ctx, filter, status))
            }
            Commands::Show { id } => runtime.block_on(task::run_show(&ctx, &id)),
            Commands::Add {
                title,
                description,
                priority,
                due,
            } => runtime.block_on(task::run_add(
                &ctx,
                task::TaskFields {
                    title: Some(title),
                    description,
                    priority,
                    due,
                    completed: None,
                },
            )),
            Commands::Edit {
                id,
                title,
                description,
                priority,
                due,
                completed,
            } => runtime.block_on(task::run_edit(
                &ctx,
                &id,
                task::TaskFields {
                    title,
                    description,
                    priority,
                    due,
                    completed,
                },
            )),
            Commands::Done { id } => runtime.block_on(task::run_edit(
                &ctx,
                &id,
                task::TaskFields {
                    completed: Some("true".to_string()),
                    ..task::TaskFields::default()
                },
            )),
            Commands::Rm { id } => runtime.block_on(task::run_rm(&ctx, &id)),
            Commands::Status => runtime.block_on(status::run(&ctx)),
            Commands::Watch { limit } => runtime.block_on(watch::run(&ctx, limit)),
            Commands::Config(cmd) => match cmd {
                ConfigCommands::Show => config::run_show(&ctx),
                ConfigCommands::Init { force } => config::run_init(&ctx.dir, force, output),
            },
        }
    }
}
