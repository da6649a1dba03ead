use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tsk", about = "Manage your to-do list", version)]
pub struct Cli {
    /// Path to the store file [default: ~/.config/tsk/tsk.db]
    #[arg(long, env = "TSK_DB", global = true)]
    pub db: Option<PathBuf>,

    /// How long to wait for another process to release the store, in milliseconds
    #[arg(long, env = "TSK_LOCK_TIMEOUT", default_value_t = 1000, global = true)]
    pub lock_timeout: u64,

    /// Append log output to this file instead of stderr
    #[arg(long, env = "TSK_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Without a subcommand, opens the interactive list
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Add a task to your to-do list
    Add {
        /// Task text (words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },

    /// Mark tasks as done
    Do {
        /// Task keys
        #[arg(required = true, num_args = 1..)]
        keys: Vec<u64>,
    },

    /// Mark tasks as not done
    Undo {
        /// Task keys
        #[arg(required = true, num_args = 1..)]
        keys: Vec<u64>,
    },

    /// Delete tasks
    Rm {
        /// Task keys
        #[arg(required = true, num_args = 1..)]
        keys: Vec<u64>,
    },

    /// List your tasks (active only by default)
    List {
        /// List active and completed tasks
        #[arg(short, long)]
        all: bool,
        /// List completed tasks only
        #[arg(short, long)]
        done: bool,
        /// Only tasks carrying this tag
        #[arg(short, long)]
        tag: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Attach a tag to a task, creating the tag if needed
    Tag {
        /// Task key
        task: u64,
        /// Tag label
        label: String,
    },

    /// Detach a tag from a task
    Untag {
        /// Task key
        task: u64,
        /// Tag label
        label: String,
    },

    /// List all tags
    Tags {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
