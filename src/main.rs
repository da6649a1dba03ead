mod cli;

use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use log::LevelFilter;

use cli::{Cli, Command};
use tsk::{output, paths, tags, tasks, tui, StatusFilter, Store, StoreOptions, Tag, Task};

fn resolve_db_path(cli_db: Option<PathBuf>) -> Result<PathBuf> {
    match cli_db {
        Some(p) => Ok(p),
        None => paths::default_db_path().context("neither XDG_CONFIG_HOME nor HOME is set"),
    }
}

fn ensure_db_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

fn setup_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Warn).parse_default_env();
    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        builder
            .target(env_logger::Target::Pipe(Box::new(file)))
            .format_timestamp_secs();
    }
    builder.init();
    Ok(())
}

fn open_store(db_path: &Path, lock_timeout: u64) -> Result<Store> {
    let options = StoreOptions {
        lock_timeout: Duration::from_millis(lock_timeout),
    };
    Store::open_with(db_path, options)
        .with_context(|| format!("failed to open {}", db_path.display()))
}

fn tag_by_label(store: &Store, label: &str) -> Result<Tag> {
    match tags::find_tag(store, label)? {
        Some(tag) => Ok(tag),
        None => bail!("no tag labelled '{}'", label.trim()),
    }
}

/// Tasks matching `filter`, narrowed to those carrying `tag` when given.
fn select_tasks(store: &Store, filter: StatusFilter, tag: Option<&str>) -> Result<Vec<Task>> {
    match tag {
        Some(label) => {
            let tag = tag_by_label(store, label)?;
            let mut list = tasks::tasks_for_tag(store, tag.key)?;
            list.retain(|t| filter.matches(t));
            Ok(list)
        }
        None => Ok(tasks::list_tasks(store, filter)?),
    }
}

fn dispatch(store: &Store, command: Command) -> Result<()> {
    match command {
        Command::Add { words } => {
            let task = tasks::create_task(store, &words.join(" "))?;
            println!("Created task \"{}\"", task.value);
        }

        Command::Do { keys } => {
            for key in keys {
                match tasks::mark_done(store, key)? {
                    Some(task) => println!("Completed {key} \"{}\"", task.value),
                    None => eprintln!("No task {key}"),
                }
            }
        }

        Command::Undo { keys } => {
            for key in keys {
                match tasks::mark_active(store, key)? {
                    Some(task) => println!("Reopened {key} \"{}\"", task.value),
                    None => eprintln!("No task {key}"),
                }
            }
        }

        Command::Rm { keys } => {
            for key in keys {
                tasks::delete_task(store, key)?;
                println!("Deleted {key}");
            }
        }

        Command::List {
            all,
            done,
            tag,
            json,
        } => {
            let filter = StatusFilter::from_flags(all, done);
            let list = select_tasks(store, filter, tag.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else {
                let labels = output::tag_labels(&tags::all_tags(store)?);
                let styled = std::io::stdout().is_terminal();
                print!(
                    "{}",
                    output::format_task_list(&list, &labels, Utc::now(), styled)
                );
            }
        }

        Command::Tag { task, label } => {
            let tag = tags::tag_task(store, task, &label)?;
            println!("Tagged {task} with '{}'", tag.value);
        }

        Command::Untag { task, label } => {
            let tag = tag_by_label(store, &label)?;
            tags::remove_task_from_tag(store, task, tag.key)?;
            println!("Removed '{}' from {task}", tag.value);
        }

        Command::Tags { json } => {
            let all = tags::all_tags(store)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&all)?);
            } else {
                print!("{}", output::format_tag_list(&all));
            }
        }
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_file.as_deref())?;

    let db_path = resolve_db_path(cli.db)?;
    ensure_db_dir(&db_path)?;
    let store = open_store(&db_path, cli.lock_timeout)?;

    let result = match cli.command {
        None => tui::run(&store),
        Some(command) => dispatch(&store, command),
    };
    let closed = store.close();
    result?;
    closed.context("failed to close store")
}
