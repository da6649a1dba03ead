use chrono::Utc;
use log::debug;

use crate::db::{Reader, Store};
use crate::error::{RecordKind, Result};
use crate::filter::StatusFilter;
use crate::model::{Tag, Task};
use crate::validate::clean_text;

pub fn create_task(store: &Store, text: &str) -> Result<Task> {
    let text = clean_text(RecordKind::Task, text)?;
    let task = store.update(|tx| {
        let key = tx.next_id::<Task>()?;
        let task = Task::new(key, text, Utc::now());
        tx.put(&task)?;
        Ok(task)
    })?;
    debug!("created task {}", task.key);
    Ok(task)
}

pub fn get_task(store: &Store, key: u64) -> Result<Option<Task>> {
    store.view(|tx| tx.get(key))
}

/// Removes the task and drops it from every tag that lists it. Deleting a key
/// that does not exist succeeds without changing anything.
pub fn delete_task(store: &Store, key: u64) -> Result<()> {
    store.update(|tx| {
        if !tx.delete::<Task>(key)? {
            debug!("delete of missing task {key} ignored");
            return Ok(());
        }
        let tags: Vec<Tag> = tx.scan(|tag: &Tag| tag.tasks.contains(&key))?;
        for mut tag in tags {
            tag.remove_task(key);
            tx.put(&tag)?;
        }
        debug!("deleted task {key}");
        Ok(())
    })
}

/// Marks the task completed. Returns `None` if no task has this key.
pub fn mark_done(store: &Store, key: u64) -> Result<Option<Task>> {
    set_completed(store, key, true)
}

/// Marks the task not completed. Returns `None` if no task has this key.
pub fn mark_active(store: &Store, key: u64) -> Result<Option<Task>> {
    set_completed(store, key, false)
}

fn set_completed(store: &Store, key: u64, completed: bool) -> Result<Option<Task>> {
    store.update(|tx| {
        let Some(mut task) = tx.get::<Task>(key)? else {
            debug!("status change of missing task {key} ignored");
            return Ok(None);
        };
        if task.completed != completed {
            task.completed = completed;
            tx.put(&task)?;
        }
        Ok(Some(task))
    })
}

/// Every task accepted by `filter`, in creation order.
pub fn list_tasks(store: &Store, filter: StatusFilter) -> Result<Vec<Task>> {
    store.view(|tx| tx.scan(|task: &Task| filter.matches(task)))
}

pub fn active_tasks(store: &Store) -> Result<Vec<Task>> {
    list_tasks(store, StatusFilter::Active)
}

pub fn completed_tasks(store: &Store) -> Result<Vec<Task>> {
    list_tasks(store, StatusFilter::Done)
}

pub fn all_tasks(store: &Store) -> Result<Vec<Task>> {
    list_tasks(store, StatusFilter::All)
}

/// Tasks associated with the tag, in the order they were tagged. An unknown
/// tag has no tasks; task keys that no longer resolve are skipped.
pub fn tasks_for_tag(store: &Store, tag_key: u64) -> Result<Vec<Task>> {
    store.view(|tx| {
        let Some(tag) = tx.get::<Tag>(tag_key)? else {
            return Ok(Vec::new());
        };
        let mut tasks = Vec::with_capacity(tag.tasks.len());
        for key in tag.tasks {
            if let Some(task) = tx.get::<Task>(key)? {
                tasks.push(task);
            }
        }
        Ok(tasks)
    })
}
