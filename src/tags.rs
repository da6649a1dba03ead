//! Tags and their association with tasks.
//!
//! An association is stored on both sides: the tag's `tasks` list and the
//! task's `tags` set are always updated together in one write transaction.

use log::debug;

use crate::db::{Reader, Store, WriteTx};
use crate::error::{RecordKind, Result, StoreError};
use crate::model::{Tag, Task};
use crate::validate::clean_text;

pub fn create_tag(store: &Store, text: &str) -> Result<Tag> {
    let text = clean_text(RecordKind::Tag, text)?;
    let tag = store.update(|tx| insert_tag(tx, text))?;
    debug!("created tag {}", tag.key);
    Ok(tag)
}

pub fn get_tag(store: &Store, key: u64) -> Result<Option<Tag>> {
    store.view(|tx| tx.get(key))
}

/// The lowest-keyed tag whose text equals `label`.
pub fn find_tag(store: &Store, label: &str) -> Result<Option<Tag>> {
    let label = label.trim();
    store.view(|tx| Ok(tx.scan(|tag: &Tag| tag.value == label)?.into_iter().next()))
}

/// Returns the tag labelled `label`, creating it if there is none.
pub fn ensure_tag(store: &Store, label: &str) -> Result<Tag> {
    let label = clean_text(RecordKind::Tag, label)?;
    store.update(|tx| {
        if let Some(tag) = tx.scan(|tag: &Tag| tag.value == label)?.into_iter().next() {
            return Ok(tag);
        }
        let tag = insert_tag(tx, label)?;
        debug!("created tag {} for label {label:?}", tag.key);
        Ok(tag)
    })
}

/// Attaches the tag labelled `label` to the task, creating the tag if needed.
/// A missing task fails with `NotFound` before anything is written.
pub fn tag_task(store: &Store, task_key: u64, label: &str) -> Result<Tag> {
    let label = clean_text(RecordKind::Tag, label)?;
    store.update(|tx| {
        let mut task = tx.get::<Task>(task_key)?.ok_or(StoreError::NotFound {
            kind: RecordKind::Task,
            key: task_key,
        })?;
        let mut tag = match tx.scan(|tag: &Tag| tag.value == label)?.into_iter().next() {
            Some(tag) => tag,
            None => insert_tag(tx, label)?,
        };
        if tag.add_task(task_key) {
            tx.put(&tag)?;
        }
        if task.add_tag(tag.key) {
            tx.put(&task)?;
        }
        debug!("tagged task {task_key} with tag {} ({label:?})", tag.key);
        Ok(tag)
    })
}

fn insert_tag(tx: &mut WriteTx<'_>, text: &str) -> Result<Tag> {
    let key = tx.next_id::<Tag>()?;
    let tag = Tag::new(key, text);
    tx.put(&tag)?;
    Ok(tag)
}

pub fn all_tags(store: &Store) -> Result<Vec<Tag>> {
    store.view(|tx| tx.scan(|_: &Tag| true))
}

/// Tags attached to the task, in the order they were attached. An unknown
/// task has no tags.
pub fn tags_for_task(store: &Store, task_key: u64) -> Result<Vec<Tag>> {
    store.view(|tx| {
        let Some(task) = tx.get::<Task>(task_key)? else {
            return Ok(Vec::new());
        };
        let mut tags = Vec::with_capacity(task.tags.len());
        for key in task.tags {
            if let Some(tag) = tx.get::<Tag>(key)? {
                tags.push(tag);
            }
        }
        Ok(tags)
    })
}

/// Associates the task with the tag. Both must exist. Associating a pair that
/// is already linked changes nothing.
pub fn add_task_to_tag(store: &Store, task_key: u64, tag_key: u64) -> Result<()> {
    store.update(|tx| {
        let (mut task, mut tag) = load_pair(tx, task_key, tag_key)?;
        if tag.add_task(task_key) {
            tx.put(&tag)?;
        }
        if task.add_tag(tag_key) {
            tx.put(&task)?;
        }
        debug!("tagged task {task_key} with tag {tag_key}");
        Ok(())
    })
}

/// Removes the association between the task and the tag. Both must exist.
pub fn remove_task_from_tag(store: &Store, task_key: u64, tag_key: u64) -> Result<()> {
    store.update(|tx| {
        let (mut task, mut tag) = load_pair(tx, task_key, tag_key)?;
        if tag.remove_task(task_key) {
            tx.put(&tag)?;
        }
        if task.remove_tag(tag_key) {
            tx.put(&task)?;
        }
        debug!("untagged task {task_key} from tag {tag_key}");
        Ok(())
    })
}

fn load_pair(tx: &WriteTx<'_>, task_key: u64, tag_key: u64) -> Result<(Task, Tag)> {
    let task = tx.get::<Task>(task_key)?.ok_or(StoreError::NotFound {
        kind: RecordKind::Task,
        key: task_key,
    })?;
    let tag = tx.get::<Tag>(tag_key)?.ok_or(StoreError::NotFound {
        kind: RecordKind::Tag,
        key: tag_key,
    })?;
    Ok((task, tag))
}
