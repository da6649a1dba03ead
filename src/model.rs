use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub key: u64,
    pub value: String,
    pub time_added: DateTime<Utc>,
    pub completed: bool,
    #[serde(default, deserialize_with = "nullable_keys")]
    pub tags: Vec<u64>,
}

impl Task {
    pub fn new(key: u64, value: impl Into<String>, time_added: DateTime<Utc>) -> Self {
        Self {
            key,
            value: value.into(),
            time_added,
            completed: false,
            tags: Vec::new(),
        }
    }

    /// Returns the display checkbox: `[x]` when completed, `[ ]` otherwise.
    pub fn checkbox(&self) -> &'static str {
        if self.completed {
            "[x]"
        } else {
            "[ ]"
        }
    }

    /// Records `tag` on this task. Returns false if it was already there.
    pub fn add_tag(&mut self, tag: u64) -> bool {
        if self.tags.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    pub fn remove_tag(&mut self, tag: u64) -> bool {
        let before = self.tags.len();
        self.tags.retain(|&t| t != tag);
        self.tags.len() != before
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: u64,
    pub value: String,
    #[serde(default, deserialize_with = "nullable_keys")]
    pub tasks: Vec<u64>,
}

impl Tag {
    pub fn new(key: u64, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
            tasks: Vec::new(),
        }
    }

    /// Appends `task` in association order. Returns false if it was already there.
    pub fn add_task(&mut self, task: u64) -> bool {
        if self.tasks.contains(&task) {
            return false;
        }
        self.tasks.push(task);
        true
    }

    pub fn remove_task(&mut self, task: u64) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|&t| t != task);
        self.tasks.len() != before
    }
}

// Older files wrote empty key lists as JSON `null`.
fn nullable_keys<'de, D>(deserializer: D) -> Result<Vec<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<u64>>::deserialize(deserializer)?.unwrap_or_default())
}
