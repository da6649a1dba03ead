use std::collections::HashMap;

use chrono::{DateTime, Utc};
use crossterm::style::{style, Stylize};

use crate::model::{Tag, Task};

/// Human-readable distance from `then` to `now`, e.g. `3 minutes ago`.
/// Times in the future read as `a few seconds ago`.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    let minutes = (secs + 30) / 60;
    let hours = (secs + 1800) / 3600;
    let days = (secs + 43_200) / 86_400;

    match secs {
        s if s < 45 => "a few seconds ago".to_string(),
        s if s < 90 => "a minute ago".to_string(),
        s if s < 45 * 60 => format!("{minutes} minutes ago"),
        s if s < 90 * 60 => "an hour ago".to_string(),
        s if s < 22 * 3600 => format!("{hours} hours ago"),
        s if s < 36 * 3600 => "a day ago".to_string(),
        s if s < 26 * 86_400 => format!("{days} days ago"),
        s if s < 45 * 86_400 => "a month ago".to_string(),
        s if s < 320 * 86_400 => format!("{} months ago", (days + 15) / 30),
        s if s < 548 * 86_400 => "a year ago".to_string(),
        _ => format!("{} years ago", (days + 182) / 365),
    }
}

/// Maps tag keys to their labels for rendering.
pub fn tag_labels(tags: &[Tag]) -> HashMap<u64, String> {
    tags.iter().map(|t| (t.key, t.value.clone())).collect()
}

/// `#label` for every tag of the task, space separated. Unknown keys are skipped.
pub fn format_task_tags(task: &Task, labels: &HashMap<u64, String>) -> String {
    task.tags
        .iter()
        .filter_map(|key| labels.get(key))
        .map(|label| format!("#{label}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One line per task: checkbox, key, text, tags, and how long ago it was
/// added. With `styled`, the age is dimmed for terminal output.
pub fn format_task_list(
    tasks: &[Task],
    labels: &HashMap<u64, String>,
    now: DateTime<Utc>,
    styled: bool,
) -> String {
    let mut out = String::new();
    for task in tasks {
        let tags = format_task_tags(task, labels);
        let tags = if tags.is_empty() {
            String::new()
        } else {
            format!(" {tags}")
        };
        let added = time_ago(task.time_added, now);
        let added = if styled {
            style(added).dim().to_string()
        } else {
            added
        };
        out.push_str(&format!(
            "{} {} {}{}  {}\n",
            task.checkbox(),
            task.key,
            task.value,
            tags,
            added
        ));
    }
    out
}

pub fn format_tag_list(tags: &[Tag]) -> String {
    let mut out = String::new();
    for tag in tags {
        let count = tag.tasks.len();
        let noun = if count == 1 { "task" } else { "tasks" };
        out.push_str(&format!("{} {} ({count} {noun})\n", tag.key, tag.value));
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn ago(d: Duration) -> String {
        time_ago(now() - d, now())
    }

    #[test]
    fn time_ago_buckets() {
        assert_eq!(ago(Duration::seconds(3)), "a few seconds ago");
        assert_eq!(ago(Duration::seconds(60)), "a minute ago");
        assert_eq!(ago(Duration::minutes(5)), "5 minutes ago");
        assert_eq!(ago(Duration::minutes(60)), "an hour ago");
        assert_eq!(ago(Duration::hours(3)), "3 hours ago");
        assert_eq!(ago(Duration::hours(30)), "a day ago");
        assert_eq!(ago(Duration::days(4)), "4 days ago");
        assert_eq!(ago(Duration::days(40)), "a month ago");
        assert_eq!(ago(Duration::days(90)), "3 months ago");
        assert_eq!(ago(Duration::days(400)), "a year ago");
        assert_eq!(ago(Duration::days(365 * 3)), "3 years ago");
    }

    #[test]
    fn future_reads_as_just_now() {
        assert_eq!(time_ago(now() + Duration::minutes(10), now()), "a few seconds ago");
    }

    #[test]
    fn plain_task_list() {
        let mut done = Task::new(2, "water plants", now() - Duration::hours(3));
        done.completed = true;
        done.tags = vec![1, 8];
        let tasks = vec![
            Task::new(1, "buy milk", now() - Duration::minutes(5)),
            done,
        ];
        let labels = tag_labels(&[Tag::new(1, "home")]);

        let out = format_task_list(&tasks, &labels, now(), false);
        assert_eq!(
            out,
            "[ ] 1 buy milk  5 minutes ago\n[x] 2 water plants #home  3 hours ago\n"
        );
    }

    #[test]
    fn styled_list_keeps_text() {
        let tasks = vec![Task::new(1, "buy milk", now())];
        let out = format_task_list(&tasks, &HashMap::new(), now(), true);
        assert!(out.starts_with("[ ] 1 buy milk  "));
        assert!(out.contains("a few seconds ago"));
    }

    #[test]
    fn tag_list() {
        let mut errands = Tag::new(1, "errands");
        errands.tasks = vec![3];
        let mut home = Tag::new(2, "home");
        home.tasks = vec![1, 2];
        let out = format_tag_list(&[errands, home, Tag::new(3, "empty")]);
        assert_eq!(out, "1 errands (1 task)\n2 home (2 tasks)\n3 empty (0 tasks)\n");
    }
}
