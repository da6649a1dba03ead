use std::collections::HashMap;

use ratatui::widgets::ListState;

use crate::db::Store;
use crate::error::Result;
use crate::filter::StatusFilter;
use crate::model::Task;
use crate::output::tag_labels;
use crate::{tags, tasks};

/// What the bottom line is doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Help,
    /// Typing the text of a new task.
    Adding(String),
    /// Typing a tag label for the selected task.
    Tagging(String),
}

impl Mode {
    pub fn input_mut(&mut self) -> Option<&mut String> {
        match self {
            Mode::Adding(buf) | Mode::Tagging(buf) => Some(buf),
            Mode::Normal | Mode::Help => None,
        }
    }
}

pub struct App {
    pub tasks: Vec<Task>,
    pub labels: HashMap<u64, String>,
    pub cursor: usize,
    pub list_state: ListState,
    pub filter: StatusFilter,
    pub mode: Mode,
    pub status: Option<String>,
}

impl App {
    pub fn new(store: &Store) -> Result<Self> {
        let mut app = App {
            tasks: Vec::new(),
            labels: HashMap::new(),
            cursor: 0,
            list_state: ListState::default(),
            filter: StatusFilter::Active,
            mode: Mode::Normal,
            status: None,
        };
        app.refresh(store)?;
        Ok(app)
    }

    /// Reload tasks for the current filter, newest first.
    pub fn refresh(&mut self, store: &Store) -> Result<()> {
        let mut list = tasks::list_tasks(store, self.filter)?;
        list.reverse();
        self.tasks = list;
        self.labels = tag_labels(&tags::all_tags(store)?);
        self.clamp_cursor();
        Ok(())
    }

    pub fn selected(&self) -> Option<&Task> {
        self.tasks.get(self.cursor)
    }

    pub fn move_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.list_state.select(Some(self.cursor));
        }
    }

    pub fn move_down(&mut self) {
        if !self.tasks.is_empty() && self.cursor < self.tasks.len() - 1 {
            self.cursor += 1;
            self.list_state.select(Some(self.cursor));
        }
    }

    pub fn move_top(&mut self) {
        self.cursor = 0;
        self.clamp_cursor();
    }

    pub fn move_bottom(&mut self) {
        self.cursor = self.tasks.len().saturating_sub(1);
        self.clamp_cursor();
    }

    pub fn clamp_cursor(&mut self) {
        if self.tasks.is_empty() {
            self.cursor = 0;
            self.list_state.select(None);
        } else {
            if self.cursor >= self.tasks.len() {
                self.cursor = self.tasks.len() - 1;
            }
            self.list_state.select(Some(self.cursor));
        }
    }

    pub fn start_adding(&mut self) {
        self.status = None;
        self.mode = Mode::Adding(String::new());
    }

    pub fn start_tagging(&mut self) {
        if self.selected().is_some() {
            self.status = None;
            self.mode = Mode::Tagging(String::new());
        } else {
            self.status = Some("no task selected".into());
        }
    }

    pub fn cancel_input(&mut self) {
        self.mode = Mode::Normal;
    }

    /// Flip the selected task between done and active.
    pub fn toggle_selected(&mut self, store: &Store) -> Result<()> {
        let Some(task) = self.selected() else {
            return Ok(());
        };
        let (key, completed) = (task.key, task.completed);
        let updated = if completed {
            tasks::mark_active(store, key)?
        } else {
            tasks::mark_done(store, key)?
        };
        self.status = Some(match updated {
            Some(t) if t.completed => format!("completed \"{}\"", t.value),
            Some(t) => format!("reopened \"{}\"", t.value),
            None => format!("task {key} no longer exists"),
        });
        self.refresh(store)
    }

    pub fn delete_selected(&mut self, store: &Store) -> Result<()> {
        let Some(task) = self.selected() else {
            return Ok(());
        };
        let (key, text) = (task.key, task.value.clone());
        tasks::delete_task(store, key)?;
        self.status = Some(format!("deleted \"{text}\""));
        self.refresh(store)
    }

    /// Apply the pending input line and return to normal mode.
    pub fn submit_input(&mut self, store: &Store) -> Result<()> {
        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Adding(text) => {
                let task = tasks::create_task(store, &text)?;
                self.status = Some(format!("created \"{}\"", task.value));
                self.refresh(store)?;
                if let Some(pos) = self.tasks.iter().position(|t| t.key == task.key) {
                    self.cursor = pos;
                    self.clamp_cursor();
                }
            }
            Mode::Tagging(label) => {
                let Some(key) = self.selected().map(|t| t.key) else {
                    return Ok(());
                };
                let tag = tags::tag_task(store, key, &label)?;
                self.status = Some(format!("tagged {key} with #{}", tag.value));
                self.refresh(store)?;
            }
            other => self.mode = other,
        }
        Ok(())
    }

    pub fn cycle_filter(&mut self, store: &Store) -> Result<()> {
        self.filter = self.filter.next();
        self.cursor = 0;
        self.status = Some(format!("showing {} tasks", self.filter));
        self.refresh(store)
    }
}
