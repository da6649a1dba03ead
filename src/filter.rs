use std::fmt;

use crate::model::Task;

/// Which tasks a listing includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    Active,
    Done,
    All,
}

impl StatusFilter {
    /// Maps the `--all` / `--done` list flags; `--all` wins when both are set.
    pub fn from_flags(all: bool, done: bool) -> Self {
        if all {
            Self::All
        } else if done {
            Self::Done
        } else {
            Self::Active
        }
    }

    pub fn matches(self, task: &Task) -> bool {
        match self {
            Self::Active => !task.completed,
            Self::Done => task.completed,
            Self::All => true,
        }
    }

    /// Cycles Active -> Done -> All -> Active.
    pub fn next(self) -> Self {
        match self {
            Self::Active => Self::Done,
            Self::Done => Self::All,
            Self::All => Self::Active,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Done => "done",
            Self::All => "all",
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
