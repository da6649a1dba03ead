//! Interactive task list.

mod app;
mod event;
mod view;

use std::io;

use anyhow::Result;
use crossterm::event::{self as ct_event, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use log::{debug, warn};
use ratatui::prelude::*;

use crate::db::Store;
use crate::error::StoreError;
use app::App;
use event::KeyAction;

pub fn run(store: &Store) -> Result<()> {
    let mut app = App::new(store)?;

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, store);

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    store: &Store,
) -> Result<()> {
    loop {
        terminal.draw(|frame| view::render(frame, app))?;

        let Event::Key(key) = ct_event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let outcome = match event::handle_key(app, key) {
            KeyAction::Quit => return Ok(()),
            KeyAction::Toggle => app.toggle_selected(store),
            KeyAction::Delete => app.delete_selected(store),
            KeyAction::Submit => app.submit_input(store),
            KeyAction::CycleFilter => app.cycle_filter(store),
            KeyAction::Continue => Ok(()),
        };
        if let Err(e) = outcome {
            report(app, e)?;
        }
    }
}

/// Show user-facing failures on the status line; anything else ends the session.
fn report(app: &mut App, e: StoreError) -> Result<()> {
    match e {
        StoreError::EmptyText(_) | StoreError::NotFound { .. } => {
            debug!("tui action rejected: {e}");
            app.status = Some(e.to_string());
            Ok(())
        }
        other => {
            warn!("tui action failed: {other}");
            Err(other.into())
        }
    }
}
