use chrono::{DateTime, Utc};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph};

use super::app::{App, Mode};
use crate::model::Task;
use crate::output::{format_task_tags, time_ago};

const HINT: &str = "a: add  enter: done/undo  x: delete  t: tag  f: filter  ?: help  q: quit";

const HELP: &[(&str, &str)] = &[
    ("j/k, arrows", "move"),
    ("g/G", "first/last task"),
    ("enter, space", "toggle done"),
    ("x, backspace", "delete task"),
    ("a", "add a task"),
    ("t", "tag the selected task"),
    ("f", "cycle active/done/all"),
    ("?", "close this help"),
    ("q, esc", "quit"),
];

pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let now = Utc::now();
    let items: Vec<ListItem> = app
        .tasks
        .iter()
        .map(|task| task_item(task, app, now))
        .collect();
    let title = format!(" Tasks ({}) ", app.filter);
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray));
    frame.render_stateful_widget(list, chunks[0], &mut app.list_state);

    frame.render_widget(bottom_line(app), chunks[1]);

    if app.mode == Mode::Help {
        render_help(frame);
    }
}

fn task_item(task: &Task, app: &App, now: DateTime<Utc>) -> ListItem<'static> {
    let text_style = if task.completed {
        Style::default().fg(Color::DarkGray).crossed_out()
    } else {
        Style::default()
    };
    let mut spans = vec![
        Span::raw(format!("{} ", task.checkbox())),
        Span::styled(task.value.clone(), text_style),
    ];
    let tags = format_task_tags(task, &app.labels);
    if !tags.is_empty() {
        spans.push(Span::styled(
            format!(" {tags}"),
            Style::default().fg(Color::Cyan),
        ));
    }
    spans.push(Span::styled(
        format!("  {}", time_ago(task.time_added, now)),
        Style::default().dim(),
    ));
    ListItem::new(Line::from(spans))
}

fn bottom_line(app: &App) -> Paragraph<'static> {
    match &app.mode {
        Mode::Adding(buf) => Paragraph::new(Line::from(vec![
            Span::styled("Add: ", Style::default().fg(Color::Cyan).bold()),
            Span::raw(format!("{buf}_")),
        ])),
        Mode::Tagging(buf) => Paragraph::new(Line::from(vec![
            Span::styled("Tag: ", Style::default().fg(Color::Cyan).bold()),
            Span::raw(format!("{buf}_")),
        ])),
        Mode::Normal | Mode::Help => match &app.status {
            Some(msg) => Paragraph::new(msg.clone()).style(Style::default().fg(Color::Yellow)),
            None => Paragraph::new(HINT).style(Style::default().fg(Color::DarkGray)),
        },
    }
}

fn render_help(frame: &mut Frame) {
    let term = frame.area();
    let width = 44.min(term.width.saturating_sub(4));
    let height = (HELP.len() as u16 + 2).min(term.height.saturating_sub(2));
    let area = centered_rect(width, height, term);
    frame.render_widget(Clear, area);

    let lines: Vec<Line> = HELP
        .iter()
        .map(|(keys, what)| {
            Line::from(vec![
                Span::styled(format!("{keys:<14}"), Style::default().bold()),
                Span::raw(*what),
            ])
        })
        .collect();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Keys ")
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Center a rectangle within an area.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
