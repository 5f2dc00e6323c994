//! UI rendering

use chrono::{Local, TimeZone};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use fjalor_core::{Entry, EntryManager};

use super::app::{App, EntryForm, FormField, InputMode, SyncIndicator};

/// Main UI rendering function
pub fn draw(frame: &mut Frame, app: &App, manager: &EntryManager) {
    // Create vertical layout for status bar at the bottom
    let outer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let pane_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(outer_chunks[0]);

    draw_index_pane(frame, app, manager, pane_chunks[0]);
    draw_detail_pane(frame, app, manager, pane_chunks[1]);

    // Draw sync indicator in top-right corner
    draw_sync_indicator(frame, app);

    match app.input_mode {
        InputMode::Search => draw_search_input(frame, app, outer_chunks[1]),
        _ => draw_status_bar(frame, app, manager, outer_chunks[1]),
    }

    if let Some(form) = &app.form {
        draw_form_overlay(frame, form);
    }

    if app.show_help {
        draw_help_overlay(frame);
    }

    if let Some(message) = &app.error_message {
        draw_error_modal(frame, message);
    }
}

/// Draw the word index (left)
fn draw_index_pane(frame: &mut Frame, app: &App, manager: &EntryManager, area: Rect) {
    let max_len = area.width.saturating_sub(4) as usize;

    let items: Vec<ListItem> = app
        .visible
        .iter()
        .filter_map(|id| manager.get(id))
        .map(|entry| {
            let mut spans = vec![Span::raw(truncate(&entry.word, max_len.saturating_sub(2)))];
            if entry.has_recording() {
                spans.push(Span::styled(" ♪", Style::default().add_modifier(Modifier::DIM)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = if manager.search().trim().is_empty() {
        format!(" Words ({}) ", app.visible.len())
    } else {
        format!(" Words ({}/{}) ", app.visible.len(), manager.len())
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::BOLD));

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .add_modifier(Modifier::BOLD)
            .add_modifier(Modifier::REVERSED),
    );

    let mut state = ListState::default();
    if !app.visible.is_empty() {
        state.select(Some(app.list_index));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

/// Draw the detail pane (right)
fn draw_detail_pane(frame: &mut Frame, app: &App, manager: &EntryManager, area: Rect) {
    let block = Block::default().title(" Detail ").borders(Borders::ALL);

    let content = match app.current_id().and_then(|id| manager.get(id)) {
        Some(entry) => detail_lines(entry, area),
        None if manager.is_empty() => vec![
            Line::from(""),
            Line::from(vec![Span::styled(
                "No words yet. Press 'a' to add one.",
                Style::default().add_modifier(Modifier::DIM),
            )]),
        ],
        None => vec![
            Line::from(""),
            Line::from(vec![Span::styled(
                "No words match the search",
                Style::default().add_modifier(Modifier::DIM),
            )]),
        ],
    };

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.detail_scroll, 0));

    frame.render_widget(paragraph, area);
}

fn detail_lines(entry: &Entry, area: Rect) -> Vec<Line<'_>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);

    let mut lines = vec![
        Line::from(vec![Span::styled(
            entry.word.as_str(),
            bold.fg(Color::Cyan),
        )]),
        Line::from(""),
        Line::from(vec![Span::styled("Definition", bold)]),
    ];
    for text in entry.definition.lines() {
        lines.push(Line::from(text));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![Span::styled("Illustration", bold)]));
    for text in entry.illustration.lines() {
        lines.push(Line::from(Span::styled(
            text,
            Style::default().add_modifier(Modifier::ITALIC),
        )));
    }

    lines.push(Line::from(""));
    let recording = if entry.has_recording() {
        "♪ recorded pronunciation (p to play)"
    } else {
        "no recording (p to synthesize)"
    };
    lines.push(Line::from(Span::styled(recording, dim)));

    // Separator that fits the pane
    lines.push(Line::from(Span::styled(
        "─".repeat(area.width.saturating_sub(2) as usize),
        dim,
    )));
    lines.push(Line::from(vec![
        Span::styled("Created: ", dim),
        Span::raw(format_millis(entry.created_at)),
    ]));
    lines.push(Line::from(vec![
        Span::styled("Updated: ", dim),
        Span::raw(format_millis(entry.updated_at)),
    ]));
    lines.push(Line::from(vec![
        Span::styled("ID:      ", dim),
        Span::raw(entry.id.as_str()),
    ]));

    lines
}

/// Draw the status bar at the bottom
fn draw_status_bar(frame: &mut Frame, app: &App, manager: &EntryManager, area: Rect) {
    let content = if app.input_mode == InputMode::ConfirmDelete {
        let word = app
            .current_id()
            .and_then(|id| manager.get(id))
            .map(|e| e.word.as_str())
            .unwrap_or_default();
        format!("Delete '{}'? (y/n)", word)
    } else if let Some(msg) = &app.status_message {
        msg.clone()
    } else if app.input_mode == InputMode::Form {
        "Tab:next field  Enter:save  Esc:cancel".to_string()
    } else {
        format!(
            "[{} · {}]  a:add  e:edit  d:del  p:speak  /:search  o:sort  ?:help  q:quit",
            manager.mode(),
            manager.sort_order()
        )
    };

    let style = if app.input_mode == InputMode::ConfirmDelete {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };

    frame.render_widget(Paragraph::new(content).style(style), area);
}

/// Draw search input at the bottom
fn draw_search_input(frame: &mut Frame, app: &App, area: Rect) {
    let prefix = "/";

    let line = Line::from(vec![
        Span::styled(prefix, Style::default().fg(Color::Cyan)),
        Span::raw(app.search_input.as_str()),
        Span::styled(
            format!("  ({} matches)", app.visible.len()),
            Style::default().add_modifier(Modifier::DIM),
        ),
    ]);

    frame.render_widget(Paragraph::new(line), area);

    let cursor_x = area.x + prefix.len() as u16 + app.search_cursor as u16;
    frame.set_cursor_position((cursor_x, area.y));
}

/// Draw sync indicator in top-right corner
fn draw_sync_indicator(frame: &mut Frame, app: &App) {
    let area = frame.area();
    if area.width < 5 {
        return;
    }

    let (icon, style) = match app.sync_status {
        SyncIndicator::Synced => ("✓", Style::default().fg(Color::Green)),
        SyncIndicator::Syncing => ("↻", Style::default().fg(Color::Yellow)),
        SyncIndicator::Disabled => ("○", Style::default().add_modifier(Modifier::DIM)),
        SyncIndicator::Error => ("✗", Style::default().fg(Color::Red)),
    };

    let indicator = Paragraph::new(Span::styled(icon, style));
    let indicator_area = Rect::new(area.width - 2, 0, 1, 1);
    frame.render_widget(indicator, indicator_area);
}

/// Draw the add/edit form
fn draw_form_overlay(frame: &mut Frame, form: &EntryForm) {
    let popup_area = centered(frame.area(), 70, 16);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(form.title())
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::BOLD));
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Min(0),
        ])
        .split(inner);

    let fields = [FormField::Word, FormField::Definition, FormField::Illustration];
    for (field, area) in fields.into_iter().zip(rows.iter()) {
        let focused = form.focus == field;
        let mut title = format!(" {} ", field.label());
        if let Some(error) = form.error(field) {
            title = format!(" {} - {} ", field.label(), error);
        }

        let border_style = match (focused, form.error(field).is_some()) {
            (_, true) => Style::default().fg(Color::Red),
            (true, false) => Style::default().fg(Color::Cyan),
            (false, false) => Style::default().add_modifier(Modifier::DIM),
        };

        let input = Paragraph::new(form.value(field))
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(border_style),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(input, *area);

        if focused {
            let width = area.width.saturating_sub(2).max(1);
            let cursor = form.cursor as u16;
            frame.set_cursor_position((
                area.x + 1 + cursor % width,
                area.y + 1 + (cursor / width).min(area.height.saturating_sub(3)),
            ));
        }
    }

    if form.draft.recording.is_some() {
        let note = Paragraph::new(Span::styled(
            "♪ recording kept",
            Style::default().add_modifier(Modifier::DIM),
        ));
        frame.render_widget(note, rows[3]);
    }
}

/// Draw help overlay
fn draw_help_overlay(frame: &mut Frame) {
    let popup_area = centered(frame.area(), 50, 22);
    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(vec![Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from("Navigation:"),
        Line::from("  j/k, ↑/↓    Move up/down"),
        Line::from("  gg          Jump to first word"),
        Line::from("  G           Jump to last word"),
        Line::from("  J/K         Scroll detail"),
        Line::from(""),
        Line::from("Entries:"),
        Line::from("  a           Add word"),
        Line::from("  e           Edit word"),
        Line::from("  d           Delete word"),
        Line::from("  p           Pronounce"),
        Line::from("  x           Stop speaking"),
        Line::from(""),
        Line::from("  /           Search words"),
        Line::from("  o           Toggle sort order"),
        Line::from("  S           Pull from cloud"),
        Line::from("  q           Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::BOLD));

    frame.render_widget(Paragraph::new(help_text).block(block), popup_area);
}

/// Draw an error modal (any key dismisses)
fn draw_error_modal(frame: &mut Frame, message: &str) {
    let popup_area = centered(frame.area(), 60, 7);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(" Error ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let paragraph = Paragraph::new(vec![
        Line::from(message),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ])
    .block(block)
    .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, popup_area);
}

/// Centered popup area, clamped to the frame
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let popup_width = width.min(area.width.saturating_sub(4));
    let popup_height = height.min(area.height.saturating_sub(2));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    Rect::new(popup_x, popup_y, popup_width, popup_height)
}

fn format_millis(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
