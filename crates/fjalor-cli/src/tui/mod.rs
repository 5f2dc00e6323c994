//! Fjalor TUI
//!
//! Terminal user interface for the dictionary.
//!
//! ## Layout
//!
//! - Left: word index (search-filtered, sorted)
//! - Right: detail of the selected entry
//! - Bottom: status bar with mode and sort order; sync indicator top-right
//!
//! ## Keys
//!
//! - j/k or ↑/↓: Move selection, gg/G: first/last, J/K: scroll detail
//! - /: Search, o: Toggle sort order
//! - a: Add, e: Edit, d: Delete
//! - p: Pronounce, x: Stop
//! - S: Pull from cloud
//! - ?: Help, q: Quit
//!
//! In the form: Tab/Shift-Tab move between fields, Enter saves, Esc
//! cancels, Ctrl-E opens the focused field in `$EDITOR`.

mod app;
mod ui;

use std::fs::File;
use std::io::stdout;

use anyhow::Result;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fjalor_core::{Config, EntryManager, Speech};

use app::{App, FormField, InputMode, SyncIndicator};

use crate::editor;

/// Run the TUI application
pub async fn run(config: Config) -> Result<()> {
    // Initialize TUI logging (file-based, only if FJALOR_LOG is set)
    init_tui_logging(&config);

    let mut manager = EntryManager::open(&config)?;
    let speech = Speech::new(&config.speech);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = App::new(&mut manager, speech);

    // Pull the cloud copy before the first interaction
    if manager.is_cloud() {
        app.sync_status = SyncIndicator::Syncing;
        terminal.draw(|frame| ui::draw(frame, &app, &manager))?;
        pull(&mut app, &mut manager).await;
    }

    let result = run_app(&mut terminal, &mut app, &mut manager).await;

    // Restore terminal
    app.speech.stop();
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    manager: &mut EntryManager,
) -> Result<()> {
    loop {
        // Check for status message timeout
        app.check_status_timeout();

        terminal.draw(|frame| ui::draw(frame, app, manager))?;

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // Check for terminal events (non-blocking)
        if event::poll(std::time::Duration::from_millis(0))? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (not release)
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                // If error modal is showing, any key dismisses it
                if app.has_error() {
                    app.clear_error();
                    continue;
                }

                // If help is showing, any key dismisses it
                if app.show_help {
                    app.show_help = false;
                    continue;
                }

                match app.input_mode {
                    InputMode::Normal => {
                        handle_normal_mode(terminal, app, manager, key.code, key.modifiers).await?
                    }
                    InputMode::Search => handle_search_mode(app, manager, key.code),
                    InputMode::Form => {
                        handle_form_mode(terminal, app, manager, key.code, key.modifiers).await?
                    }
                    InputMode::ConfirmDelete => handle_confirm_delete(app, manager, key.code).await,
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Handle key events in normal mode
async fn handle_normal_mode<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    manager: &mut EntryManager,
    code: KeyCode,
    modifiers: KeyModifiers,
) -> Result<()> {
    // Clear status message on navigation keys
    if matches!(
        code,
        KeyCode::Char('j')
            | KeyCode::Char('k')
            | KeyCode::Up
            | KeyCode::Down
            | KeyCode::Char('g')
            | KeyCode::Char('G')
    ) {
        app.status_message = None;
    }

    // Clear pending 'g' if timeout expired (500ms)
    if let Some(time) = app.pending_g {
        if time.elapsed() > std::time::Duration::from_millis(500) {
            app.pending_g = None;
        }
    }

    match code {
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }

        KeyCode::Char('k') | KeyCode::Up => {
            app.move_up();
            app.select_current(manager);
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.move_down();
            app.select_current(manager);
        }
        KeyCode::Char('K') | KeyCode::PageUp => app.scroll_detail_up(),
        KeyCode::Char('J') | KeyCode::PageDown => app.scroll_detail_down(),

        // gg: jump to first
        KeyCode::Char('g') => {
            if app.pending_g.take().is_some() {
                app.move_to_first();
                app.select_current(manager);
            } else {
                app.pending_g = Some(std::time::Instant::now());
            }
        }
        KeyCode::Char('G') => {
            app.move_to_last();
            app.select_current(manager);
        }

        KeyCode::Char('/') => app.enter_search_mode(),
        KeyCode::Esc => {
            if !manager.search().is_empty() {
                app.clear_search(manager);
            }
        }
        KeyCode::Char('o') => app.toggle_sort(manager),
        KeyCode::Char('?') => app.toggle_help(),

        KeyCode::Char('a') => app.open_add_form(),
        KeyCode::Char('e') | KeyCode::Enter => {
            if let Some(entry) = app.current_id().and_then(|id| manager.get(id)).cloned() {
                app.open_edit_form(&entry);
            }
        }
        KeyCode::Char('d') => {
            if app.current_id().is_some() {
                app.input_mode = InputMode::ConfirmDelete;
            }
        }

        KeyCode::Char('p') => {
            if let Some(entry) = app.current_id().and_then(|id| manager.get(id)) {
                let word = entry.word.clone();
                match app.speech.pronounce(entry) {
                    Ok(()) => app.set_status(format!("Pronouncing '{}'", word)),
                    Err(e) => app.set_status(format!("Speech unavailable: {}", e)),
                }
            }
        }
        KeyCode::Char('x') => {
            app.speech.stop();
        }

        KeyCode::Char('S') => {
            if manager.is_cloud() {
                app.sync_status = SyncIndicator::Syncing;
                app.set_status("Pulling from cloud...");
                terminal.draw(|frame| ui::draw(frame, app, manager))?;
                pull(app, manager).await;
            } else {
                app.set_status("Cloud sync is not configured");
            }
        }

        _ => {}
    }

    Ok(())
}

/// Handle key events while typing a search
fn handle_search_mode(app: &mut App, manager: &mut EntryManager, code: KeyCode) {
    match code {
        KeyCode::Esc => {
            app.clear_search(manager);
            app.exit_input_mode();
        }
        KeyCode::Enter => {
            app.exit_input_mode();
        }
        KeyCode::Char(c) => {
            app.insert_char(c);
            app.apply_search(manager);
        }
        KeyCode::Backspace => {
            app.delete_char();
            app.apply_search(manager);
        }
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        _ => {}
    }
}

/// Handle key events in the add/edit form
async fn handle_form_mode<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    manager: &mut EntryManager,
    code: KeyCode,
    modifiers: KeyModifiers,
) -> Result<()> {
    let Some(form) = app.form.as_mut() else {
        app.exit_input_mode();
        return Ok(());
    };

    match code {
        KeyCode::Esc => app.close_form(),
        KeyCode::Tab | KeyCode::Down => form.focus_next(),
        KeyCode::BackTab | KeyCode::Up => form.focus_prev(),
        KeyCode::Char('e') if modifiers.contains(KeyModifiers::CONTROL) => {
            let field = form.focus;
            let current = form.value(field).to_string();

            // Exit TUI temporarily for editor
            disable_raw_mode()?;
            stdout().execute(LeaveAlternateScreen)?;
            stdout().execute(cursor::Show)?;

            let edited = editor::edit_text(field.label(), &current);

            enable_raw_mode()?;
            stdout().execute(EnterAlternateScreen)?;
            terminal.clear()?;

            match edited {
                Ok(text) => {
                    if let Some(form) = app.form.as_mut() {
                        let value = text.trim().to_string();
                        form.cursor = value.chars().count();
                        match field {
                            FormField::Word => form.draft.word = value,
                            FormField::Definition => form.draft.definition = value,
                            FormField::Illustration => form.draft.illustration = value,
                        }
                    }
                }
                Err(e) => app.set_error(format!("Editor failed: {}", e)),
            }
        }
        KeyCode::Enter => submit_form(app, manager).await,
        KeyCode::Char(c) => form.insert_char(c),
        KeyCode::Backspace => form.delete_char(),
        KeyCode::Left => form.cursor_left(),
        KeyCode::Right => form.cursor_right(),
        _ => {}
    }

    Ok(())
}

/// Validate and save the open form
///
/// The form stays open on any failure so nothing typed is lost.
async fn submit_form(app: &mut App, manager: &mut EntryManager) {
    let Some(form) = app.form.as_mut() else {
        return;
    };
    if !form.check() {
        return;
    }

    let draft = form.draft.clone();
    let result = match form.editing.clone() {
        Some(id) => manager.update(&id, draft).await,
        None => manager.add(draft).await,
    };

    match result {
        Ok(entry) => {
            let verb = if app.form.as_ref().is_some_and(|f| f.editing.is_some()) {
                "Updated"
            } else {
                "Added"
            };
            app.close_form();
            manager.select(Some(&entry.id));
            app.refresh(manager);
            app.set_status(format!("{} '{}'", verb, entry.word));
        }
        Err(fjalor_core::EntryError::NotFound { .. }) => {
            // The entry vanished underneath the form
            app.close_form();
            app.refresh(manager);
            app.set_status("This entry no longer exists.");
        }
        Err(e) => {
            warn!("Save failed: {}", e);
            app.report(&e);
            app.sync_status = SyncIndicator::from(manager.sync_status());
        }
    }
}

/// Handle the y/n answer to a delete prompt
async fn handle_confirm_delete(app: &mut App, manager: &mut EntryManager, code: KeyCode) {
    app.exit_input_mode();
    if !matches!(code, KeyCode::Char('y') | KeyCode::Char('Y')) {
        app.set_status("Delete cancelled");
        return;
    }

    let Some(id) = app.current_id().cloned() else {
        return;
    };
    let word = manager.get(&id).map(|e| e.word.clone()).unwrap_or_default();

    match manager.remove(&id).await {
        Ok(()) => {
            app.refresh(manager);
            app.set_status(format!("Deleted '{}'", word));
        }
        Err(e) => {
            warn!("Delete failed: {}", e);
            app.report(&e);
        }
    }
}

/// Replace the local collection with the cloud copy
async fn pull(app: &mut App, manager: &mut EntryManager) {
    match manager.sync_from_cloud().await {
        Ok(count) => {
            app.refresh(manager);
            app.set_status(format!("Synced {} entries", count));
        }
        Err(e) => {
            warn!("Pull failed: {}", e);
            app.refresh(manager);
            app.set_status(format!("Sync failed: {}", e.user_message()));
        }
    }
}

/// Initialize logging for TUI mode
///
/// Only initializes if FJALOR_LOG environment variable is set.
/// Logs to file (config.log_file or default {data_dir}/debug.log).
fn init_tui_logging(config: &Config) {
    let Ok(log_level) = std::env::var("FJALOR_LOG") else {
        return;
    };

    let log_path = config.log_path();

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!(
        "fjalor_core={},fjalor_cli={}",
        log_level, log_level
    ));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("TUI logging initialized to {:?}", log_path);
}
