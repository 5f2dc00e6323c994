//! Application state and logic

use fjalor_core::{
    Entry, EntryDraft, EntryError, EntryId, EntryManager, FormErrors, Speech, SyncStatus,
};

/// Input mode for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Normal navigation mode
    Normal,
    /// Search input (after pressing /)
    Search,
    /// Add/edit form overlay
    Form,
    /// Waiting for y/n on a delete
    ConfirmDelete,
}

/// Field of the entry form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Word,
    Definition,
    Illustration,
}

impl FormField {
    /// Move to the next field (wrapping)
    pub fn next(self) -> Self {
        match self {
            FormField::Word => FormField::Definition,
            FormField::Definition => FormField::Illustration,
            FormField::Illustration => FormField::Word,
        }
    }

    /// Move to the previous field (wrapping)
    pub fn prev(self) -> Self {
        match self {
            FormField::Word => FormField::Illustration,
            FormField::Definition => FormField::Word,
            FormField::Illustration => FormField::Definition,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FormField::Word => "Word",
            FormField::Definition => "Definition",
            FormField::Illustration => "Illustration",
        }
    }
}

/// State of the add/edit overlay
#[derive(Debug, Clone, PartialEq)]
pub struct EntryForm {
    /// `None` when adding
    pub editing: Option<EntryId>,
    pub draft: EntryDraft,
    pub focus: FormField,
    /// Cursor position (in chars) within the focused field
    pub cursor: usize,
    pub errors: FormErrors,
}

impl EntryForm {
    pub fn add() -> Self {
        Self {
            editing: None,
            draft: EntryDraft::default(),
            focus: FormField::Word,
            cursor: 0,
            errors: FormErrors::default(),
        }
    }

    pub fn edit(entry: &Entry) -> Self {
        let draft = EntryDraft::from_entry(entry);
        let cursor = draft.word.chars().count();
        Self {
            editing: Some(entry.id.clone()),
            draft,
            focus: FormField::Word,
            cursor,
            errors: FormErrors::default(),
        }
    }

    pub fn title(&self) -> &'static str {
        if self.editing.is_some() {
            " Edit entry "
        } else {
            " New entry "
        }
    }

    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Word => &self.draft.word,
            FormField::Definition => &self.draft.definition,
            FormField::Illustration => &self.draft.illustration,
        }
    }

    pub fn error(&self, field: FormField) -> Option<&str> {
        match field {
            FormField::Word => self.errors.word.as_deref(),
            FormField::Definition => self.errors.definition.as_deref(),
            FormField::Illustration => self.errors.illustration.as_deref(),
        }
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            FormField::Word => &mut self.draft.word,
            FormField::Definition => &mut self.draft.definition,
            FormField::Illustration => &mut self.draft.illustration,
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
        self.cursor = self.value(self.focus).chars().count();
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.focus.prev();
        self.cursor = self.value(self.focus).chars().count();
    }

    pub fn insert_char(&mut self, c: char) {
        let cursor = self.cursor;
        insert_at(self.focused_mut(), cursor, c);
        self.cursor += 1;
    }

    pub fn delete_char(&mut self) {
        if self.cursor > 0 {
            let cursor = self.cursor;
            remove_at(self.focused_mut(), cursor - 1);
            self.cursor -= 1;
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        if self.cursor < self.value(self.focus).chars().count() {
            self.cursor += 1;
        }
    }

    /// Validate the fields; errors are kept for display
    pub fn check(&mut self) -> bool {
        match self.draft.check_form() {
            Ok(()) => {
                self.errors = FormErrors::default();
                true
            }
            Err(errors) => {
                self.errors = errors;
                false
            }
        }
    }
}

/// Sync status indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncIndicator {
    /// Cloud mode, last operation succeeded
    Synced,
    /// Pull in progress
    Syncing,
    /// Sync not configured
    Disabled,
    /// Last sync failed
    Error,
}

impl From<&SyncStatus> for SyncIndicator {
    fn from(status: &SyncStatus) -> Self {
        match status {
            SyncStatus::Disabled => SyncIndicator::Disabled,
            SyncStatus::Syncing => SyncIndicator::Syncing,
            SyncStatus::Ready => SyncIndicator::Synced,
            SyncStatus::Error(_) => SyncIndicator::Error,
        }
    }
}

/// Application state
pub struct App {
    /// Whether the app should exit
    pub should_quit: bool,
    /// Current input mode
    pub input_mode: InputMode,
    /// Search input buffer
    pub search_input: String,
    /// Cursor position in search input
    pub search_cursor: usize,
    /// Open add/edit form
    pub form: Option<EntryForm>,
    /// Ids of the visible entries, in display order
    pub visible: Vec<EntryId>,
    /// Currently selected row
    pub list_index: usize,
    /// Scroll offset for detail pane
    pub detail_scroll: u16,
    /// Status message to display temporarily
    pub status_message: Option<String>,
    /// When the status message was set (for auto-dismiss)
    pub status_message_time: Option<std::time::Instant>,
    /// Modal error message
    pub error_message: Option<String>,
    /// Whether help overlay is visible
    pub show_help: bool,
    /// Sync status indicator
    pub sync_status: SyncIndicator,
    /// Pending 'g' keypress for gg sequence (with timestamp)
    pub pending_g: Option<std::time::Instant>,
    pub speech: Speech,
}

impl App {
    /// Create a new app over the manager's current collection
    pub fn new(manager: &mut EntryManager, speech: Speech) -> Self {
        let mut app = Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            search_input: manager.search().to_string(),
            search_cursor: manager.search().chars().count(),
            form: None,
            visible: Vec::new(),
            list_index: 0,
            detail_scroll: 0,
            status_message: None,
            status_message_time: None,
            error_message: None,
            show_help: false,
            sync_status: SyncIndicator::from(manager.sync_status()),
            pending_g: None,
            speech,
        };
        app.refresh(manager);
        app
    }

    /// Recompute the visible list, keeping the selection where possible
    ///
    /// The manager's selection wins so that a freshly added entry is shown.
    pub fn refresh(&mut self, manager: &mut EntryManager) {
        let keep = manager
            .selected_id()
            .cloned()
            .or_else(|| self.current_id().cloned());

        self.visible = manager
            .visible_entries()
            .into_iter()
            .map(|e| e.id.clone())
            .collect();

        if let Some(pos) = keep
            .as_ref()
            .and_then(|id| self.visible.iter().position(|v| v == id))
        {
            self.list_index = pos;
        } else if self.list_index >= self.visible.len() {
            self.list_index = self.visible.len().saturating_sub(1);
        }

        self.sync_status = SyncIndicator::from(manager.sync_status());
        self.select_current(manager);
    }

    /// Push the highlighted row into the manager's selection
    pub fn select_current(&self, manager: &mut EntryManager) {
        manager.select(self.current_id());
    }

    /// Get the currently highlighted entry id
    pub fn current_id(&self) -> Option<&EntryId> {
        self.visible.get(self.list_index)
    }

    /// Set a status message (will auto-dismiss after 3 seconds)
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_message_time = Some(std::time::Instant::now());
    }

    /// Check and clear expired status message
    pub fn check_status_timeout(&mut self) {
        if let Some(time) = self.status_message_time {
            if time.elapsed() > std::time::Duration::from_secs(3) {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    /// Report a failed entry operation in the status bar
    pub fn report(&mut self, error: &EntryError) {
        self.set_status(error.user_message());
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    pub fn has_error(&self) -> bool {
        self.error_message.is_some()
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    /// Toggle help overlay
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn move_up(&mut self) {
        if self.list_index > 0 {
            self.list_index -= 1;
            self.detail_scroll = 0;
        }
    }

    pub fn move_down(&mut self) {
        if self.list_index < self.visible.len().saturating_sub(1) {
            self.list_index += 1;
            self.detail_scroll = 0;
        }
    }

    /// Move selection to the first entry (vim 'gg')
    pub fn move_to_first(&mut self) {
        self.list_index = 0;
        self.detail_scroll = 0;
    }

    /// Move selection to the last entry (vim 'G')
    pub fn move_to_last(&mut self) {
        self.list_index = self.visible.len().saturating_sub(1);
        self.detail_scroll = 0;
    }

    pub fn scroll_detail_down(&mut self) {
        self.detail_scroll = self.detail_scroll.saturating_add(1);
    }

    pub fn scroll_detail_up(&mut self) {
        self.detail_scroll = self.detail_scroll.saturating_sub(1);
    }

    pub fn enter_search_mode(&mut self) {
        self.input_mode = InputMode::Search;
        self.search_cursor = self.search_input.chars().count();
    }

    /// Open the form for a new entry
    pub fn open_add_form(&mut self) {
        self.form = Some(EntryForm::add());
        self.input_mode = InputMode::Form;
    }

    /// Open the form pre-filled with an entry
    pub fn open_edit_form(&mut self, entry: &Entry) {
        self.form = Some(EntryForm::edit(entry));
        self.input_mode = InputMode::Form;
    }

    pub fn close_form(&mut self) {
        self.form = None;
        self.input_mode = InputMode::Normal;
    }

    pub fn exit_input_mode(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn insert_char(&mut self, c: char) {
        insert_at(&mut self.search_input, self.search_cursor, c);
        self.search_cursor += 1;
    }

    pub fn delete_char(&mut self) {
        if self.search_cursor > 0 {
            remove_at(&mut self.search_input, self.search_cursor - 1);
            self.search_cursor -= 1;
        }
    }

    pub fn cursor_left(&mut self) {
        self.search_cursor = self.search_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        if self.search_cursor < self.search_input.chars().count() {
            self.search_cursor += 1;
        }
    }

    /// Apply the search buffer to the manager and refresh the list
    pub fn apply_search(&mut self, manager: &mut EntryManager) {
        manager.set_search(self.search_input.clone());
        self.list_index = 0;
        self.refresh(manager);
    }

    /// Clear the search
    pub fn clear_search(&mut self, manager: &mut EntryManager) {
        self.search_input.clear();
        self.search_cursor = 0;
        self.apply_search(manager);
    }

    /// Switch between alphabetical and newest-first
    pub fn toggle_sort(&mut self, manager: &mut EntryManager) {
        let order = manager.sort_order().toggled();
        manager.set_sort_order(order);
        self.refresh(manager);
        self.set_status(format!("Sorted {}", order));
    }
}

fn byte_offset(s: &str, char_index: usize) -> usize {
    s.char_indices()
        .nth(char_index)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn insert_at(s: &mut String, char_index: usize, c: char) {
    let at = byte_offset(s, char_index);
    s.insert(at, c);
}

fn remove_at(s: &mut String, char_index: usize) {
    let at = byte_offset(s, char_index);
    if at < s.len() {
        s.remove(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fjalor_core::{LocalEntryStore, LocalStore, SortOrder};
    use tempfile::TempDir;

    async fn manager_with(temp_dir: &TempDir, words: &[&str]) -> EntryManager {
        let local = LocalStore::new(temp_dir.path().join("digital_dictionary_v1.json"));
        let mut manager = EntryManager::with_store(local, Box::new(LocalEntryStore));
        for word in words {
            manager
                .add(EntryDraft::new(*word, "definition", "illustration"))
                .await
                .unwrap();
        }
        manager
    }

    fn silent_speech() -> Speech {
        Speech::with_backend(None, None, Vec::new())
    }

    #[test]
    fn test_form_field_cycle() {
        assert_eq!(FormField::Word.next(), FormField::Definition);
        assert_eq!(FormField::Illustration.next(), FormField::Word);
        assert_eq!(FormField::Word.prev(), FormField::Illustration);
    }

    #[test]
    fn test_form_editing_multibyte() {
        let mut form = EntryForm::add();
        for c in "çka".chars() {
            form.insert_char(c);
        }
        form.cursor_left();
        form.cursor_left();
        form.delete_char();
        assert_eq!(form.draft.word, "ka");
        form.insert_char('ë');
        assert_eq!(form.draft.word, "ëka");
    }

    #[test]
    fn test_form_check_keeps_errors() {
        let mut form = EntryForm::add();
        form.draft.word = "mace".to_string();
        assert!(!form.check());
        assert!(form.error(FormField::Word).is_none());
        assert_eq!(
            form.error(FormField::Definition),
            Some("Definition is required.")
        );

        form.draft.definition = "animal".to_string();
        form.draft.illustration = "Macja fle.".to_string();
        assert!(form.check());
        assert!(form.errors.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_follows_manager_selection() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_with(&temp_dir, &["qen", "mace", "zog"]).await;
        let mut app = App::new(&mut manager, silent_speech());

        // The last added entry is selected
        assert_eq!(app.visible.len(), 3);
        assert_eq!(app.list_index, 2);

        app.move_to_first();
        app.select_current(&mut manager);
        assert_eq!(manager.selected_entry().unwrap().word, "mace");

        app.toggle_sort(&mut manager);
        assert_eq!(manager.sort_order(), SortOrder::Newest);
        assert_eq!(app.current_id(), manager.find_by_word("mace").map(|e| &e.id));
    }

    #[tokio::test]
    async fn test_search_narrows_list() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_with(&temp_dir, &["mace", "macja", "qen"]).await;
        let mut app = App::new(&mut manager, silent_speech());

        app.enter_search_mode();
        for c in "mac".chars() {
            app.insert_char(c);
        }
        app.apply_search(&mut manager);
        assert_eq!(app.visible.len(), 2);

        app.clear_search(&mut manager);
        assert_eq!(app.visible.len(), 3);
    }

    #[test]
    fn test_sync_indicator_from_status() {
        assert_eq!(
            SyncIndicator::from(&SyncStatus::Error("down".to_string())),
            SyncIndicator::Error
        );
        assert_eq!(SyncIndicator::from(&SyncStatus::Ready), SyncIndicator::Synced);
    }
}
