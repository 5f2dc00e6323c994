//! Entry command handlers

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use fjalor_core::speech::{encode_data_url, mime_for_extension};
use fjalor_core::{EntryDraft, EntryId, EntryManager, SortOrder};

use crate::editor::{confirm, edit_text, is_interactive, prompt_with_default};
use crate::output::Output;

/// Field changes requested on the command line
#[derive(Debug, Default)]
pub struct EntryChanges {
    pub word: Option<String>,
    pub definition: Option<String>,
    pub illustration: Option<String>,
    pub recording: Option<PathBuf>,
    pub clear_recording: bool,
}

impl EntryChanges {
    fn is_empty(&self) -> bool {
        self.word.is_none()
            && self.definition.is_none()
            && self.illustration.is_none()
            && self.recording.is_none()
            && !self.clear_recording
    }
}

/// Add a new entry
pub async fn add(
    manager: &mut EntryManager,
    word: String,
    definition: Option<String>,
    illustration: Option<String>,
    recording: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let definition = match definition {
        Some(d) => d,
        None if is_interactive() => edit_text(&format!("Definition for '{}'", word.trim()), "")?,
        None => bail!("--definition is required when not running interactively"),
    };
    let illustration = match illustration {
        Some(i) => i,
        None if is_interactive() => prompt_with_default("Illustration", "")?.unwrap_or_default(),
        None => bail!("--illustration is required when not running interactively"),
    };
    let recording = recording.as_deref().map(read_recording).transpose()?;

    let draft = EntryDraft::new(word, definition, illustration).with_recording(recording);
    draft.check_form()?;

    let entry = manager.add(draft).await.context("Failed to add entry")?;

    output.success(&format!("Added: {}", entry.word));
    output.print_entry(&entry);

    Ok(())
}

/// List entries in the requested order
pub fn list(
    manager: &mut EntryManager,
    sort: SortOrder,
    search: Option<String>,
    output: &Output,
) -> Result<()> {
    manager.set_sort_order(sort);
    manager.set_search(search.unwrap_or_default());

    output.print_entries(&manager.visible_entries());
    Ok(())
}

/// Show a single entry
pub fn show(manager: &EntryManager, key: String, output: &Output) -> Result<()> {
    let id = resolve_entry(manager, &key)?;
    let entry = manager
        .get(&id)
        .ok_or_else(|| anyhow::anyhow!("Entry not found: {}", key))?;

    output.print_entry(entry);
    Ok(())
}

/// Edit an entry, from flags or interactively
pub async fn edit(
    manager: &mut EntryManager,
    key: String,
    changes: EntryChanges,
    output: &Output,
) -> Result<()> {
    let id = resolve_entry(manager, &key)?;
    let entry = manager
        .get(&id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Entry not found: {}", key))?;

    let mut draft = EntryDraft::from_entry(&entry);

    if changes.is_empty() {
        if !is_interactive() {
            bail!("Nothing to change. Pass --word, --definition, --illustration or --recording.");
        }

        // Interactive editing
        println!("Editing entry: {}", entry.id);
        println!("Press Enter to keep current value, or type new value.\n");

        if let Some(word) = prompt_with_default("Word", &draft.word)? {
            draft.word = word;
        }
        if let Some(definition) = prompt_with_default("Definition", &draft.definition)? {
            draft.definition = definition;
        }
        if let Some(illustration) = prompt_with_default("Illustration", &draft.illustration)? {
            draft.illustration = illustration;
        }
    } else {
        if let Some(word) = changes.word {
            draft.word = word;
        }
        if let Some(definition) = changes.definition {
            draft.definition = definition;
        }
        if let Some(illustration) = changes.illustration {
            draft.illustration = illustration;
        }
        if changes.clear_recording {
            draft.recording = None;
        } else if let Some(path) = changes.recording {
            draft.recording = Some(read_recording(&path)?);
        }
    }

    draft.check_form()?;

    let updated = manager
        .update(&id, draft)
        .await
        .context("Failed to update entry")?;

    output.success("Entry updated");
    output.print_entry(&updated);

    Ok(())
}

/// Delete an entry
pub async fn delete(
    manager: &mut EntryManager,
    key: String,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let id = resolve_entry(manager, &key)?;

    if output.should_prompt() && !yes {
        if let Some(entry) = manager.get(&id) {
            println!("Delete entry: {} - {}", entry.id.short(), entry.word);
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    manager
        .remove(&id)
        .await
        .context("Failed to delete entry")?;

    output.success(&format!("Deleted entry: {}", id));

    Ok(())
}

/// Resolve an entry key: full id, word, or unique id prefix
pub fn resolve_entry(manager: &EntryManager, key: &str) -> Result<EntryId> {
    let id = EntryId::from(key);
    if manager.get(&id).is_some() {
        return Ok(id);
    }

    if let Some(entry) = manager.find_by_word(key) {
        return Ok(entry.id.clone());
    }

    let matches: Vec<_> = manager
        .entries()
        .iter()
        .filter(|e| !key.is_empty() && e.id.as_str().starts_with(key))
        .collect();

    match matches.len() {
        0 => bail!("No entry found matching: {}", key),
        1 => Ok(matches[0].id.clone()),
        _ => {
            eprintln!("Multiple entries match '{}':", key);
            for entry in &matches {
                eprintln!("  {} - {}", entry.id, entry.word);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

/// Read an audio file into a data URL
fn read_recording(path: &Path) -> Result<String> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read recording: {:?}", path))?;
    if bytes.is_empty() {
        bail!("Recording file is empty: {:?}", path);
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    Ok(encode_data_url(mime_for_extension(ext), &bytes))
}
