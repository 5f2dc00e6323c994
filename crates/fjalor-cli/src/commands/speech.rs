//! Speech command handlers

use anyhow::{bail, Context, Result};

use fjalor_core::{Config, EntryManager, Speech};

use super::entry::resolve_entry;
use crate::output::Output;

/// Pronounce an entry and wait for playback to finish
pub fn speak(manager: &EntryManager, config: &Config, key: String, output: &Output) -> Result<()> {
    let id = resolve_entry(manager, &key)?;
    let Some(entry) = manager.get(&id) else {
        bail!("Entry not found: {}", key);
    };

    let mut speech = Speech::new(&config.speech);
    speech
        .pronounce(entry)
        .with_context(|| format!("Failed to pronounce '{}'", entry.word))?;

    output.message(&format!("Speaking: {}", entry.word));
    speech.wait().context("Playback failed")?;

    Ok(())
}

/// List the voices offered by the host speech engine
pub fn voices(config: &Config, output: &Output) -> Result<()> {
    let speech = Speech::new(&config.speech);

    if !speech.is_supported() {
        bail!(
            "No speech engine found. Install one of:\n  \
             espeak-ng, espeak, speech-dispatcher (spd-say), or use macOS `say`"
        );
    }

    output.print_voices(speech.voices(), speech.selected_voice());
    Ok(())
}
