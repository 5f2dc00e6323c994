//! Sync command handler

use anyhow::{bail, Result};

use fjalor_core::{EntryError, EntryManager};

use crate::output::Output;

/// Pull the full collection from the cloud, replacing local entries
pub async fn sync(manager: &mut EntryManager, output: &Output) -> Result<()> {
    if manager.is_cloud() {
        output.message("Fetching entries from the cloud...");
    }

    match manager.sync_from_cloud().await {
        Ok(count) => {
            output.success(&format!("Sync complete - {} entries", count));
            Ok(())
        }
        Err(EntryError::NotConfigured) => bail!(
            "Cloud sync is not configured. Set it with:\n  \
             fjalor config set api_base_url https://your-dictionary.example.com"
        ),
        Err(e) => {
            output.message(&format!("Sync failed: {}", e));
            Err(e.into())
        }
    }
}

/// Sync quietly (for auto-sync) - no output on success
///
/// Does nothing in local mode.
pub async fn sync_quiet(manager: &mut EntryManager) -> Result<(), EntryError> {
    if !manager.is_cloud() {
        return Ok(());
    }
    manager.sync_from_cloud().await.map(|_| ())
}
