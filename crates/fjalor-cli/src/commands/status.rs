//! Status command handler

use anyhow::Result;

use fjalor_core::speech::SpeechBackend;
use fjalor_core::{Config, EntryManager};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(manager: &EntryManager, config: &Config, output: &Output) -> Result<()> {
    let recordings = manager
        .entries()
        .iter()
        .filter(|e| e.has_recording())
        .count();
    let backend = SpeechBackend::detect();
    let store_path = manager.local_store().path();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "mode": manager.mode().to_string(),
                    "api_base_url": config.api_base_url,
                    "sync_status": manager.sync_status().to_string(),
                    "storage": {
                        "path": store_path,
                        "exists": manager.local_store().exists(),
                    },
                    "counts": {
                        "entries": manager.len(),
                        "recordings": recordings
                    },
                    "speech": backend.map(|b| b.program())
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", manager.len());
        }
        OutputFormat::Human => {
            println!("Fjalor Status");
            println!("=============");
            println!();
            println!("Mode:");
            println!("  Store:  {}", manager.mode());
            if let Some(ref url) = config.api_base_url {
                println!("  Server: {}", url);
            }
            println!("  Sync:   {}", manager.sync_status());
            println!();
            println!("Storage:");
            println!("  Location: {}", store_path.display());
            println!();
            println!("Contents:");
            println!("  Entries:    {}", manager.len());
            println!("  Recordings: {}", recordings);
            println!();
            println!(
                "Speech: {}",
                backend.map(|b| b.program()).unwrap_or("not available")
            );
        }
    }

    Ok(())
}
