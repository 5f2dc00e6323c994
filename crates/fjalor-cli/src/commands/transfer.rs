//! Import and export command handlers

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};

use fjalor_core::models::parse_import_document;
use fjalor_core::{EntryManager, ImportStrategy};

use crate::output::Output;

/// Default export file name
pub const DEFAULT_EXPORT_FILE: &str = "digital-dictionary-export.json";

/// Import entries from a JSON export (`-` reads stdin)
pub fn import(
    manager: &mut EntryManager,
    file: String,
    strategy: ImportStrategy,
    output: &Output,
) -> Result<()> {
    let text = if file == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        fs::read_to_string(&file).with_context(|| format!("Failed to read {}", file))?
    };

    let items = parse_import_document(&text)?;
    let summary = manager.import_batch(items, strategy);

    output.print_import_summary(&summary);
    if manager.is_cloud() {
        output.warn("Imported entries are stored locally only and will be replaced on the next sync.");
    }

    Ok(())
}

/// Export all entries as pretty-printed JSON (`-` writes stdout)
pub fn export(manager: &EntryManager, file: Option<String>, output: &Output) -> Result<()> {
    let json = manager.export_json();
    let file = file.unwrap_or_else(|| DEFAULT_EXPORT_FILE.to_string());

    if file == "-" {
        println!("{}", json);
        return Ok(());
    }

    let path = Path::new(&file);
    fs::write(path, json).with_context(|| format!("Failed to write {}", file))?;

    output.success(&format!(
        "Exported {} entries to {}",
        manager.len(),
        path.display()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use fjalor_core::{EntryDraft, LocalEntryStore, LocalStore};
    use tempfile::TempDir;

    fn manager(dir: &Path) -> EntryManager {
        let local = LocalStore::new(dir.join("digital_dictionary_v1.json"));
        EntryManager::with_store(local, Box::new(LocalEntryStore))
    }

    #[tokio::test]
    async fn test_export_then_import() {
        let source_dir = TempDir::new().unwrap();
        let mut source = manager(source_dir.path());
        source
            .add(EntryDraft::new("mace", "animal", "Macja po fle."))
            .await
            .unwrap();

        let output = Output::new(OutputFormat::Quiet);
        let export_path = source_dir.path().join("export.json");
        export(
            &source,
            Some(export_path.display().to_string()),
            &output,
        )
        .unwrap();

        let target_dir = TempDir::new().unwrap();
        let mut target = manager(target_dir.path());
        import(
            &mut target,
            export_path.display().to_string(),
            ImportStrategy::Skip,
            &output,
        )
        .unwrap();

        assert_eq!(target.entries(), source.entries());
    }

    #[test]
    fn test_import_rejects_wrong_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"version": 1, "entries": {}}"#).unwrap();

        let mut target = manager(dir.path());
        let output = Output::new(OutputFormat::Quiet);
        let err = import(
            &mut target,
            path.display().to_string(),
            ImportStrategy::Skip,
            &output,
        )
        .unwrap_err();

        assert!(err.to_string().contains("Invalid file format"));
        assert!(target.is_empty());
    }
}
