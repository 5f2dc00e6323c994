//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::json;

use fjalor_core::speech::Voice;
use fjalor_core::{Entry, ImportSummary};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single entry
    pub fn print_entry(&self, entry: &Entry) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:           {}", entry.id);
                println!("Word:         {}", entry.word);
                println!("Definition:   {}", entry.definition);
                if !entry.illustration.is_empty() {
                    println!("Illustration: {}", entry.illustration);
                }
                println!(
                    "Recording:    {}",
                    if entry.has_recording() { "yes" } else { "no" }
                );
                println!("Created:      {}", format_millis(entry.created_at));
                println!("Updated:      {}", format_millis(entry.updated_at));
            }
            OutputFormat::Json => print_json(&entry_json(entry)),
            OutputFormat::Quiet => println!("{}", entry.id),
        }
    }

    /// Print a list of entries
    pub fn print_entries(&self, entries: &[&Entry]) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No entries found.");
                    return;
                }
                for entry in entries {
                    let recording = if entry.has_recording() { " ♪" } else { "" };
                    println!(
                        "{} | {}{} | {}",
                        entry.id.short(),
                        truncate(&entry.word, 24),
                        recording,
                        truncate_line(&entry.definition, 50)
                    );
                }
                println!("\n{} entr{}", entries.len(), plural_y(entries.len()));
            }
            OutputFormat::Json => {
                let items: Vec<_> = entries.iter().map(|e| entry_json(e)).collect();
                print_json(&items);
            }
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.id);
                }
            }
        }
    }

    /// Print the outcome of an import
    pub fn print_import_summary(&self, summary: &ImportSummary) {
        match self.format {
            OutputFormat::Human => println!("✓ Import complete: {}", summary),
            OutputFormat::Json => print_json(summary),
            OutputFormat::Quiet => {}
        }
    }

    /// Print available voices, marking the selected one
    pub fn print_voices(&self, voices: &[Voice], selected: Option<&Voice>) {
        match self.format {
            OutputFormat::Human => {
                if voices.is_empty() {
                    println!("No voices found.");
                    return;
                }
                for voice in voices {
                    let marker = if Some(voice) == selected { "*" } else { " " };
                    println!("{} {:<24} {}", marker, truncate(&voice.name, 24), voice.lang);
                }
                println!("\n{} voice(s)", voices.len());
            }
            OutputFormat::Json => {
                let items: Vec<_> = voices
                    .iter()
                    .map(|v| {
                        json!({
                            "id": v.id,
                            "name": v.name,
                            "lang": v.lang,
                            "selected": Some(v) == selected,
                        })
                    })
                    .collect();
                print_json(&items);
            }
            OutputFormat::Quiet => {
                for voice in voices {
                    println!("{}", voice.id);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!("{}", json!({"status": "success", "message": message}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (suppressed in quiet mode)
    pub fn warn(&self, message: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", message);
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// JSON view of an entry; the recording payload is reduced to a flag
fn entry_json(entry: &Entry) -> serde_json::Value {
    json!({
        "id": entry.id,
        "word": entry.word,
        "definition": entry.definition,
        "illustration": entry.illustration,
        "hasRecording": entry.has_recording(),
        "createdAt": entry.created_at,
        "updatedAt": entry.updated_at,
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to render JSON: {}", e),
    }
}

fn plural_y(count: usize) -> &'static str {
    if count == 1 {
        "y"
    } else {
        "ies"
    }
}

/// Format a millisecond timestamp in local time
pub fn format_millis(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Truncate a string to max characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
pub fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fjalor_core::EntryDraft;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        // Multi-byte characters count as one
        assert_eq!(truncate("çelësçelës", 8), "çelës...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("single line", 20), "single line");
        assert_eq!(truncate_line("line one\nline two", 20), "line one");
        assert_eq!(
            truncate_line("very long single line here", 10),
            "very lo..."
        );
    }

    #[test]
    fn test_entry_json_hides_recording() {
        let entry = Entry::new(
            EntryDraft::new("mace", "animal", "Macja.")
                .with_recording(Some("data:audio/webm;base64,AAAA".to_string())),
        );
        let value = entry_json(&entry);
        assert_eq!(value["hasRecording"], true);
        assert!(value.get("recording").is_none());
        assert_eq!(value["word"], "mace");
    }

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(i64::MAX), "-");
        assert_eq!(format_millis(0).len(), "1970-01-01 00:00".len());
    }
}
