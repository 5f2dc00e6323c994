//! Fjalor CLI
//!
//! Command-line interface for Fjalor - a personal dictionary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fjalor_core::{Config, EntryManager, ImportStrategy, SortOrder};

mod commands;
mod editor;
mod output;
mod tui;

use commands::entry::EntryChanges;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "fjalor")]
#[command(about = "Fjalor - a personal dictionary with optional cloud sync")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the TUI interface
    Tui,
    /// Add a new entry
    Add {
        /// The word
        word: String,
        /// What the word means (opens editor if not provided)
        #[arg(short, long)]
        definition: Option<String>,
        /// Example sentence using the word
        #[arg(short, long)]
        illustration: Option<String>,
        /// Audio file with a recorded pronunciation
        #[arg(short, long)]
        recording: Option<PathBuf>,
    },
    /// List entries
    #[command(alias = "ls")]
    List {
        /// Sort order (alphabetical, newest)
        #[arg(short, long, default_value = "alphabetical")]
        sort: SortOrder,
        /// Only show words containing this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Show entry details
    Show {
        /// Entry ID (full or prefix) or word
        key: String,
    },
    /// Edit an entry (prompts when no field flag is given)
    Edit {
        /// Entry ID (full or prefix) or word
        key: String,
        #[arg(long)]
        word: Option<String>,
        #[arg(long)]
        definition: Option<String>,
        #[arg(long)]
        illustration: Option<String>,
        /// Replace the recording with this audio file
        #[arg(long, conflicts_with = "clear_recording")]
        recording: Option<PathBuf>,
        /// Remove the recording
        #[arg(long)]
        clear_recording: bool,
    },
    /// Delete an entry
    #[command(alias = "rm")]
    Delete {
        /// Entry ID (full or prefix) or word
        key: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Import entries from a JSON export
    Import {
        /// File to import (`-` for stdin)
        file: String,
        /// How to handle words that already exist (skip, overwrite, keep-both)
        #[arg(short, long, default_value = "skip")]
        strategy: ImportStrategy,
    },
    /// Export all entries as JSON
    Export {
        /// Output file (`-` for stdout)
        file: Option<String>,
    },
    /// Replace local entries with the cloud copy
    Sync,
    /// Pronounce an entry
    Speak {
        /// Entry ID (full or prefix) or word
        key: String,
    },
    /// List available text-to-speech voices
    Voices,
    /// Show status (mode, sync status, counts)
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, api_base_url, passphrase, log_file, speech.*)
        key: String,
        /// Configuration value
        value: String,
    },
    /// Clear a configuration value
    Unset {
        /// Configuration key
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Commands that don't need the manager
    match &cli.command {
        Some(Commands::Config { command }) => {
            init_cli_logging();
            return handle_config_command(command.clone(), &output);
        }
        Some(Commands::Voices) => {
            init_cli_logging();
            let config = Config::load().context("Failed to load configuration")?;
            return commands::speech::voices(&config, &output);
        }
        _ => {}
    }

    let config = Config::load().context("Failed to load configuration")?;

    // Handle TUI (default when no command given)
    let Some(command) = cli.command else {
        return tui::run(config).await;
    };
    if matches!(command, Commands::Tui) {
        return tui::run(config).await;
    }

    init_cli_logging();

    let mut manager = EntryManager::open(&config)?;

    // Refresh from the cloud before anything that reads the collection.
    // Import is local-only and sync does its own pull.
    let needs_refresh = !matches!(command, Commands::Sync | Commands::Import { .. });
    if needs_refresh {
        auto_sync(&mut manager, &output).await;
    }

    match command {
        Commands::Tui | Commands::Config { .. } | Commands::Voices => unreachable!(), // Handled above
        Commands::Add {
            word,
            definition,
            illustration,
            recording,
        } => {
            commands::entry::add(
                &mut manager,
                word,
                definition,
                illustration,
                recording,
                &output,
            )
            .await
        }
        Commands::List { sort, search } => {
            commands::entry::list(&mut manager, sort, search, &output)
        }
        Commands::Show { key } => commands::entry::show(&manager, key, &output),
        Commands::Edit {
            key,
            word,
            definition,
            illustration,
            recording,
            clear_recording,
        } => {
            let changes = EntryChanges {
                word,
                definition,
                illustration,
                recording,
                clear_recording,
            };
            commands::entry::edit(&mut manager, key, changes, &output).await
        }
        Commands::Delete { key, yes } => {
            commands::entry::delete(&mut manager, key, yes, &output).await
        }
        Commands::Import { file, strategy } => {
            commands::transfer::import(&mut manager, file, strategy, &output)
        }
        Commands::Export { file } => commands::transfer::export(&manager, file, &output),
        Commands::Sync => commands::sync::sync(&mut manager, &output).await,
        Commands::Speak { key } => commands::speech::speak(&manager, &config, key, &output),
        Commands::Status => commands::status::show(&manager, &config, &output),
    }
}

fn handle_config_command(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(output),
        Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, output),
        Some(ConfigCommands::Unset { key }) => commands::config::unset(key, output),
    }
}

/// Auto-sync in cloud mode, silently handles errors
async fn auto_sync(manager: &mut EntryManager, output: &Output) {
    if let Err(e) = commands::sync::sync_quiet(manager).await {
        output.warn(&format!("Auto-sync failed: {}. Using the local copy.", e));
    }
}

/// Initialize stderr logging for CLI commands
///
/// Only initializes if FJALOR_LOG environment variable is set.
fn init_cli_logging() {
    let Ok(log_level) = std::env::var("FJALOR_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "fjalor_core={},fjalor_cli={}",
        log_level, log_level
    ));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
