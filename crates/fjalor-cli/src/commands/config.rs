//! Config command handlers

use anyhow::{bail, Context, Result};

use fjalor_core::Config;

use crate::output::{Output, OutputFormat};

const VALID_KEYS: &str =
    "data_dir, api_base_url, passphrase, log_file, speech.voice, speech.rate, speech.pitch";

/// Show current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let passphrase = config.passphrase.as_deref().map(mask);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "api_base_url": config.api_base_url,
                    "passphrase": passphrase,
                    "log_file": config.log_file,
                    "speech": {
                        "voice": config.speech.voice,
                        "rate": config.speech.rate,
                        "pitch": config.speech.pitch
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:     {}", config.data_dir.display());
            println!(
                "  api_base_url: {}",
                config.api_base_url.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  passphrase:   {}",
                passphrase.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  log_file:     {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!(
                "  speech.voice: {}",
                config.speech.voice.as_deref().unwrap_or("(default)")
            );
            println!("  speech.rate:  {}", config.speech.rate);
            println!("  speech.pitch: {}", config.speech.pitch);
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;

    apply(&mut config, &key, Some(&value))?;

    config.save().context("Failed to save configuration")?;

    let shown = if key == "passphrase" {
        mask(&value)
    } else {
        value
    };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

/// Clear an optional configuration value
pub fn unset(key: String, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;

    apply(&mut config, &key, None)?;

    config.save().context("Failed to save configuration")?;

    output.success(&format!("Unset {}", key));

    Ok(())
}

/// Apply a key change; `None` resets the key
fn apply(config: &mut Config, key: &str, value: Option<&str>) -> Result<()> {
    let optional = |v: Option<&str>| {
        v.map(str::trim)
            .filter(|v| !v.is_empty() && *v != "none")
            .map(str::to_string)
    };

    match key {
        "data_dir" => match value {
            Some(v) => config.data_dir = v.into(),
            None => bail!("data_dir cannot be unset"),
        },
        "api_base_url" => {
            config.api_base_url = optional(value);
        }
        "passphrase" => {
            config.passphrase = optional(value);
        }
        "log_file" => {
            config.log_file = optional(value).map(Into::into);
        }
        "speech.voice" => {
            config.speech.voice = optional(value);
        }
        "speech.rate" => {
            config.speech.rate = match value {
                Some(v) => v
                    .parse()
                    .context("Invalid value for speech.rate. Use a number like 1.0")?,
                None => 1.0,
            };
        }
        "speech.pitch" => {
            config.speech.pitch = match value {
                Some(v) => v
                    .parse()
                    .context("Invalid value for speech.pitch. Use a number like 1.0")?,
                None => 1.0,
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: {}",
                key,
                VALID_KEYS
            );
        }
    }

    Ok(())
}

/// Hide all but the first two characters of a secret
fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(2).collect();
    format!("{}{}", visible, "*".repeat(secret.chars().count().saturating_sub(2)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_optional_keys() {
        let mut config = Config::default();

        apply(&mut config, "api_base_url", Some("https://dict.example.com")).unwrap();
        assert_eq!(
            config.api_base_url.as_deref(),
            Some("https://dict.example.com")
        );
        assert!(config.cloud().is_some());

        apply(&mut config, "api_base_url", Some("none")).unwrap();
        assert!(config.api_base_url.is_none());

        apply(&mut config, "passphrase", Some("sekret")).unwrap();
        apply(&mut config, "passphrase", None).unwrap();
        assert!(config.passphrase.is_none());
    }

    #[test]
    fn test_apply_speech_keys() {
        let mut config = Config::default();

        apply(&mut config, "speech.rate", Some("1.5")).unwrap();
        assert_eq!(config.speech.rate, 1.5);
        assert!(apply(&mut config, "speech.pitch", Some("loud")).is_err());

        apply(&mut config, "speech.rate", None).unwrap();
        assert_eq!(config.speech.rate, 1.0);
    }

    #[test]
    fn test_apply_rejects_unknown_key() {
        let mut config = Config::default();
        let err = apply(&mut config, "sync_url", Some("x")).unwrap_err();
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(apply(&mut config, "data_dir", None).is_err());
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("sekret"), "se****");
        assert_eq!(mask("a"), "a");
    }
}
