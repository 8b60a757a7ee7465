//! Config command - manage configuration.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use confab_store::{
    AppConfig, SETTING_KEYS, SettingsStore, default_config_dir, default_config_path,
    default_data_dir, default_history_path, default_settings_path, default_transcripts_dir,
};
use tracing::info;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Set a connection or chat setting.
    Set {
        /// Setting name, e.g. `api_url` or `temperature`.
        key: String,
        /// New value.
        value: String,
    },

    /// Reset to defaults.
    Reset,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli).await,
        ConfigAction::Path => show_paths(cli),
        ConfigAction::Set { key, value } => set_value(key, value, cli).await,
        ConfigAction::Reset => reset_config(cli).await,
    }
}

async fn show_config(cli: &Cli) -> Result<()> {
    let config = AppConfig::load()?;
    let settings = SettingsStore::load_default().await?.get().await;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_settings(&settings, &config));
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "connection": config,
                "chat": settings,
            });
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    Ok(())
}

fn show_paths(cli: &Cli) -> Result<()> {
    let paths = [
        ("Config dir", "config_dir", default_config_dir()),
        ("Config file", "config_file", default_config_path()),
        ("Settings file", "settings_file", default_settings_path()),
        ("Data dir", "data_dir", default_data_dir()),
        ("History file", "history_file", default_history_path()),
        ("Transcripts", "transcripts_dir", default_transcripts_dir()),
    ];

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            for (label, _, path) in &paths {
                println!("{:<15}{}", format!("{label}:"), path.display());
            }
        }
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> = paths
                .iter()
                .map(|(_, key, path)| ((*key).to_string(), path.display().to_string().into()))
                .collect();
            println!("{}", JsonFormatter::new(cli.pretty).format(&map)?);
        }
    }

    Ok(())
}

async fn set_value(key: &str, value: &str, cli: &Cli) -> Result<()> {
    if AppConfig::KEYS.contains(&key) {
        // Environment overrides are not written back.
        let path = AppConfig::default_path();
        let mut config = AppConfig::load_from(&path)?;
        config.set(key, value)?;
        config.save_to(&path)?;
    } else if SETTING_KEYS.contains(&key) || key == "format" || key == "stream" {
        SettingsStore::load_default().await?.set(key, value).await?;
    } else {
        bail!(
            "Unknown key: {key}. Connection keys: {}. Chat keys: {}",
            AppConfig::KEYS.join(", "),
            SETTING_KEYS.join(", ")
        );
    }

    info!(key, "Configuration updated");
    if cli.format == OutputFormat::Text && !cli.quiet {
        println!("{key} = {value}");
    }
    Ok(())
}

async fn reset_config(cli: &Cli) -> Result<()> {
    let mut removed = false;
    for path in [default_config_path(), default_settings_path()] {
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
            info!(path = %path.display(), "Configuration reset");
            removed = true;
        }
    }

    if cli.format == OutputFormat::Text && !cli.quiet {
        if removed {
            println!("Configuration reset to defaults");
        } else {
            println!("No configuration file to reset");
        }
    }

    Ok(())
}
