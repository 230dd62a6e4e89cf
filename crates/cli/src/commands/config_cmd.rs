//! `chatty config`: Show the effective configuration.

use chatty_config::{AppConfig, load_env_files, redact_secret};
use std::path::PathBuf;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Loading twice is harmless: .env files never override what is set.
    let cwd = std::env::current_dir().unwrap_or_default();
    let env_files = load_env_files(&cwd);
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", render(&config, &config_path, &env_files)?);
    Ok(())
}

/// Render the effective configuration with every secret redacted.
pub fn render(
    config: &AppConfig,
    config_path: &std::path::Path,
    env_files: &[PathBuf],
) -> Result<String, toml::ser::Error> {
    let mut out = String::new();

    let found = if config_path.exists() { "found" } else { "not found, using defaults" };
    out.push_str(&format!("# Config file: {} ({found})\n", config_path.display()));
    if env_files.is_empty() {
        out.push_str("# .env files:  none\n");
    } else {
        for file in env_files {
            out.push_str(&format!("# .env file:   {}\n", file.display()));
        }
    }
    out.push('\n');
    out.push_str(&toml::to_string_pretty(&redacted(config))?);
    Ok(out)
}

fn redacted(config: &AppConfig) -> AppConfig {
    let mut shown = config.clone();
    shown.api_key = shown.api_key.as_deref().map(redact_secret);
    for provider in shown.providers.values_mut() {
        provider.api_key = provider.api_key.as_deref().map(redact_secret);
    }
    shown
}
