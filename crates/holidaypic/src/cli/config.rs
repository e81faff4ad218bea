//! The `holidaypic config` command.

use anyhow::Context;
use clap::{Args, Subcommand};
use holidaypic_core::config::resolve_env_var;
use holidaypic_core::Config;
use std::path::Path;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration (secrets stay as `${VAR}` references)
    Show,

    /// Print the config file path
    Path,

    /// Write a config file with defaults
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Validate the config file and report which credentials resolve
    Check,
}

pub async fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    let path = Config::default_path();
    match args.command {
        ConfigCommand::Show => print!("{}", load_or_default(&path).to_toml()?),
        ConfigCommand::Path => println!("{}", path.display()),
        ConfigCommand::Init { force } => {
            write_default(&path, force)?;
            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }
        // Unlike the other subcommands, a broken file fails the check
        ConfigCommand::Check => {
            let config = Config::load()
                .with_context(|| format!("Invalid config at {}", path.display()))?;
            for (name, status) in credential_report(&config) {
                println!("{name:<22} {status}");
            }
        }
    }
    Ok(())
}

/// Load the config at `path`, warning and using defaults if it is unreadable.
fn load_or_default(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }
    Config::load_from(path).unwrap_or_else(|e| {
        tracing::warn!("Invalid config at {}: {e}. Showing defaults.", path.display());
        Config::default()
    })
}

fn write_default(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, Config::default().to_toml()?)?;
    Ok(())
}

/// `(label, "set" | "missing")` for each secret the configured run needs.
fn credential_report(config: &Config) -> Vec<(&'static str, &'static str)> {
    let status = |value: &str| {
        if resolve_env_var(value).is_some() {
            "set"
        } else {
            "missing"
        }
    };

    let llm_key = match config.llm.provider.as_str() {
        "openai" => config.llm.openai.clone().unwrap_or_default().api_key,
        _ => config.llm.anthropic.clone().unwrap_or_default().api_key,
    };

    let mut report = vec![
        ("text model api key", status(&llm_key)),
        ("replicate api token", status(&config.replicate.api_token)),
    ];
    if config.email.enabled {
        report.push(("sender email", status(&config.email.sender_email)));
        report.push(("receiver email", status(&config.email.receiver_email)));
        report.push(("sender password", status(&config.email.sender_password)));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        write_default(&path, false).unwrap();
        assert!(Config::load_from(&path).is_ok());

        std::fs::write(&path, "# edited").unwrap();
        assert!(write_default(&path, false).is_err());
        write_default(&path, true).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("[image]"));
    }

    #[test]
    fn invalid_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[retry]\nmax_attempts = \"three\"\n").unwrap();

        assert!(Config::load_from(&path).is_err());
        let config = load_or_default(&path);
        assert_eq!(config.to_toml().unwrap(), Config::default().to_toml().unwrap());
    }

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_or_default(&dir.path().join("absent.toml"));
        assert_eq!(config.retry.max_attempts, Config::default().retry.max_attempts);
    }

    #[test]
    fn credential_report_skips_email_when_disabled() {
        let mut config = Config::default();
        config.replicate.api_token = "r8_literal".to_string();
        config.email.enabled = false;

        let report = credential_report(&config);
        assert_eq!(report.len(), 2);
        assert_eq!(report[1], ("replicate api token", "set"));
    }
}
