//! holidaypic CLI - generate and email a daily holiday picture.
//!
//! Picks an interesting holiday for today, renders a picture for it guided by
//! a control image, saves it to the output directory and emails it.
//!
//! # Usage
//!
//! ```bash
//! # Full daily run
//! holidaypic
//!
//! # Keep the picture local and skip the depth map
//! holidaypic --no-email --no-depth-processing
//!
//! # Use another control image and text model
//! holidaypic --control-image ./logo.png --llm openai
//!
//! # View configuration
//! holidaypic config show
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// holidaypic - generate and email a daily holiday picture.
#[derive(Parser, Debug)]
#[command(name = "holidaypic")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true, args_conflicts_with_subcommands = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(flatten)]
    run: cli::run::RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands. Without one, the daily run is executed.
#[derive(Subcommand, Debug)]
enum Commands {
    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Credentials live in .env.local; values already in the environment win
    for env_file in [".env.local", ".env"] {
        match dotenvy::from_filename(env_file) {
            Ok(_) | Err(dotenvy::Error::Io(_)) => {}
            Err(e) => eprintln!("Warning: Failed to read {env_file}: {e}"),
        }
    }

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let loaded = holidaypic_core::Config::load();
    let config = match &loaded {
        Ok(config) => config.clone(),
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Check your config file with `holidaypic config path`."
            );
            holidaypic_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("holidaypic v{}", holidaypic_core::VERSION);

    match cli.command {
        Some(Commands::Config(args)) => cli::config::execute(args).await,
        None => {
            // Invalid config is fatal for a run
            let config = loaded.context("Refusing to run with an invalid config file")?;
            cli::run::execute(cli.run, config).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::run::LlmChoice;

    #[test]
    fn bare_invocation_runs_pipeline_with_defaults() {
        let cli = Cli::try_parse_from(["holidaypic"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.run.no_email);
        assert!(!cli.run.no_depth_processing);
        assert!(cli.run.control_image.is_none());
        assert!(cli.run.llm.is_none());
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "holidaypic",
            "--no-email",
            "--control-image",
            "https://example.com/logo.jpg",
            "--no-depth-processing",
            "--llm",
            "openai",
            "--llm-model",
            "gpt-4o",
            "-v",
        ])
        .unwrap();
        assert!(cli.run.no_email);
        assert!(cli.run.no_depth_processing);
        assert_eq!(
            cli.run.control_image.as_deref(),
            Some("https://example.com/logo.jpg")
        );
        assert!(matches!(cli.run.llm, Some(LlmChoice::Openai)));
        assert_eq!(cli.run.llm_model.as_deref(), Some("gpt-4o"));
        assert!(cli.verbose);
    }

    #[test]
    fn config_subcommand_parses() {
        let cli = Cli::try_parse_from(["holidaypic", "config", "init", "--force"]).unwrap();
        match cli.command {
            Some(Commands::Config(args)) => {
                assert!(matches!(
                    args.command,
                    crate::cli::config::ConfigCommand::Init { force: true }
                ));
            }
            other => panic!("expected config command, got {other:?}"),
        }
    }

    #[test]
    fn unknown_llm_rejected() {
        assert!(Cli::try_parse_from(["holidaypic", "--llm", "ollama"]).is_err());
    }

    #[test]
    fn run_flags_conflict_with_subcommand() {
        assert!(Cli::try_parse_from(["holidaypic", "--no-email", "config", "show"]).is_err());
    }
}
