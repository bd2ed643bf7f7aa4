use std::path::PathBuf;

use adherence_core::EngineConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "adherence-cli", version, about = "Adherence analytics CLI")]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Engine config file (defaults to ~/.config/adherence/engine.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute streaks from a completion event snapshot
    Streak(commands::streak::StreakArgs),
    /// Dosage constraint checks
    Dose {
        #[command(subcommand)]
        action: commands::dose::DoseAction,
    },
    /// Summary regeneration policy
    Summary {
        #[command(subcommand)]
        action: commands::summary::SummaryAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time(),
        )
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(EngineConfig::load_from(path)?),
        None => Ok(EngineConfig::load_or_default()),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.as_ref();
    let result = match cli.command {
        Commands::Streak(args) => {
            load_config(config_path).and_then(|config| commands::streak::run(args, &config))
        }
        Commands::Dose { action } => {
            load_config(config_path).and_then(|config| commands::dose::run(action, &config))
        }
        Commands::Summary { action } => {
            load_config(config_path).and_then(|config| commands::summary::run(action, &config))
        }
        Commands::Config { action } => commands::config::run(action, cli.config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
