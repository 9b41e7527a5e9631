//! Topogen CLI - organization profiles and infrastructure topologies from text

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use topogen::TopogenConfig;

/// Topogen - simulated infrastructure from organization descriptions
#[derive(Parser)]
#[command(name = "topogen")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate organization profiles and expand them into infrastructure topologies")]
#[command(long_about = r#"
Topogen turns a free-text organization description into a company profile and
a simulated topology of typed infrastructure entities.

Examples:
  topogen profile "A payment processing bank"
  topogen expand "Regional hospital network" --name "St. Elsewhere"
  topogen --offline --seed 7 expand "An online shop"
  topogen config --show
"#)]
struct Cli {
    /// Use disabled backends; every result comes from the deterministic fallbacks
    #[arg(long, global = true)]
    offline: bool,

    /// Seed for layout and addressing randomness
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Configuration file (defaults to ~/.topogen/config.toml)
    #[arg(short, long, global = true, env = "TOPOGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a company profile and print it as JSON
    Profile {
        /// Organization description
        description: String,

        /// Override the generated name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Generate a profile, expand its organization entity and print the entity as JSON
    Expand {
        /// Organization description
        description: String,

        /// Override the generated name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Configuration management
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("topogen={0},topogen_client={0},warn", log_level).into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let mut config = TopogenConfig::load(cli.config.as_deref()).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            cli.config
                .clone()
                .unwrap_or_else(TopogenConfig::default_path)
                .display()
        )
    })?;
    if let Some(seed) = cli.seed {
        config.set_seed(seed).context("Invalid --seed")?;
    }

    match cli.command {
        Commands::Profile { description, name } => {
            let topogen = commands::build(&config, cli.offline)?;
            commands::profile(&topogen, &description, name.as_deref()).await?;
        }
        Commands::Expand { description, name } => {
            let topogen = commands::build(&config, cli.offline)?;
            commands::expand(&topogen, &description, name.as_deref()).await?;
        }
        Commands::Config { show } => {
            commands::config(&config, cli.config.as_deref(), show)?;
        }
    }

    Ok(())
}
