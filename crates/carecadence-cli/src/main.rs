use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "carecadence-cli", version, about = "CareCadence reminder engine CLI")]
struct Cli {
    /// Engine config file (defaults to ~/.config/carecadence/config.toml)
    #[arg(long = "config", global = true)]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a schedules file without running anything
    Validate(commands::validate::ValidateArgs),
    /// Run the engine against a schedules file at a simulated time
    Simulate(commands::simulate::SimulateArgs),
    /// Configuration inspection
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let config_path = cli.config_path.as_deref();
    let result = match cli.command {
        Commands::Validate(args) => commands::validate::run(args),
        Commands::Simulate(args) => commands::simulate::run(args, config_path),
        Commands::Config { action } => commands::config::run(action, config_path),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
