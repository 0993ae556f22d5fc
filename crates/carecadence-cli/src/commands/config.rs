use std::path::Path;

use carecadence_core::EngineConfig;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Get a config value
    Get {
        /// Config key (e.g. "grace_period_minutes", "adherence.moderate_threshold")
        key: String,
    },
    /// Print the default config file location
    Path,
}

pub fn run(action: ConfigAction, config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = super::load_config(config_path)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Get { key } => {
            let config = super::load_config(config_path)?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Path => {
            println!("{}", EngineConfig::path()?.display());
        }
    }
    Ok(())
}
