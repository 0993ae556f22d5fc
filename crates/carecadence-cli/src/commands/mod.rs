pub mod config;
pub mod simulate;
pub mod validate;

use std::path::Path;

use carecadence_core::{EngineConfig, NewSchedule};
use serde::Deserialize;

/// On-disk list of schedules, one `[[schedules]]` table each.
#[derive(Debug, Deserialize)]
pub struct ScheduleFile {
    #[serde(default)]
    pub schedules: Vec<NewSchedule>,
}

pub fn load_schedules(path: &Path) -> Result<ScheduleFile, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let file: ScheduleFile = toml::from_str(&content)?;
    tracing::debug!(path = %path.display(), count = file.schedules.len(), "schedules file loaded");
    Ok(file)
}

/// Explicit `--config` file, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load()?,
    };
    Ok(config)
}
