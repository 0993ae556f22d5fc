use std::path::PathBuf;

use carecadence_core::ScheduleStore;
use chrono::Utc;
use clap::Args;
use serde::Serialize;

#[derive(Args)]
pub struct ValidateArgs {
    /// Schedules file (TOML, one [[schedules]] table per schedule)
    pub file: PathBuf,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct Verdict {
    name: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(args: ValidateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let file = super::load_schedules(&args.file)?;
    let mut store = ScheduleStore::new();
    let now = Utc::now();

    let verdicts: Vec<Verdict> = file
        .schedules
        .into_iter()
        .map(|new| {
            let name = new.name.clone();
            match store.create(new, now) {
                Ok(_) => Verdict {
                    name,
                    valid: true,
                    error: None,
                },
                Err(e) => Verdict {
                    name,
                    valid: false,
                    error: Some(e.to_string()),
                },
            }
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&verdicts)?);
    } else {
        for v in &verdicts {
            match &v.error {
                None => println!("ok       {}", v.name),
                Some(e) => println!("invalid  {}: {e}", v.name),
            }
        }
    }

    let invalid = verdicts.iter().filter(|v| !v.valid).count();
    if invalid > 0 {
        return Err(format!("{invalid} of {} schedules are invalid", verdicts.len()).into());
    }
    Ok(())
}
